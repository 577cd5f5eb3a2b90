use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::core::models::{MODELS, SummarizeOutcome, SummarizeRequest};

/// Bounds of the length sliders as `(min, max, step)`.
pub const MAX_TOKENS_RANGE: (usize, usize, usize) = (60, 300, 10);
pub const MIN_TOKENS_RANGE: (usize, usize, usize) = (20, 140, 5);

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:2rem auto;max-width:72rem;padding:0 1rem}\
.row{display:flex;gap:2rem;flex-wrap:wrap}.col{flex:1;min-width:20rem}\
label{display:block;margin:.75rem 0 .25rem;font-weight:600}\
textarea,select{width:100%;box-sizing:border-box}\
button{margin-top:1rem;padding:.5rem 1.5rem}";

/// Clamp a slider value into `range`.
#[must_use]
pub fn clamp_to_range(value: usize, range: (usize, usize, usize)) -> usize {
    value.clamp(range.0, range.1)
}

/// Render the summarizer page with the submitted values and results.
#[must_use]
pub fn render_page(form: &SummarizeRequest, outcome: &SummarizeOutcome) -> String {
    let model_options: String = MODELS
        .iter()
        .map(|m| {
            let selected = if *m == form.model { " selected" } else { "" };
            format!(
                "<option value=\"{}\"{selected}>{}</option>",
                encode_double_quoted_attribute(m),
                encode_text(m)
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Text Summarizer</title>
<style>{STYLE}</style>
</head>
<body>
<h1>📝 Text Summarizer</h1>
<p>Paste article text <strong>or a URL</strong> below and get a concise summary.</p>
<form method="post" action="/">
<div class="row">
<div class="col">
<label for="text">Input Text or URL</label>
<textarea id="text" name="text" rows="12" placeholder="Paste article text *or* a direct article URL (https://...)">{text}</textarea>
<label for="model">Model</label>
<select id="model" name="model">{model_options}</select>
{max_slider}
{min_slider}
<button type="submit">Summarize</button>
</div>
<div class="col">
<label for="summary">Summary</label>
<textarea id="summary" rows="12" readonly>{summary}</textarea>
<label for="notice">Errors / Notices</label>
<textarea id="notice" rows="4" readonly>{notice}</textarea>
</div>
</div>
</form>
</body>
</html>
"#,
        text = encode_text(&form.text),
        max_slider = slider(
            "max_tokens",
            "Max summary tokens",
            form.max_tokens,
            MAX_TOKENS_RANGE
        ),
        min_slider = slider(
            "min_tokens",
            "Min summary tokens",
            form.min_tokens,
            MIN_TOKENS_RANGE
        ),
        summary = encode_text(&outcome.summary),
        notice = encode_text(&outcome.notice),
    )
}

fn slider(name: &str, label: &str, value: usize, (min, max, step): (usize, usize, usize)) -> String {
    let value = value.clamp(min, max);
    format!(
        "<label for=\"{name}\">{label}: <output id=\"{name}_out\">{value}</output></label>\n\
         <input type=\"range\" id=\"{name}\" name=\"{name}\" min=\"{min}\" max=\"{max}\" step=\"{step}\" value=\"{value}\" \
         oninput=\"document.getElementById('{name}_out').value=this.value\">"
    )
}
