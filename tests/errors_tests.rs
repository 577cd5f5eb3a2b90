use std::error::Error;
use brief::errors::SummarizeError;

#[test]
fn test_summarize_error_implements_error_trait() {
    fn assert_error<T: Error + Send + Sync + 'static>(_: &T) {}

    let error = SummarizeError::ExtractionError("test error".to_string());
    assert_error(&error);
}

#[test]
fn test_summarize_error_display() {
    let error = SummarizeError::HttpError("GET https://x.test returned 404 Not Found".to_string());
    assert_eq!(
        format!("{error}"),
        "Failed to fetch URL: GET https://x.test returned 404 Not Found"
    );

    let error = SummarizeError::MissingSafetensors {
        model: "someone/pytorch-only".to_string(),
    };
    assert_eq!(
        format!("{error}"),
        "someone/pytorch-only does not appear to have a file named model.safetensors"
    );

    let error = SummarizeError::InputError("Provide --url or --file or pipe text via stdin.".to_string());
    assert_eq!(format!("{error}"), "Provide --url or --file or pipe text via stdin.");
}

#[test]
fn test_summarize_error_kind_names_the_variant() {
    assert_eq!(SummarizeError::HttpError(String::new()).kind(), "HttpError");
    assert_eq!(
        SummarizeError::MissingSafetensors { model: String::new() }.kind(),
        "MissingSafetensors"
    );
    assert_eq!(SummarizeError::TokenizerError(String::new()).kind(), "TokenizerError");
    assert_eq!(SummarizeError::IoError(String::new()).kind(), "IoError");
}

#[test]
fn test_summarize_error_from_conversions() {
    let err = anyhow::anyhow!("shape mismatch");
    let converted: SummarizeError = err.into();
    match converted {
        SummarizeError::ModelError(msg) => assert!(msg.contains("shape mismatch")),
        other => panic!("Unexpected error type: {other:?}"),
    }

    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "article.txt missing");
    let converted: SummarizeError = io.into();
    assert!(matches!(converted, SummarizeError::IoError(ref m) if m.contains("article.txt")));

    #[allow(unused)]
    #[allow(clippy::items_after_statements)]
    fn _check_reqwest_conversion(err: reqwest::Error) -> SummarizeError {
        SummarizeError::from(err)
    }
}
