use brief::{init_logging, setup_logging};

#[test]
fn test_logging_setup() {
    let result = std::panic::catch_unwind(|| {
        setup_logging();
    });
    assert!(result.is_ok(), "setup_logging function should not panic");
}

#[test]
fn test_logging_setup_twice_does_not_panic() {
    let result = std::panic::catch_unwind(|| {
        init_logging("warn");
        setup_logging();
    });
    assert!(result.is_ok(), "repeated logging setup should not panic");
}
