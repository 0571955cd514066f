use hoard::{FetchError, HoardError, Result};

#[test]
fn test_error_display() {
    let err = HoardError::InvalidResource("ftp://example.com/a.png".to_string());
    assert!(err.to_string().contains("ftp://example.com/a.png"));
}

#[test]
fn test_status_display_names_url_and_code() {
    let err = FetchError::Status {
        status: 404,
        url: "https://example.com/a.png".to_string(),
    };
    let msg = err.to_string();
    assert!(msg.contains("404"));
    assert!(msg.contains("https://example.com/a.png"));
}

#[test]
fn test_result_alias() {
    fn returns_error() -> Result<()> {
        Err(HoardError::WriteFailed("disk full".to_string()))
    }
    assert!(returns_error().is_err());
}

// ============================================================================
// Fetch failure wrapping
// ============================================================================

#[test]
fn fetch_errors_convert_into_fetch_failed() {
    let err: HoardError = FetchError::Http("connection refused".into()).into();
    assert!(matches!(err, HoardError::FetchFailed(FetchError::Http(_))));
    assert_eq!(
        err.fetch_cause(),
        Some(&FetchError::Http("connection refused".into()))
    );
}

#[test]
fn non_fetch_errors_have_no_fetch_cause() {
    assert!(HoardError::WriteFailed("x".into()).fetch_cause().is_none());
    assert!(HoardError::InvalidResource("x".into()).fetch_cause().is_none());
    assert!(HoardError::Configuration("x".into()).fetch_cause().is_none());
}

#[test]
fn errors_are_cloneable_for_shared_outcomes() {
    let err: HoardError = FetchError::Aborted.into();
    let copy = err.clone();
    assert_eq!(err.to_string(), copy.to_string());
}

// ============================================================================
// Transient error classification
// ============================================================================

#[test]
fn transient_errors() {
    assert!(FetchError::Http("connection reset".into()).is_transient());
    assert!(FetchError::Stream("eof".into()).is_transient());
    for status in [429, 500, 502, 503, 504] {
        assert!(
            FetchError::Status {
                status,
                url: String::new()
            }
            .is_transient(),
            "{status} should be transient"
        );
    }
}

#[test]
fn permanent_errors() {
    assert!(!FetchError::Aborted.is_transient());
    for status in [400, 401, 403, 404, 410] {
        assert!(
            !FetchError::Status {
                status,
                url: String::new()
            }
            .is_transient(),
            "{status} should be permanent"
        );
    }
}
