use smartmark::types::errors::*;

// === ErrorKind Tests ===

#[test]
fn error_kind_display_is_inline_message() {
    assert_eq!(ErrorKind::InvalidUrl.to_string(), "Invalid URL");
    assert_eq!(ErrorKind::StoreWrite.to_string(), "Could not save changes");
    assert_eq!(
        ErrorKind::StoreUnavailable.to_string(),
        "Bookmarks are unavailable right now"
    );
    assert_eq!(ErrorKind::Unauthenticated.to_string(), "Not signed in");
}

#[test]
fn error_kind_serializes_snake_case() {
    assert_eq!(
        serde_json::to_value(ErrorKind::StoreUnavailable).unwrap(),
        serde_json::json!("store_unavailable")
    );
    let parsed: ErrorKind = serde_json::from_str("\"invalid_url\"").unwrap();
    assert_eq!(parsed, ErrorKind::InvalidUrl);
}

// === StoreError Tests ===

#[test]
fn store_error_display_variants() {
    assert_eq!(
        StoreError::Unavailable("connection refused".to_string()).to_string(),
        "Store unavailable: connection refused"
    );
    assert_eq!(
        StoreError::Rejected {
            status: 403,
            message: "row level security".to_string()
        }
        .to_string(),
        "Store rejected request (403): row level security"
    );
    assert_eq!(
        StoreError::Decode("expected array".to_string()).to_string(),
        "Store response decode error: expected array"
    );
    assert_eq!(
        StoreError::Database("disk full".to_string()).to_string(),
        "Store database error: disk full"
    );
}

#[test]
fn store_error_maps_reads_and_writes() {
    let err = StoreError::Unavailable("timeout".to_string());
    assert_eq!(err.kind_for_read(), ErrorKind::StoreUnavailable);
    assert_eq!(err.kind_for_write(), ErrorKind::StoreWrite);

    let rejected = StoreError::Rejected {
        status: 500,
        message: String::new(),
    };
    assert_eq!(rejected.kind_for_read(), ErrorKind::StoreUnavailable);
    assert_eq!(rejected.kind_for_write(), ErrorKind::StoreWrite);
}

#[test]
fn store_error_from_rusqlite() {
    let err: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
    assert!(matches!(err, StoreError::Database(_)));
}

#[test]
fn store_error_implements_error_trait() {
    let err: Box<dyn std::error::Error> = Box::new(StoreError::Decode("x".to_string()));
    assert!(err.source().is_none());
}

// === AuthError Tests ===

#[test]
fn auth_error_display_variants() {
    assert_eq!(
        AuthError::Network("dns failure".to_string()).to_string(),
        "Auth network error: dns failure"
    );
    assert_eq!(
        AuthError::Rejected("invalid grant".to_string()).to_string(),
        "Auth request rejected: invalid grant"
    );
}

// === ConfigError Tests ===

#[test]
fn config_error_display_variants() {
    assert_eq!(
        ConfigError::Io("permission denied".to_string()).to_string(),
        "Config I/O error: permission denied"
    );
    assert_eq!(
        ConfigError::Serialization("trailing comma".to_string()).to_string(),
        "Config serialization error: trailing comma"
    );
    assert_eq!(
        ConfigError::InvalidKey("backend.nope".to_string()).to_string(),
        "Invalid config key: backend.nope"
    );
    assert_eq!(
        ConfigError::InvalidValue("not a number".to_string()).to_string(),
        "Invalid config value: not a number"
    );
    assert_eq!(
        ConfigError::MissingValue("backend.url".to_string()).to_string(),
        "Missing config value: backend.url"
    );
}
