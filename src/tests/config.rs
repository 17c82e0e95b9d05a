use super::*;

#[test]
fn defaults() {
    let config = SolverConfig::default();
    assert!(config.finite);
    assert!(!config.return_on_first_error);
    assert_eq!(config.max_steps, None);
}

#[test]
fn missing_fields_take_defaults() {
    let config = SolverConfig::from_json(r#"{ "max_steps": 100 }"#).expect("valid config");
    assert_eq!(config.max_steps, Some(100));
    assert!(config.finite);
}

#[test]
fn json_round_trip() {
    let config = SolverConfig {
        finite: false,
        return_on_first_error: true,
        max_steps: Some(7),
    };
    let json = config.to_json().expect("serializable");
    assert_eq!(SolverConfig::from_json(&json).expect("valid config"), config);
}

#[test]
fn invalid_json_is_an_error() {
    let err = SolverConfig::from_json(r#"{ "finite": "yes" }"#).expect_err("bad type");
    assert!(matches!(err, ConfigError::Json(_)));
    assert!(err.to_string().starts_with("invalid solver configuration"));
}

#[test]
fn from_file_reads_json() {
    let path = std::env::temp_dir().join(format!("scopecheck-config-{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "return_on_first_error": true }"#).expect("temp file");
    let config = SolverConfig::from_file(&path);
    std::fs::remove_file(&path).ok();
    assert!(config.expect("valid config").return_on_first_error);
}

#[test]
fn missing_file_is_an_io_error() {
    let err = SolverConfig::from_file(Path::new("/nonexistent/scopecheck.json"))
        .expect_err("no such file");
    assert!(matches!(err, ConfigError::Io(_)));
}
