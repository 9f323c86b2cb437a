use super::*;

// =============================================================================
// env_bool / env_parse: unique env var names avoid races with parallel tests.
// =============================================================================

#[test]
fn env_bool_true_variants() {
    for (i, val) in ["1", "true", "yes", "on", " TRUE "].iter().enumerate() {
        let key = format!("__TEST_CFG_TRUE_{i}__");
        unsafe { std::env::set_var(&key, val) };
        assert_eq!(env_bool(&key), Some(true), "expected true for {val:?}");
        unsafe { std::env::remove_var(&key) };
    }
}

#[test]
fn env_bool_false_variants() {
    for (i, val) in ["0", "false", "no", "off"].iter().enumerate() {
        let key = format!("__TEST_CFG_FALSE_{i}__");
        unsafe { std::env::set_var(&key, val) };
        assert_eq!(env_bool(&key), Some(false), "expected false for {val:?}");
        unsafe { std::env::remove_var(&key) };
    }
}

#[test]
fn env_bool_invalid_or_unset_is_none() {
    let key = "__TEST_CFG_BOOL_BAD_417__";
    unsafe { std::env::set_var(key, "maybe") };
    assert_eq!(env_bool(key), None);
    unsafe { std::env::remove_var(key) };
    assert_eq!(env_bool("__TEST_CFG_BOOL_UNSET_418__"), None);
}

#[test]
fn env_parse_falls_back_on_garbage() {
    let key = "__TEST_CFG_PARSE_BAD_519__";
    unsafe { std::env::set_var(key, "lots") };
    assert_eq!(env_parse(key, 7_u32), 7);
    unsafe { std::env::remove_var(key) };
}

#[test]
fn env_parse_reads_trimmed_value() {
    let key = "__TEST_CFG_PARSE_OK_520__";
    unsafe { std::env::set_var(key, " 1.5 ") };
    assert!((env_parse(key, 0.0_f64) - 1.5).abs() < f64::EPSILON);
    unsafe { std::env::remove_var(key) };
}

// =============================================================================
// AppConfig: the only test touching the real variable names.
// =============================================================================

#[test]
fn from_env_requires_database_url_then_applies_defaults() {
    unsafe {
        std::env::remove_var("DATABASE_URL");
        std::env::remove_var("STOCK_WARNING_MULTIPLE");
        std::env::remove_var("SESSION_TTL_HOURS");
    }
    assert_eq!(AppConfig::from_env(), Err(ConfigError::Missing("DATABASE_URL")));

    unsafe {
        std::env::set_var("DATABASE_URL", "postgres://u:p@localhost/db");
        std::env::set_var("STOCK_WARNING_MULTIPLE", "0.5");
        std::env::set_var("SESSION_TTL_HOURS", "-3");
    }
    let config = AppConfig::from_env().unwrap();
    assert_eq!(config.database_url, "postgres://u:p@localhost/db");
    assert!((config.stock_warning_multiple - DEFAULT_STOCK_WARNING_MULTIPLE).abs() < f64::EPSILON);
    assert_eq!(config.session_ttl_hours, 1);

    unsafe {
        std::env::remove_var("DATABASE_URL");
        std::env::remove_var("STOCK_WARNING_MULTIPLE");
        std::env::remove_var("SESSION_TTL_HOURS");
    }
}

#[test]
fn with_database_url_uses_defaults() {
    let config = AppConfig::with_database_url("postgres://x");
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.db_max_connections, DEFAULT_DB_MAX_CONNECTIONS);
    assert!(!config.seed_demo_data);
    assert_eq!(config.loyalty_points_per_dollar, 1);
}
