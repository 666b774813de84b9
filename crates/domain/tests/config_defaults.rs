use reg_domain::config::Config;

#[test]
fn default_config_parses_from_empty_toml() {
    let config: Config = toml::from_str("").expect("empty config should use all defaults");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.tools.photo_worker_pool_size, 2);
    assert_eq!(config.registration.current_season, "2026-27");
}

#[test]
fn partial_toml_overrides_only_named_fields() {
    let toml_src = r#"
        [server]
        port = 9000

        [registration]
        current_season = "2027-28"
    "#;
    let config: Config = toml::from_str(toml_src).expect("partial config should parse");
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.registration.current_season, "2027-28");
    // Untouched sections keep their defaults.
    assert_eq!(config.tools.photo_worker_pool_size, 2);
}
