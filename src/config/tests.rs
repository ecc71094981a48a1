use super::*;

#[test]
fn defaults_match_documented_values() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert_eq!(settings.database.url, None);
    assert_eq!(settings.database.namespace, "default");
    assert_eq!(settings.database.max_connections.get(), 8);
    assert_eq!(settings.site.host.as_str(), "http://127.0.0.1:1313/");
    assert_eq!(settings.site.title, "Stream");
    assert!(settings.site.bridges.is_empty());
    assert!(settings.site.fedsoc_bridge.is_none());
    assert!(settings.websub.hub_url.is_none());
    assert!(settings.webmention.enabled);
    assert!(!settings.webmention.background);
    assert_eq!(settings.webmention.timeout, Duration::from_secs(30));
    assert_eq!(settings.webmention.concurrency.get(), 1);
    assert!(settings.admin.token.is_none());
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.webmention.background = Some(false);

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        webmention_background: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert!(settings.webmention.background);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn blank_database_url_selects_memory_store() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.database.url.is_none());
}

#[test]
fn empty_namespace_is_rejected() {
    let mut raw = RawSettings::default();
    raw.database.namespace = Some(" ".to_string());
    let err = Settings::from_raw(raw).expect_err("empty namespace");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "database.namespace",
            ..
        }
    ));
}

#[test]
fn relative_site_host_is_rejected() {
    let mut raw = RawSettings::default();
    raw.site.host = Some("/stream".to_string());
    let err = Settings::from_raw(raw).expect_err("relative host");
    assert!(matches!(err, LoadError::Invalid { key: "site.host", .. }));
}

#[test]
fn bridges_and_hub_are_parsed() {
    let mut raw = RawSettings::default();
    raw.site.bridges = Some(vec!["https://fed.brid.gy/".to_string()]);
    raw.websub.hub_url = Some("https://pubsubhubbub.appspot.com/".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.site.bridges.len(), 1);
    assert_eq!(
        settings.websub.hub_url.as_ref().map(Url::as_str),
        Some("https://pubsubhubbub.appspot.com/")
    );
}

#[test]
fn fedsoc_bridge_must_be_absolute() {
    let mut raw = RawSettings::default();
    raw.site.fedsoc_bridge = Some("https://fed.brid.gy/r/https://stream.example/".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(
        settings.site.fedsoc_bridge.as_ref().map(Url::as_str),
        Some("https://fed.brid.gy/r/https://stream.example/")
    );

    let mut raw = RawSettings::default();
    raw.site.fedsoc_bridge = Some("fed.brid.gy".to_string());
    let err = Settings::from_raw(raw).expect_err("relative bridge");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "site.fedsoc_bridge",
            ..
        }
    ));

    let mut raw = RawSettings::default();
    raw.site.fedsoc_bridge = Some("  ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.site.fedsoc_bridge.is_none());
}

#[test]
fn zero_timeout_and_concurrency_are_rejected() {
    let mut raw = RawSettings::default();
    raw.webmention.timeout_seconds = Some(0);
    assert!(Settings::from_raw(raw).is_err());

    let mut raw = RawSettings::default();
    raw.webmention.concurrency = Some(0);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn blank_admin_token_means_locked() {
    let mut raw = RawSettings::default();
    raw.admin.token = Some("".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.admin.token.is_none());
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["streamlog"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_resend_arguments() {
    let args = CliArgs::parse_from([
        "streamlog",
        "resend",
        "--database-url",
        "postgres://example",
        "0123abcd",
    ]);

    match args.command.expect("resend command") {
        Command::Resend(resend) => {
            assert_eq!(resend.id, "0123abcd");
            assert_eq!(
                resend.database.database_url.as_deref(),
                Some("postgres://example")
            );
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn resend_only_applies_database_override() {
    let mut raw = RawSettings::default();
    raw.apply_database_override(&DatabaseOverride {
        database_url: Some("postgres://db".to_string()),
    });
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.database.url.as_deref(), Some("postgres://db"));
}
