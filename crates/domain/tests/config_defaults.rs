use pa_domain::config::{Config, ConfigSeverity};

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
}

#[test]
fn default_expiry_is_five_minutes() {
    let config = Config::default();
    assert_eq!(config.sessions.default_expiry_ms, 300_000);
    assert!(config.sessions.state_path.is_none());
}

#[test]
fn live_chat_disabled_by_default() {
    let config = Config::default();
    assert!(config.live_chat.endpoint.is_none());
    assert_eq!(config.live_chat.active_state, "LIVE_CHAT_ACTIVE");
    assert_eq!(config.live_chat.closed_state, "SESSION_CLOSED");
}

#[test]
fn full_tenant_config_parses_and_validates() {
    let toml_str = r#"
[sessions]
default_expiry_ms = 300000

[live_chat]
endpoint = "http://bridge.local:9000"

[[tenants]]
id = "acme-hotel"
start_state = "MAIN_MENU"
expiry_ms = 900000
live_chat = true

[[tenants.intents]]
intent = "agent"
keywords = ["agent", "human"]

[[tenants.intents]]
intent = "booking"
pattern = "book(ing)?s?"

[[tenants.states]]
name = "MAIN_MENU"
prompt = "Welcome to Acme Hotel. What would you like to do?"
choices = [
  { label = "My booking", action = "booking", next = "BOOKING" },
  { label = "Talk to an agent", action = "agent", next = "LIVE_CHAT_CONNECTING" },
]

[[tenants.states]]
name = "BOOKING"
prompt = "Please send your booking reference."
choices = [{ label = "Back", action = "menu", next = "MAIN_MENU" }]
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    let tenant = config.tenant("acme-hotel").expect("tenant parsed");
    assert_eq!(tenant.expiry_ms, Some(900_000));
    assert_eq!(tenant.states.len(), 2);
    assert_eq!(tenant.states[0].choices[1].next.as_deref(), Some("LIVE_CHAT_CONNECTING"));

    let issues = config.validate();
    assert!(
        issues.iter().all(|i| i.severity != ConfigSeverity::Error),
        "unexpected errors: {issues:?}"
    );
}

#[test]
fn missing_start_state_is_an_error() {
    let toml_str = r#"
[[tenants]]
id = "it-desk"
start_state = "HOME"

[[tenants.states]]
name = "MAIN_MENU"
prompt = "Hi"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    let issues = config.validate();
    assert!(issues
        .iter()
        .any(|i| i.severity == ConfigSeverity::Error && i.field == "tenants[0].start_state"));
}
