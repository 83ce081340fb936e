mod live_chat;
mod observability;
mod server;
mod sessions;
mod tenants;
mod turn;

pub use live_chat::*;
pub use observability::*;
pub use server::*;
pub use sessions::*;
pub use tenants::*;
pub use turn::*;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub live_chat: LiveChatConfig,
    #[serde(default)]
    pub turn: TurnConfig,
    #[serde(default)]
    pub tenants: Vec<TenantConfig>,
}

impl Config {
    pub fn tenant(&self, id: &str) -> Option<&TenantConfig> {
        self.tenants.iter().find(|t| t.id == id)
    }

    /// Per-tenant expiry overrides, in milliseconds.
    pub fn expiry_overrides(&self) -> HashMap<String, u64> {
        self.tenants
            .iter()
            .filter_map(|t| t.expiry_ms.map(|ms| (t.id.clone(), ms)))
            .collect()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

fn error(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError {
        severity: ConfigSeverity::Error,
        field: field.into(),
        message: message.into(),
    }
}

fn warning(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError {
        severity: ConfigSeverity::Warning,
        field: field.into(),
        message: message.into(),
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(error("server.port", "port must be greater than 0"));
        }
        if self.server.host.is_empty() {
            errors.push(error("server.host", "host must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.observability.sample_rate) {
            errors.push(warning(
                "observability.sample_rate",
                "sample_rate should be between 0.0 and 1.0",
            ));
        }
        if self.sessions.default_expiry_ms == 0 {
            errors.push(error(
                "sessions.default_expiry_ms",
                "expiry window must be greater than 0",
            ));
        }
        if self.turn.timeout_ms == 0 {
            errors.push(error("turn.timeout_ms", "turn timeout must be greater than 0"));
        }
        if self.live_chat.exit_keywords.is_empty() {
            errors.push(warning(
                "live_chat.exit_keywords",
                "no exit keywords: users cannot leave live chat by typing",
            ));
        }

        if self.tenants.is_empty() {
            errors.push(warning("tenants", "no tenants configured"));
        }

        let mut seen = HashSet::new();
        for (i, tenant) in self.tenants.iter().enumerate() {
            let field = format!("tenants[{i}]");
            if tenant.id.is_empty() {
                errors.push(error(format!("{field}.id"), "tenant id must not be empty"));
            } else if tenant.id.contains(':') {
                errors.push(error(format!("{field}.id"), "tenant id must not contain ':'"));
            } else if !seen.insert(tenant.id.as_str()) {
                errors.push(error(
                    format!("{field}.id"),
                    format!("duplicate tenant id '{}'", tenant.id),
                ));
            }
            if tenant.expiry_ms == Some(0) {
                errors.push(error(
                    format!("{field}.expiry_ms"),
                    "expiry window must be greater than 0",
                ));
            }
            if tenant.live_chat && self.live_chat.endpoint.is_none() {
                errors.push(error(
                    format!("{field}.live_chat"),
                    "live chat enabled but live_chat.endpoint is not set",
                ));
            }
            errors.extend(self.validate_script(&field, tenant));
        }

        errors
    }

    fn validate_script(&self, field: &str, tenant: &TenantConfig) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        for (j, rule) in tenant.intents.iter().enumerate() {
            if rule.keywords.is_empty() && rule.pattern.is_none() {
                errors.push(warning(
                    format!("{field}.intents[{j}]"),
                    format!("intent '{}' has neither keywords nor pattern", rule.intent),
                ));
            }
            if let Some(pattern) = &rule.pattern {
                if let Err(e) = regex::Regex::new(pattern) {
                    errors.push(error(
                        format!("{field}.intents[{j}].pattern"),
                        format!("invalid regex: {e}"),
                    ));
                }
            }
        }

        let mut declared: HashSet<&str> = HashSet::new();
        for (j, state) in tenant.states.iter().enumerate() {
            if !declared.insert(state.name.as_str()) {
                errors.push(error(
                    format!("{field}.states[{j}].name"),
                    format!("duplicate state '{}'", state.name),
                ));
            }
        }
        if !declared.contains(tenant.start_state.as_str()) {
            errors.push(error(
                format!("{field}.start_state"),
                format!("start state '{}' is not declared in states", tenant.start_state),
            ));
        }
        if tenant.live_chat {
            declared.insert(self.live_chat.connecting_state.as_str());
            declared.insert(self.live_chat.active_state.as_str());
            declared.insert(self.live_chat.closed_state.as_str());
        }

        for (j, state) in tenant.states.iter().enumerate() {
            for (k, choice) in state.choices.iter().enumerate() {
                if let Some(next) = &choice.next {
                    if !declared.contains(next.as_str()) {
                        errors.push(error(
                            format!("{field}.states[{j}].choices[{k}].next"),
                            format!("unknown target state '{next}'"),
                        ));
                    }
                }
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(id: &str) -> TenantConfig {
        toml::from_str(&format!(
            r#"
            id = "{id}"
            [[states]]
            name = "MAIN_MENU"
            prompt = "Hi"
            "#
        ))
        .unwrap()
    }

    #[test]
    fn default_config_only_warns() {
        let issues = Config::default().validate();
        assert!(issues.iter().all(|i| i.severity == ConfigSeverity::Warning));
        assert!(issues.iter().any(|i| i.field == "tenants"));
    }

    #[test]
    fn duplicate_tenant_ids_are_rejected() {
        let cfg = Config {
            tenants: vec![tenant("bank"), tenant("bank")],
            ..Default::default()
        };
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|i| i.severity == ConfigSeverity::Error && i.message.contains("duplicate")));
    }

    #[test]
    fn live_chat_requires_endpoint() {
        let mut t = tenant("bank");
        t.live_chat = true;
        let cfg = Config {
            tenants: vec![t],
            ..Default::default()
        };
        let issues = cfg.validate();
        assert!(issues.iter().any(|i| i.field == "tenants[0].live_chat"));
    }

    #[test]
    fn unknown_choice_target_is_rejected() {
        let t: TenantConfig = toml::from_str(
            r#"
            id = "air"
            [[states]]
            name = "MAIN_MENU"
            prompt = "Hi"
            choices = [{ label = "Go", action = "go", next = "NOWHERE" }]
            "#,
        )
        .unwrap();
        let cfg = Config {
            tenants: vec![t],
            ..Default::default()
        };
        let issues = cfg.validate();
        assert!(issues.iter().any(|i| i.message.contains("NOWHERE")));
    }

    #[test]
    fn invalid_intent_pattern_is_rejected() {
        let mut t = tenant("bank");
        t.intents.push(IntentRuleConfig {
            intent: "broken".into(),
            keywords: vec![],
            pattern: Some("(unclosed".into()),
        });
        let cfg = Config {
            tenants: vec![t],
            ..Default::default()
        };
        assert!(cfg
            .validate()
            .iter()
            .any(|i| i.field == "tenants[0].intents[0].pattern"));
    }

    #[test]
    fn expiry_overrides_only_lists_overridden_tenants() {
        let mut hotel = tenant("hotel");
        hotel.expiry_ms = Some(900_000);
        let cfg = Config {
            tenants: vec![tenant("bank"), hotel],
            ..Default::default()
        };
        let overrides = cfg.expiry_overrides();
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides["hotel"], 900_000);
    }
}
