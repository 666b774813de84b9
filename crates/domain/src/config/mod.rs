mod adapters;
mod llm;
mod registration;
mod server;
mod sessions;
mod tools;

pub use adapters::*;
pub use llm::*;
pub use registration::*;
pub use server::*;
pub use sessions::*;
pub use tools::*;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub registration: RegistrationConfig,
    #[serde(default)]
    pub adapters: AdaptersConfig,
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

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Startup must bail when any `Error`-severity issue is present;
    /// `Warning`-severity issues are logged and startup proceeds.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must be greater than 0".into(),
            });
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.host".into(),
                message: "host must not be empty".into(),
            });
        }
        if self.server.dev_mode && self.server.api_token_env.is_none() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "server.dev_mode".into(),
                message: "dev_mode is on with no bearer token configured; \
                          the dev seeding endpoint is unauthenticated"
                    .into(),
            });
        }

        if self.llm.providers.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "llm.providers".into(),
                message: "no LLM providers configured".into(),
            });
        }

        let mut seen_ids: HashSet<&str> = HashSet::new();
        for (i, provider) in self.llm.providers.iter().enumerate() {
            if provider.id.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("llm.providers[{i}].id"),
                    message: "provider id must not be empty".into(),
                });
            }
            if provider.base_url.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("llm.providers[{i}].base_url"),
                    message: "provider base_url must not be empty".into(),
                });
            }
            if !provider.base_url.is_empty()
                && !provider.base_url.starts_with("http://")
                && !provider.base_url.starts_with("https://")
            {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("llm.providers[{i}].base_url"),
                    message: format!(
                        "base_url must start with http:// or https:// (got \"{}\")",
                        provider.base_url
                    ),
                });
            }
            if !provider.id.is_empty() && !seen_ids.insert(&provider.id) {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Warning,
                    field: format!("llm.providers[{i}].id"),
                    message: format!(
                        "duplicate provider id \"{}\" — later provider will shadow earlier one",
                        provider.id
                    ),
                });
            }
            if provider.auth.env.as_ref().map_or(true, |v| v.is_empty()) {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Warning,
                    field: format!("llm.providers[{i}].auth.env"),
                    message: format!(
                        "provider \"{}\" has no auth.env configured",
                        provider.id
                    ),
                });
            }
        }

        for (name, role) in &self.llm.roles {
            if role.model.split('/').count() != 2 {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("llm.roles.{name}.model"),
                    message: format!(
                        "model spec \"{}\" must be \"provider_id/model_name\"",
                        role.model
                    ),
                });
            }
        }

        if self.server.cors.allowed_origins.len() == 1
            && self.server.cors.allowed_origins[0] == "*"
        {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "server.cors.allowed_origins".into(),
                message: "wildcard \"*\" allows all origins (not recommended for production)"
                    .into(),
            });
        }

        if self.tools.photo_worker_pool_size < 2 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "tools.photo_worker_pool_size".into(),
                message: "photo worker pool must have at least 2 workers".into(),
            });
        }
        if self.tools.remote_tools_enabled && self.tools.remote_tool_url.is_none() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "tools.remote_tool_url".into(),
                message: "remote_tools_enabled is true but remote_tool_url is unset".into(),
            });
        }

        for (name, endpoint) in self.adapters.entries() {
            if endpoint.base_url.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Warning,
                    field: format!("adapters.{name}.base_url"),
                    message: "no base_url configured; calls to this adapter will fail".into(),
                });
            } else if !endpoint.base_url.starts_with("http://")
                && !endpoint.base_url.starts_with("https://")
            {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("adapters.{name}.base_url"),
                    message: format!(
                        "base_url must start with http:// or https:// (got \"{}\")",
                        endpoint.base_url
                    ),
                });
            }
        }

        if regex::Regex::new(&format!("^{}$", regex::escape(&self.registration.current_season)))
            .is_err()
        {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "registration.current_season".into(),
                message: "current_season must be a plain string".into(),
            });
        }

        errors
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_only_warnings() {
        let config = Config::default();
        let errors = config.validate();
        assert!(
            errors.iter().all(|e| e.severity == ConfigSeverity::Warning),
            "default config should never fail validation with an Error: {errors:?}"
        );
    }

    #[test]
    fn zero_port_is_an_error() {
        let mut config = Config::default();
        config.server.port = 0;
        let errors = config.validate();
        assert!(errors
            .iter()
            .any(|e| e.field == "server.port" && e.severity == ConfigSeverity::Error));
    }

    #[test]
    fn bad_provider_base_url_is_an_error() {
        let mut config = Config::default();
        config.llm.providers.push(ProviderConfig {
            id: "primary".into(),
            kind: ProviderKind::OpenaiCompat,
            base_url: "ftp://example.com".into(),
            auth: AuthConfig {
                env: Some("OPENAI_API_KEY".into()),
                ..Default::default()
            },
            default_model: None,
        });
        let errors = config.validate();
        assert!(errors
            .iter()
            .any(|e| e.field == "llm.providers[0].base_url" && e.severity == ConfigSeverity::Error));
    }

    #[test]
    fn duplicate_provider_ids_warn_not_error() {
        let mut config = Config::default();
        for _ in 0..2 {
            config.llm.providers.push(ProviderConfig {
                id: "primary".into(),
                kind: ProviderKind::OpenaiCompat,
                base_url: "https://api.openai.com/v1".into(),
                auth: AuthConfig {
                    env: Some("OPENAI_API_KEY".into()),
                    ..Default::default()
                },
                default_model: None,
            });
        }
        let errors = config.validate();
        let dup = errors
            .iter()
            .find(|e| e.field == "llm.providers[1].id")
            .expect("duplicate id should be flagged");
        assert_eq!(dup.severity, ConfigSeverity::Warning);
    }

    #[test]
    fn photo_worker_pool_below_two_is_an_error() {
        let mut config = Config::default();
        config.tools.photo_worker_pool_size = 1;
        let errors = config.validate();
        assert!(errors
            .iter()
            .any(|e| e.field == "tools.photo_worker_pool_size"
                && e.severity == ConfigSeverity::Error));
    }

    #[test]
    fn remote_tools_enabled_without_url_is_an_error() {
        let mut config = Config::default();
        config.tools.remote_tools_enabled = true;
        let errors = config.validate();
        assert!(errors
            .iter()
            .any(|e| e.field == "tools.remote_tool_url" && e.severity == ConfigSeverity::Error));
    }

    #[test]
    fn role_model_spec_requires_provider_slash_model() {
        let mut config = Config::default();
        config.llm.roles.insert(
            "orchestrator".into(),
            RoleConfig {
                model: "not-a-valid-spec".into(),
            },
        );
        let errors = config.validate();
        assert!(errors
            .iter()
            .any(|e| e.field == "llm.roles.orchestrator.model"
                && e.severity == ConfigSeverity::Error));
    }

    #[test]
    fn config_roundtrips_through_toml() {
        let config = Config::default();
        let s = toml::to_string(&config).expect("serialize");
        let back: Config = toml::from_str(&s).expect("deserialize");
        assert_eq!(back.server.port, config.server.port);
    }
}
