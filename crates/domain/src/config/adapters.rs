use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// External adapters (database, payment, SMS, storage, address)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AdaptersConfig {
    #[serde(default)]
    pub database: EndpointConfig,
    #[serde(default)]
    pub payment: EndpointConfig,
    #[serde(default)]
    pub sms: EndpointConfig,
    #[serde(default)]
    pub storage: EndpointConfig,
    #[serde(default)]
    pub address: EndpointConfig,
}

/// One external service's base URL plus the env var holding its credential.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EndpointConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub credential_env: Option<String>,
}

impl AdaptersConfig {
    /// The named endpoints, for validation and readiness reporting.
    pub fn entries(&self) -> [(&'static str, &EndpointConfig); 5] {
        [
            ("database", &self.database),
            ("payment", &self.payment),
            ("sms", &self.sms),
            ("storage", &self.storage),
            ("address", &self.address),
        ]
    }
}
