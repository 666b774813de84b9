use std::sync::Arc;

use reg_adapters::{AddressAdapter, DatabaseAdapter, PaymentAdapter, SmsAdapter, StorageAdapter};
use reg_domain::config::Config;
use reg_providers::ProviderRegistry;
use reg_sessions::SessionStore;

use crate::agents::AgentTable;
use crate::photo::UploadJobStore;
use crate::session_lock::SessionLockMap;
use crate::workflow::StepTable;

/// One Arc-wrapped instance of every external adapter, grouped so handlers
/// take a single field instead of five.
#[derive(Clone)]
pub struct Adapters {
    pub database: Arc<DatabaseAdapter>,
    pub payment: Arc<PaymentAdapter>,
    pub sms: Arc<SmsAdapter>,
    pub storage: Arc<StorageAdapter>,
    pub address: Arc<AddressAdapter>,
}

impl Adapters {
    pub fn from_config(config: &Config) -> reg_domain::Result<Self> {
        Ok(Self {
            database: Arc::new(DatabaseAdapter::from_config(&config.adapters.database)?),
            payment: Arc::new(PaymentAdapter::from_config(&config.adapters.payment)?),
            sms: Arc::new(SmsAdapter::from_config(&config.adapters.sms)?),
            storage: Arc::new(StorageAdapter::from_config(&config.adapters.storage)?),
            address: Arc::new(AddressAdapter::from_config(&config.adapters.address)?),
        })
    }
}

/// Shared application state passed to all API handlers.
///
/// Fields are grouped by concern:
/// - **Core services** — config, LLM providers, sessions, session locks
/// - **External adapters** — database, payment, SMS, storage, address
/// - **Agents & workflow** — the fixed agent table and the step table
/// - **Photo pipeline** — upload job store and worker pool
/// - **Security** — the API bearer token hash computed once at startup
#[derive(Clone)]
pub struct AppState {
    // ── Core services ────────────────────────────────────────────────
    pub config: Arc<Config>,
    pub llm: Arc<ProviderRegistry>,
    pub sessions: Arc<SessionStore>,
    pub session_locks: Arc<SessionLockMap>,

    // ── External adapters ────────────────────────────────────────────
    pub adapters: Adapters,

    // ── Agents & workflow ────────────────────────────────────────────
    pub agents: Arc<AgentTable>,
    pub steps: Arc<StepTable>,

    // ── Photo pipeline ───────────────────────────────────────────────
    pub uploads: Arc<UploadJobStore>,
    pub photo_workers: Arc<tokio::sync::Semaphore>,

    // ── Security (startup-computed) ──────────────────────────────────
    /// SHA-256 hash of the API bearer token (read once at startup).
    /// `None` = dev mode (no auth enforced).
    pub api_token_hash: Option<Vec<u8>>,
}
