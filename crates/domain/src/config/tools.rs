use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool dispatch & photo pipeline
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// When true, tools dispatch to `remote_tool_url` instead of running
    /// the in-process handler. Per-agent `execution_mode` still decides
    /// which agents use it.
    #[serde(default)]
    pub remote_tools_enabled: bool,
    #[serde(default)]
    pub remote_tool_url: Option<String>,
    /// Number of concurrent photo-processing workers. Must be >= 2.
    #[serde(default = "d_photo_workers")]
    pub photo_worker_pool_size: usize,
    /// Default per-call client timeout, seconds.
    #[serde(default = "d_client_timeout")]
    pub client_timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            remote_tools_enabled: false,
            remote_tool_url: None,
            photo_worker_pool_size: d_photo_workers(),
            client_timeout_secs: d_client_timeout(),
        }
    }
}

fn d_photo_workers() -> usize {
    2
}
fn d_client_timeout() -> u64 {
    28
}
