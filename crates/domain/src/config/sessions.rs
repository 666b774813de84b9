use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sessions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Session store configuration. Sessions are keyed by the opaque
/// `session_id` the chat client supplies and are evicted only on an
/// explicit reset, never on a timer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Maximum turns retained per session before the oldest are dropped.
    #[serde(default = "d_max_turns")]
    pub max_turns: usize,
    /// Bounded re-registration security-check attempts before the step
    /// becomes a fatal error directing the user to support.
    #[serde(default = "d_max_security_attempts")]
    pub max_security_attempts: u32,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            max_turns: d_max_turns(),
            max_security_attempts: d_max_security_attempts(),
        }
    }
}

fn d_max_turns() -> usize {
    500
}
fn d_max_security_attempts() -> u32 {
    3
}
