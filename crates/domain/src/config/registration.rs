use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Registration domain settings
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Club-specific settings the workflow engine and routing validator need
/// but that vary season to season, so they live in config rather than code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationConfig {
    /// The season new registrations are created against, e.g. "2026-27".
    #[serde(default = "d_season")]
    pub current_season: String,
    /// Age-group cutoff reference date (month-day), used to derive the
    /// correct age group from a date of birth.
    #[serde(default = "d_cutoff")]
    pub age_cutoff_month_day: String,
    /// Team/age-group names the routing validator and workflow steps may
    /// present to the parent. Loaded once at startup.
    #[serde(default)]
    pub teams: Vec<String>,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            current_season: d_season(),
            age_cutoff_month_day: d_cutoff(),
            teams: Vec::new(),
        }
    }
}

fn d_season() -> String {
    "2026-27".into()
}
fn d_cutoff() -> String {
    "08-31".into()
}
