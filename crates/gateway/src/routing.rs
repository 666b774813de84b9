//! Routing validator (C4).
//!
//! Classifies the first line of an inbound message as a registration code
//! or as ordinary chat. A registration code is cross-checked against the
//! team reference table before the session is handed off to a workflow
//! agent — all of this happens before any LLM call.

use once_cell::sync::Lazy;
use regex::Regex;

use reg_adapters::DatabaseAdapter;
use reg_domain::config::RegistrationConfig;
use reg_sessions::{AgentName, SessionMetadata};

static CODE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(100|200)-([A-Za-z0-9_]+)-[Uu](\d+)-([A-Za-z0-9]+)(?:-([A-Za-z]+)-([A-Za-z]+))?$")
        .expect("registration code pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    NewRegistration,
    ReRegistration,
}

impl Route {
    pub fn agent(self) -> AgentName {
        match self {
            Route::NewRegistration => AgentName::NewRegistration,
            Route::ReRegistration => AgentName::ReRegistration,
        }
    }

    /// The step the workflow enters on successful classification.
    pub fn entry_step(self) -> u32 {
        match self {
            Route::NewRegistration => 1,
            Route::ReRegistration => 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    #[error("that code is for season {found}, but registration is open for {expected}")]
    InvalidSeason { found: String, expected: String },
    #[error("\"{team}\" has no {age_group} team")]
    UnknownTeam { team: String, age_group: String },
    #[error("a 100-series code must include the player's name")]
    MissingPlayerName,
    #[error("a 200-series code must not include a player's name")]
    UnexpectedPlayerName,
}

#[derive(Debug, Clone)]
pub enum Classification {
    /// The message did not match the registration-code grammar at all.
    Orchestrator,
    /// The message matched and passed every check.
    Registration { route: Route, metadata: SessionMetadata },
}

/// Classify the first line of `message`. Returns `Ok(Classification::Orchestrator)`
/// when the line is not a registration code; returns `Err` when it looks
/// like one but fails a check.
pub async fn classify(
    message: &str,
    config: &RegistrationConfig,
    db: &DatabaseAdapter,
) -> Result<Classification, RoutingError> {
    let first_line = message.lines().next().unwrap_or("").trim();

    let caps = match CODE_PATTERN.captures(first_line) {
        Some(c) => c,
        None => return Ok(Classification::Orchestrator),
    };

    let prefix = &caps[1];
    let team_raw = &caps[2];
    let age_digits = &caps[3];
    let season = &caps[4];
    let first_name = caps.get(5).map(|m| m.as_str().to_string());
    let last_name = caps.get(6).map(|m| m.as_str().to_string());

    if season != config.current_season {
        return Err(RoutingError::InvalidSeason {
            found: season.to_string(),
            expected: config.current_season.clone(),
        });
    }

    let team = team_raw.to_lowercase();
    let age_group = format!("U{age_digits}");

    let found = db
        .lookup_team(&team, &age_group)
        .await
        .map_err(|_| RoutingError::UnknownTeam {
            team: team.clone(),
            age_group: age_group.clone(),
        })?;
    if found.is_none() {
        return Err(RoutingError::UnknownTeam { team, age_group });
    }

    let has_name = first_name.is_some() && last_name.is_some();
    let route = match prefix {
        "100" => {
            if !has_name {
                return Err(RoutingError::MissingPlayerName);
            }
            Route::ReRegistration
        }
        "200" => {
            if has_name {
                return Err(RoutingError::UnexpectedPlayerName);
            }
            Route::NewRegistration
        }
        _ => unreachable!("pattern only matches 100 or 200"),
    };

    let metadata = SessionMetadata {
        team: Some(team),
        age_group: Some(age_group),
        season: Some(season.to_string()),
        first_name,
        last_name,
        record_id: None,
        extra: Default::default(),
    };

    Ok(Classification::Registration { route, metadata })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_matching_line_is_orchestrator_shaped() {
        assert!(CODE_PATTERN.captures("hello there").is_none());
    }

    #[test]
    fn new_registration_code_has_no_name_suffix() {
        let caps = CODE_PATTERN.captures("200-tigers-u10-2526").unwrap();
        assert_eq!(&caps[1], "200");
        assert!(caps.get(5).is_none());
    }

    #[test]
    fn re_registration_code_requires_name_suffix() {
        let caps = CODE_PATTERN
            .captures("100-tigers-u10-2526-Jane-Smith")
            .unwrap();
        assert_eq!(&caps[1], "100");
        assert_eq!(&caps[5], "Jane");
        assert_eq!(&caps[6], "Smith");
    }

    #[test]
    fn team_and_age_case_is_accepted_either_way() {
        assert!(CODE_PATTERN.captures("200-TIGERS-U10-2526").is_some());
        assert!(CODE_PATTERN.captures("200-Tigers-u10-2526").is_some());
    }
}
