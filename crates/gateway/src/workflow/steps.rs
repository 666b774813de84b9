//! Workflow step table (C6 data).
//!
//! Each step is a task-instruction template plus the tools and transition
//! shape permitted for it. Templates carry session-bound placeholders
//! (`{child_first_name}`, `{team}`, ...) substituted by the engine before
//! the LLM call. Semantic validation of the user's answer lives in the
//! template text, not here — the engine only enforces the tool allow-list
//! and the structured reply schema.

use std::collections::HashMap;

/// Step numbers the source marks unused. Receiving one from the model is
/// a fatal `UnknownStep`, never coerced to a neighbour.
pub const RESERVED_STEPS: &[u32] = &[17, 25, 26, 27, 31];

/// Documents the step's expected next hop. Advisory only: the engine logs
/// a warning (never a hard failure) if the model's `routine_number` doesn't
/// match, since spec.md delegates semantic validation to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Fixed(u32),
    UserChoice,
    Terminal,
}

#[derive(Debug, Clone)]
pub struct StepDefinition {
    pub task_template: &'static str,
    pub allowed_tools: &'static [&'static str],
    pub transition: Transition,
    /// True for steps whose `routine_number` the engine must process
    /// immediately without waiting for a new user message (pure routing
    /// decisions, not user-visible questions).
    pub server_side: bool,
}

pub struct StepTable {
    steps: HashMap<u32, StepDefinition>,
}

impl StepTable {
    pub fn get(&self, step: u32) -> Option<&StepDefinition> {
        self.steps.get(&step)
    }

    pub fn is_reserved(step: u32) -> bool {
        RESERVED_STEPS.contains(&step)
    }
}

fn def(
    task_template: &'static str,
    allowed_tools: &'static [&'static str],
    transition: Transition,
    server_side: bool,
) -> StepDefinition {
    StepDefinition { task_template, allowed_tools, transition, server_side }
}

/// Build the fixed step table. Called once at startup.
pub fn step_table() -> StepTable {
    let mut steps = HashMap::new();

    // ── New registration: 1..16 ─────────────────────────────────────
    steps.insert(1, def(
        "Welcome the parent to {team} {age_group} registration for the {season} season. \
         Ask for the parent/guardian's first name.",
        &[], Transition::Fixed(2), false,
    ));
    steps.insert(2, def(
        "Ask for the parent/guardian's last name.",
        &[], Transition::Fixed(3), false,
    ));
    steps.insert(3, def(
        "Ask for a UK mobile number for {parent_first_name}, starting 07 with 11 digits.",
        &[], Transition::Fixed(4), false,
    ));
    steps.insert(4, def(
        "Ask for {parent_first_name}'s email address.",
        &[], Transition::Fixed(5), false,
    ));
    steps.insert(5, def(
        "Ask for the child's first name.",
        &[], Transition::Fixed(6), false,
    ));
    steps.insert(6, def(
        "Ask for the child's last name.",
        &[], Transition::Fixed(7), false,
    ));
    steps.insert(7, def(
        "Ask for {child_first_name}'s date of birth. Use DOB-validate to check the format \
         and age-group eligibility for {age_group} before accepting it.",
        &["DOB-validate"], Transition::Fixed(8), false,
    ));
    steps.insert(8, def(
        "Confirm the collected details so far back to the parent and ask them to correct \
         anything that is wrong before continuing.",
        &[], Transition::Fixed(9), false,
    ));
    steps.insert(9, def(
        "Ask whether {child_first_name} has any medical conditions, allergies, or additional \
         needs the club's coaches should know about.",
        &[], Transition::Fixed(10), false,
    ));
    steps.insert(10, def(
        "Ask for an emergency contact name and number, distinct from the parent's own number.",
        &[], Transition::Fixed(11), false,
    ));
    steps.insert(11, def(
        "Explain that the next step collects a home address for correspondence, then ask the \
         parent to confirm they're ready to continue.",
        &[], Transition::Fixed(12), false,
    ));
    steps.insert(12, def(
        "Ask for the home postcode. Normalise to uppercase with no internal spaces before \
         calling address-lookup.",
        &["address-lookup"], Transition::Fixed(13), false,
    ));
    steps.insert(13, def(
        "Using the postcode already collected, ask for the house number or name, then call \
         address-lookup to resolve the full address. If the lookup finds a single match, move \
         to step 15 to confirm it; if it finds none, move to step 14 for manual entry.",
        &["address-lookup", "address-validate"], Transition::UserChoice, false,
    ));
    steps.insert(14, def(
        "The automated address lookup found no match. Ask the parent to type their full \
         address manually (line 1, town, postcode) and validate it with address-validate.",
        &["address-validate"], Transition::Fixed(15), false,
    ));
    steps.insert(15, def(
        "Read the resolved address back to the parent and ask them to confirm it is correct.",
        &[], Transition::Fixed(16), false,
    ));
    steps.insert(16, def(
        "This step is a routing decision, not a question: if the parent indicated a second \
         correspondence address is needed, set routine_number to 18; otherwise set it to 22.",
        &[], Transition::UserChoice, true,
    ));

    // ── Secondary address branch: 18..21 ────────────────────────────
    steps.insert(18, def(
        "Ask for the second correspondence address's postcode and resolve it with \
         address-lookup the same way as the home address.",
        &["address-lookup"], Transition::Fixed(19), false,
    ));
    steps.insert(19, def(
        "This step is a routing decision: if address-lookup found a single match, set \
         routine_number to 21; otherwise set it to 20 for manual entry.",
        &[], Transition::UserChoice, true,
    ));
    steps.insert(20, def(
        "The automated lookup found no match for the second address. Ask the parent to type \
         it manually and validate with address-validate.",
        &["address-validate"], Transition::Fixed(21), false,
    ));
    steps.insert(21, def(
        "Read the second address back to the parent and ask them to confirm it.",
        &[], Transition::Fixed(22), false,
    ));

    // ── Age-based branch and kit: 22..24 ────────────────────────────
    steps.insert(22, def(
        "This step is a routing decision, not a question: {age_group} teams at under-12 and \
         above require shirt numbers and named kit; younger age groups do not. If a shirt \
         number is required for {age_group}, set routine_number to 23; otherwise set it to 28.",
        &[], Transition::UserChoice, true,
    ));
    steps.insert(23, def(
        "Ask for {child_first_name}'s preferred kit size from the club's size chart \
         (age-appropriate options only).",
        &[], Transition::Fixed(24), false,
    ));
    steps.insert(24, def(
        "Ask for a preferred shirt number between 1 and 25. Use shirt-number-check to confirm \
         it is not already taken for {team} {age_group}; if it is taken, ask for another.",
        &["shirt-number-check"], Transition::Fixed(28), false,
    ));

    // ── Review, payment, confirmation: 28..30 ───────────────────────
    steps.insert(28, def(
        "Summarise the full registration back to the parent (names, DOB, address, medical \
         notes, kit if applicable) and ask them to confirm before payment is set up.",
        &[], Transition::Fixed(29), false,
    ));
    steps.insert(29, def(
        "Explain that a Direct Debit mandate is required and ask for a preferred payment day \
         of the month (1st to 28th, or 'last day of the month'). Rewrite 29/30/31/last-day to \
         -1. Call payment-token-create, then write-registration with the complete record.",
        &["payment-token-create", "write-registration"], Transition::Fixed(30), false,
    ));
    steps.insert(30, def(
        "This step is a routing decision, not a question: a confirmation SMS has just been \
         sent. If check-kit-needed reports a kit is still owed for this player, set \
         routine_number to 32; otherwise set it to 34.",
        &["check-kit-needed"], Transition::UserChoice, true,
    ));

    // ── Kit dispatch and close-out: 32..35 ──────────────────────────
    steps.insert(32, def(
        "Ask for {child_first_name}'s kit size and shirt number if not already recorded.",
        &[], Transition::Fixed(33), false,
    ));
    steps.insert(33, def(
        "Call write-kit to record the kit size, shirt number, and kit type against the \
         registration record.",
        &["write-kit"], Transition::Fixed(34), false,
    ));
    steps.insert(34, def(
        "Ask the parent to upload a passport-style photo of {child_first_name} using the \
         upload feature, and explain that registration will complete once it is reviewed.",
        &["put-image", "write-photo-url"], Transition::Fixed(35), false,
    ));
    steps.insert(35, def(
        "Thank the parent and confirm that registration for {child_first_name} is complete.",
        &[], Transition::Terminal, false,
    ));

    // ── Re-registration: 200..202, then shares 30..35 ───────────────
    steps.insert(200, def(
        "Welcome the parent back for {team} {age_group} re-registration. Ask for the \
         returning player's full name if not already supplied, then call player-lookup to \
         find their prior-season record.",
        &["player-lookup"], Transition::Fixed(201), false,
    ));
    steps.insert(201, def(
        "Security check before reusing any stored detail: ask for the player's date of birth \
         and home postcode, and call DOB-validate on the date given. If either answer does not \
         match what the parent already confirmed, stay on this step and ask again; after \
         repeated mismatches, advise the parent to email support.",
        &["DOB-validate"], Transition::UserChoice, false,
    ));
    steps.insert(202, def(
        "Call copy-record-to-current-season to carry the player's record forward, then \
         payment-token-create to reactivate their Direct Debit mandate for {season}.",
        &["copy-record-to-current-season", "payment-token-create"], Transition::Fixed(30), false,
    ));

    StepTable { steps }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_steps_are_not_in_the_table() {
        let table = step_table();
        for &reserved in RESERVED_STEPS {
            assert!(table.get(reserved).is_none());
        }
    }

    #[test]
    fn entry_step_is_defined() {
        let table = step_table();
        assert!(table.get(1).is_some());
        assert!(table.get(200).is_some());
    }

    #[test]
    fn branch_steps_are_marked_server_side() {
        let table = step_table();
        assert!(table.get(16).unwrap().server_side);
        assert!(table.get(22).unwrap().server_side);
        assert!(table.get(30).unwrap().server_side);
        assert!(!table.get(1).unwrap().server_side);
    }

    #[test]
    fn terminal_step_has_no_further_transition() {
        let table = step_table();
        assert_eq!(table.get(35).unwrap().transition, Transition::Terminal);
    }
}
