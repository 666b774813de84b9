//! Fixed agent definitions (C5).
//!
//! Three named agents, each a data record: base instructions, the tools
//! it may invoke, its LLM role, and whether tool calls dispatch locally
//! or through the remote tool protocol. The table is built once at
//! startup and never mutated afterward.

use reg_sessions::AgentName;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Local,
    Remote,
}

#[derive(Debug, Clone)]
pub struct AgentDefinition {
    pub name: AgentName,
    /// Key into `LlmConfig::roles` ("orchestrator", "new_registration", "re_registration").
    pub role: &'static str,
    pub base_instructions: &'static str,
    pub tools: &'static [&'static str],
    pub execution_mode: ExecutionMode,
}

pub struct AgentTable {
    orchestrator: AgentDefinition,
    new_registration: AgentDefinition,
    re_registration: AgentDefinition,
}

impl AgentTable {
    pub fn new(remote_tools_enabled: bool) -> Self {
        let orchestrator_mode = if remote_tools_enabled {
            ExecutionMode::Remote
        } else {
            ExecutionMode::Local
        };

        Self {
            orchestrator: AgentDefinition {
                name: AgentName::Orchestrator,
                role: "orchestrator",
                base_instructions: ORCHESTRATOR_INSTRUCTIONS,
                tools: &["db_query"],
                execution_mode: orchestrator_mode,
            },
            new_registration: AgentDefinition {
                name: AgentName::NewRegistration,
                role: "new_registration",
                base_instructions: NEW_REGISTRATION_INSTRUCTIONS,
                tools: &[
                    "address-lookup",
                    "address-validate",
                    "DOB-validate",
                    "payment-token-create",
                    "write-registration",
                    "shirt-number-check",
                    "write-kit",
                    "put-image",
                    "write-photo-url",
                    "check-kit-needed",
                ],
                execution_mode: ExecutionMode::Local,
            },
            re_registration: AgentDefinition {
                name: AgentName::ReRegistration,
                role: "re_registration",
                base_instructions: RE_REGISTRATION_INSTRUCTIONS,
                tools: &[
                    "player-lookup",
                    "DOB-validate",
                    "copy-record-to-current-season",
                    "payment-token-create",
                    "shirt-number-check",
                    "write-kit",
                    "put-image",
                    "write-photo-url",
                    "check-kit-needed",
                ],
                execution_mode: ExecutionMode::Local,
            },
        }
    }

    pub fn get(&self, name: AgentName) -> &AgentDefinition {
        match name {
            AgentName::Orchestrator => &self.orchestrator,
            AgentName::NewRegistration => &self.new_registration,
            AgentName::ReRegistration => &self.re_registration,
        }
    }
}

const ORCHESTRATOR_INSTRUCTIONS: &str = "\
You are the front door of the club's registration assistant. Greet parents \
warmly, answer general questions about the club, and look up public \
information with db_query when asked. You do not run the registration \
workflow yourself — a registration code routes the conversation to a \
specialised agent before you see the next message.";

const NEW_REGISTRATION_INSTRUCTIONS: &str = "\
You are guiding a parent through registering a child with the club for the \
first time. Follow the current step's instructions exactly: ask only what \
that step asks for, validate and normalise the answer as instructed, and \
only advance the step pointer once the answer is acceptable. Use tools to \
look up addresses, validate dates of birth, and persist data — never \
invent a value a tool should have produced.";

const RE_REGISTRATION_INSTRUCTIONS: &str = "\
You are resuming registration for a player who registered with the club in \
a previous season. Confirm their identity with the required security \
check before disclosing or reusing any stored detail, then carry their \
record forward to the current season, updating only what has changed.";
