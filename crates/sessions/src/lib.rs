//! Per-session conversation history, agent pointer, workflow position, and
//! injected registration-code metadata. Process-local only: single-process
//! memory is acceptable, there is no durability across restarts.

pub mod session;
pub mod store;

pub use session::{AgentName, Session, SessionMetadata, Turn, TurnRole};
pub use store::SessionStore;
