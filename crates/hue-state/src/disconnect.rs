//! pending disconnect commands.

/// an instruction for a data-plane service to terminate a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectCommand {
    /// the user whose session must end.
    pub user_id: String,
    /// the session to terminate; empty means all of the user's sessions.
    pub session_id: String,
    /// why the disconnect was issued.
    pub reason: String,
    /// the node expected to act on it; empty means any.
    pub node_id: String,
}

impl DisconnectCommand {
    /// convenience constructor.
    pub fn new(user_id: &str, session_id: &str, reason: &str, node_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            reason: reason.to_string(),
            node_id: node_id.to_string(),
        }
    }
}
