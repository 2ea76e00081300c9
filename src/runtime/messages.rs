use crate::models::{ChatMessage, ClientMessage, MessageRole};
use crate::utils::RelayError;

/// Drop UI marker entries whose role is in `roles`
pub fn strip_roles(messages: Vec<ClientMessage>, roles: &[&str]) -> Vec<ClientMessage> {
    messages
        .into_iter()
        .filter(|m| !roles.contains(&m.role.as_str()))
        .collect()
}

/// Reduce client messages to the `{role, content}` pairs the provider accepts
pub fn reduce(messages: &[ClientMessage]) -> Result<Vec<ChatMessage>, RelayError> {
    messages.iter().map(ClientMessage::to_chat_message).collect()
}

/// Prepend `directive` as a system message unless one is already present
pub fn ensure_system_directive(messages: &mut Vec<ChatMessage>, directive: &str) {
    if !messages.iter().any(|m| m.role == MessageRole::System) {
        messages.insert(0, ChatMessage::system(directive));
    }
}
