use crate::constants::CHARS_PER_TOKEN;
use crate::models::ClientMessage;

/// Approximate token count of one piece of text.
///
/// Length is measured in UTF-16 code units so the estimate agrees with the
/// browser client's `String.length`.
pub fn estimate_tokens(text: &str) -> usize {
    text.encode_utf16().count().div_ceil(CHARS_PER_TOKEN)
}

/// Sum of per-message estimates; each message rounds up on its own
pub fn estimate_message_tokens(messages: &[ClientMessage]) -> usize {
    messages.iter().map(|m| estimate_tokens(&m.content)).sum()
}
