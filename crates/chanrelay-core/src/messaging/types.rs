use crate::domain::{Actor, ChatId};

/// Cross-messenger incoming update model.
///
/// Telegram-specific fields stay in the Telegram adapter.
#[derive(Clone, Debug)]
pub enum IncomingUpdate {
    /// `/name args` sent by a user.
    Command(CommandMessage),
    /// Plain text sent by a user (dialog payloads).
    Text(TextMessage),
    /// A post published in a channel (forwarding candidates).
    ChannelPost(ChannelPost),
}

#[derive(Clone, Debug)]
pub struct CommandMessage {
    pub chat_id: ChatId,
    pub actor: Actor,
    pub name: String,
    pub args: String,
}

#[derive(Clone, Debug)]
pub struct TextMessage {
    pub chat_id: ChatId,
    pub actor: Actor,
    pub text: String,
}

#[derive(Clone, Debug)]
pub struct ChannelPost {
    pub chat_id: ChatId,
    pub text: String,
}

/// Split `/cmd@botname arg1 ...` into a lowercase command name and the rest.
///
/// Returns `None` for text that is not a command.
pub fn parse_command(text: &str) -> Option<(String, String)> {
    let text = text.trim();
    if !text.starts_with('/') {
        return None;
    }

    let mut parts = text.splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    if cmd.is_empty() {
        return None;
    }
    Some((cmd, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_with_bot_suffix_and_args() {
        assert_eq!(
            parse_command("/Set_Origin@relay_bot -100 -200"),
            Some(("set_origin".to_string(), "-100 -200".to_string()))
        );
        assert_eq!(
            parse_command("  /status  "),
            Some(("status".to_string(), String::new()))
        );
    }

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(parse_command("-100 -200"), None);
        assert_eq!(parse_command("/"), None);
        assert_eq!(parse_command("@alice"), None);
    }
}
