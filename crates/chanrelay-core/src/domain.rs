use std::fmt;

/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

/// Telegram chat/channel id (numeric, signed).
///
/// Origins and destinations are plain chat ids; display names are resolved on
/// demand and never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whoever sent a command or text.
///
/// Roles are keyed by `username`; an actor without one is never privileged.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Actor {
    pub user_id: UserId,
    pub username: Option<String>,
}

impl Actor {
    pub fn new(user_id: i64, username: Option<&str>) -> Self {
        Self {
            user_id: UserId(user_id),
            username: username.map(|s| s.to_string()),
        }
    }

    pub fn handle(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Name used in log lines.
    pub fn label(&self) -> String {
        match &self.username {
            Some(name) => name.clone(),
            None => format!("user#{}", self.user_id.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    SuperAdmin,
    Admin,
    Unprivileged,
}
