use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use tokio::sync::Mutex;

use crate::domain::{Actor, ChatId, UserId};

/// Multi-step mutations that collect their arguments in a follow-up message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DialogKind {
    SetOrigin,
    SetDestination,
    AddAdmin,
}

impl DialogKind {
    pub fn command(self) -> &'static str {
        match self {
            Self::SetOrigin => "set_origin",
            Self::SetDestination => "set_destination",
            Self::AddAdmin => "add_admin",
        }
    }

    /// Prompt sent when the dialog is entered without inline arguments.
    pub fn prompt(self) -> &'static str {
        match self {
            Self::SetOrigin => "Enter Channel ID to set origin channel (e.g., -123123 -123123)",
            Self::SetDestination => {
                "Enter Channel ID to set destination channel (e.g., -123123 -123123)"
            }
            Self::AddAdmin => "Enter Telegram username to add as admin (e.g., @username)",
        }
    }
}

/// A dialog belongs to one user in one chat. Text the same user sends in
/// another chat is not a payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DialogKey {
    pub chat_id: ChatId,
    pub user_id: UserId,
}

impl DialogKey {
    pub fn new(chat_id: ChatId, actor: &Actor) -> Self {
        Self {
            chat_id,
            user_id: actor.user_id,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PendingDialog {
    pub kind: DialogKind,
    pub initiator: Actor,
    pub started_at: Instant,
}

/// Per-initiator, per-chat dialog state: `Idle` (no entry) or `AwaitingInput` (entry).
///
/// Dialogs of different actors never touch each other. Nothing here is
/// persisted; pending dialogs are lost on restart.
pub struct DialogRegistry {
    pending: Mutex<HashMap<DialogKey, PendingDialog>>,
    timeout: Option<Duration>,
}

impl DialogRegistry {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    /// Enter `AwaitingInput`. Returns the kind of a dialog this one replaced.
    pub async fn begin(
        &self,
        chat_id: ChatId,
        actor: &Actor,
        kind: DialogKind,
    ) -> Option<DialogKind> {
        self.begin_at(chat_id, actor, kind, Instant::now()).await
    }

    pub async fn begin_at(
        &self,
        chat_id: ChatId,
        actor: &Actor,
        kind: DialogKind,
        now: Instant,
    ) -> Option<DialogKind> {
        let mut map = self.pending.lock().await;
        map.insert(
            DialogKey::new(chat_id, actor),
            PendingDialog {
                kind,
                initiator: actor.clone(),
                started_at: now,
            },
        )
        .filter(|prev| !self.is_expired(prev, now))
        .map(|prev| prev.kind)
    }

    /// Leave `AwaitingInput`, handing back the dialog if it has not expired.
    pub async fn take(&self, key: DialogKey) -> Option<PendingDialog> {
        self.take_at(key, Instant::now()).await
    }

    pub async fn take_at(&self, key: DialogKey, now: Instant) -> Option<PendingDialog> {
        let dialog = self.pending.lock().await.remove(&key)?;
        if self.is_expired(&dialog, now) {
            tracing::info!(
                actor = %dialog.initiator.label(),
                command = dialog.kind.command(),
                "pending dialog expired"
            );
            return None;
        }
        Some(dialog)
    }

    /// Explicit cancel. Returns the kind that was pending, if any.
    pub async fn cancel(&self, key: DialogKey) -> Option<DialogKind> {
        self.take(key).await.map(|d| d.kind)
    }

    pub async fn pending_kind(&self, key: DialogKey) -> Option<DialogKind> {
        let now = Instant::now();
        self.pending
            .lock()
            .await
            .get(&key)
            .filter(|d| !self.is_expired(d, now))
            .map(|d| d.kind)
    }

    /// Drop every expired dialog. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut map = self.pending.lock().await;
        let before = map.len();
        map.retain(|_, d| !self.is_expired(d, now));
        before - map.len()
    }

    fn is_expired(&self, dialog: &PendingDialog, now: Instant) -> bool {
        match self.timeout {
            Some(limit) => now.saturating_duration_since(dialog.started_at) >= limit,
            None => false,
        }
    }
}
