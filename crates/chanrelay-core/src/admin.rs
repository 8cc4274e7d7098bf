//! Role-gated admin command surface and the interactive configuration dialog.
//!
//! Every handler returns the reply text for the invoking actor. Mutations go
//! through [`RoutingTable::update`], and permission checks run inside the
//! update closure so they see the exact state being mutated.

use std::sync::Arc;

use crate::{
    dialog::{DialogKey, DialogKind, DialogRegistry},
    domain::{Actor, ChatId},
    errors::Error,
    messaging::port::{display_name, MessageBus},
    roles::RoleAuthority,
    routing::RoutingTable,
    Result,
};

const DENIED: &str = "Permission denied. Only admins can use this command.";
const DENIED_SUPER: &str = "Only super admins can add admins!";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdminCommand {
    Start,
    Help,
    SetOrigin,
    SetDestination,
    AddAdmin,
    RmAdmin,
    Pause,
    Resume,
    Status,
    Cancel,
}

impl AdminCommand {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "start" => Self::Start,
            "help" => Self::Help,
            "set_origin" => Self::SetOrigin,
            "set_destination" => Self::SetDestination,
            "add_admin" => Self::AddAdmin,
            "rm_admin" => Self::RmAdmin,
            "pause" => Self::Pause,
            "resume" => Self::Resume,
            "status" => Self::Status,
            "cancel" => Self::Cancel,
            _ => return None,
        })
    }
}

pub struct AdminService {
    routing: Arc<RoutingTable>,
    roles: RoleAuthority,
    dialogs: DialogRegistry,
    bus: Arc<dyn MessageBus>,
    bot_name: Option<String>,
}

impl AdminService {
    pub fn new(
        routing: Arc<RoutingTable>,
        roles: RoleAuthority,
        dialogs: DialogRegistry,
        bus: Arc<dyn MessageBus>,
    ) -> Self {
        Self {
            routing,
            roles,
            dialogs,
            bus,
            bot_name: None,
        }
    }

    /// Bot username used in the `/start` greeting.
    pub fn with_bot_name(mut self, name: impl Into<String>) -> Self {
        self.bot_name = Some(name.into());
        self
    }

    pub fn dialogs(&self) -> &DialogRegistry {
        &self.dialogs
    }

    /// `chat_id` is where the command was sent; a dialog it opens is scoped
    /// to that chat.
    pub async fn handle_command(
        &self,
        chat_id: ChatId,
        actor: &Actor,
        name: &str,
        args: &str,
    ) -> String {
        let Some(cmd) = AdminCommand::from_name(name) else {
            return format!("Unknown command: /{name}");
        };

        match cmd {
            AdminCommand::Start => {
                tracing::info!(actor = %actor.label(), "bot started");
                match &self.bot_name {
                    Some(bot) => format!("@{bot} has started! Use /help to see commands."),
                    None => "Bot has started! Use /help to see commands.".to_string(),
                }
            }
            AdminCommand::Help => help_text(),
            AdminCommand::SetOrigin => {
                self.enter(chat_id, actor, DialogKind::SetOrigin, args).await
            }
            AdminCommand::SetDestination => {
                self.enter(chat_id, actor, DialogKind::SetDestination, args)
                    .await
            }
            AdminCommand::AddAdmin => {
                self.enter(chat_id, actor, DialogKind::AddAdmin, args).await
            }
            AdminCommand::RmAdmin => self.rm_admin(actor, args).await,
            AdminCommand::Pause => self.set_paused(actor, true).await,
            AdminCommand::Resume => self.set_paused(actor, false).await,
            AdminCommand::Status => self.status(actor).await,
            AdminCommand::Cancel => {
                self.cancel(DialogKey::new(chat_id, actor), actor).await
            }
        }
    }

    async fn cancel(&self, key: DialogKey, actor: &Actor) -> String {
        match self.dialogs.cancel(key).await {
            Some(kind) => {
                tracing::info!(actor = %actor.label(), command = kind.command(), "dialog cancelled");
                "Operation cancelled.".to_string()
            }
            None => "No operation in progress.".to_string(),
        }
    }

    /// Consume plain text as a dialog payload.
    ///
    /// Returns `None` when the actor has no pending dialog (the text is not ours).
    pub async fn handle_text(
        &self,
        chat_id: ChatId,
        actor: &Actor,
        text: &str,
    ) -> Option<String> {
        let dialog = self.dialogs.take(DialogKey::new(chat_id, actor)).await?;
        Some(self.apply(actor, dialog.kind, text).await)
    }

    async fn enter(
        &self,
        chat_id: ChatId,
        actor: &Actor,
        kind: DialogKind,
        args: &str,
    ) -> String {
        if let Err(e) = self.check_entry(actor, kind).await {
            return self.denial(actor, kind, e);
        }

        // Inline arguments skip the dialog and run the same validation. They
        // still end whatever dialog the actor had open here.
        if !args.trim().is_empty() {
            if let Some(prev) = self.dialogs.cancel(DialogKey::new(chat_id, actor)).await {
                tracing::info!(
                    actor = %actor.label(),
                    replaced = prev.command(),
                    "pending dialog replaced"
                );
            }
            return self.apply(actor, kind, args).await;
        }

        if let Some(prev) = self.dialogs.begin(chat_id, actor, kind).await {
            tracing::info!(
                actor = %actor.label(),
                replaced = prev.command(),
                "pending dialog replaced"
            );
        }
        tracing::info!(actor = %actor.label(), command = kind.command(), "dialog started");
        kind.prompt().to_string()
    }

    async fn check_entry(&self, actor: &Actor, kind: DialogKind) -> Result<()> {
        let allowed = match kind {
            DialogKind::AddAdmin => self.roles.can_add_admin(actor),
            DialogKind::SetOrigin | DialogKind::SetDestination => {
                let admins = self.routing.snapshot().await.admins;
                self.roles.is_privileged(actor, &admins)
            }
        };
        if allowed {
            Ok(())
        } else {
            Err(Error::PermissionDenied(kind.command().to_string()))
        }
    }

    fn denial(&self, actor: &Actor, kind: DialogKind, err: Error) -> String {
        tracing::warn!(actor = %actor.label(), command = kind.command(), error = %err, "permission denied");
        match kind {
            DialogKind::AddAdmin => DENIED_SUPER.to_string(),
            _ => DENIED.to_string(),
        }
    }

    async fn apply(&self, actor: &Actor, kind: DialogKind, payload: &str) -> String {
        match kind {
            DialogKind::SetOrigin | DialogKind::SetDestination => {
                self.replace_channels(actor, kind, payload).await
            }
            DialogKind::AddAdmin => self.add_admin(actor, payload).await,
        }
    }

    async fn replace_channels(&self, actor: &Actor, kind: DialogKind, payload: &str) -> String {
        let label = if kind == DialogKind::SetOrigin {
            "origin"
        } else {
            "destination"
        };

        let ids = match parse_chat_ids(payload) {
            Ok(ids) => ids,
            Err(e) => {
                tracing::info!(actor = %actor.label(), error = %e, "rejected {label} channel ids");
                return "Invalid Channel IDs. Use integers separated by spaces.".to_string();
            }
        };

        let roles = &self.roles;
        let updated = self
            .routing
            .update(|cfg| {
                if !roles.is_privileged(actor, &cfg.admins) {
                    return Err(Error::PermissionDenied(kind.command().to_string()));
                }
                let set = ids.iter().copied().collect();
                if kind == DialogKind::SetOrigin {
                    cfg.origins = set;
                } else {
                    cfg.destinations = set;
                }
                Ok(())
            })
            .await;

        match updated {
            Ok(()) => {
                tracing::info!(actor = %actor.label(), ?ids, "{label} channels replaced");
                let mut names = Vec::with_capacity(ids.len());
                for id in &ids {
                    names.push(display_name(self.bus.as_ref(), *id).await);
                }
                let title = if kind == DialogKind::SetOrigin {
                    "Origin"
                } else {
                    "Destination"
                };
                format!("{title} channels set: {}", names.join(", "))
            }
            Err(e @ Error::PermissionDenied(_)) => self.denial(actor, kind, e),
            Err(e) => {
                tracing::error!(actor = %actor.label(), error = %e, "failed to set {label} channels");
                format!("Error: Could not set {label} channels.")
            }
        }
    }

    async fn add_admin(&self, actor: &Actor, payload: &str) -> String {
        let handle = match parse_admin_handle(payload) {
            Ok(h) => h,
            Err(e) => {
                tracing::info!(actor = %actor.label(), error = %e, "rejected admin handle");
                return "Invalid username. Use format: @username".to_string();
            }
        };

        let roles = &self.roles;
        let updated = self
            .routing
            .update(|cfg| {
                if !roles.can_add_admin(actor) {
                    return Err(Error::PermissionDenied("add_admin".to_string()));
                }
                Ok(cfg.admins.insert(handle.clone()))
            })
            .await;

        match updated {
            Ok(true) => {
                tracing::info!(actor = %actor.label(), admin = %handle, "admin added");
                format!("Added @{handle} as admin.")
            }
            Ok(false) => format!("@{handle} is already an admin."),
            Err(e @ Error::PermissionDenied(_)) => self.denial(actor, DialogKind::AddAdmin, e),
            Err(e) => {
                tracing::error!(actor = %actor.label(), error = %e, "failed to add admin");
                "Error: Could not add admin.".to_string()
            }
        }
    }

    async fn rm_admin(&self, actor: &Actor, args: &str) -> String {
        let snapshot = self.routing.snapshot().await;
        if !self.roles.is_privileged(actor, &snapshot.admins) {
            tracing::warn!(actor = %actor.label(), command = "rm_admin", "permission denied");
            return DENIED.to_string();
        }

        let regular = self.roles.regular_admins(&snapshot.admins);
        if regular.is_empty() {
            return "No regular admins to remove.".to_string();
        }

        let arg = args.split_whitespace().next().unwrap_or("");
        let Ok(index) = arg.parse::<usize>() else {
            let lines = regular
                .iter()
                .enumerate()
                .map(|(i, admin)| format!("{}. {admin}", i + 1))
                .collect::<Vec<_>>()
                .join("\n");
            return format!("Current admins:\n{lines}\nUse /rm_admin <number> to remove.");
        };

        let roles = &self.roles;
        let removed = self
            .routing
            .update(|cfg| {
                let regular = roles.regular_admins(&cfg.admins);
                let target = index
                    .checked_sub(1)
                    .and_then(|i| regular.get(i))
                    .cloned()
                    .ok_or_else(|| Error::InvalidInput(format!("no admin at index {index}")))?;
                if !roles.can_remove_admin(actor, &cfg.admins, &target) {
                    return Err(Error::PermissionDenied("rm_admin".to_string()));
                }
                cfg.admins.remove(&target);
                Ok(target)
            })
            .await;

        match removed {
            Ok(target) => {
                tracing::info!(actor = %actor.label(), admin = %target, "admin removed");
                format!("Removed admin {target}.")
            }
            Err(Error::InvalidInput(_)) => "Invalid number!".to_string(),
            Err(e @ Error::PermissionDenied(_)) => {
                tracing::warn!(actor = %actor.label(), error = %e, "permission denied");
                DENIED.to_string()
            }
            Err(e) => {
                tracing::error!(actor = %actor.label(), error = %e, "failed to remove admin");
                "Error: Could not remove admin.".to_string()
            }
        }
    }

    async fn set_paused(&self, actor: &Actor, paused: bool) -> String {
        let roles = &self.roles;
        let checked = self
            .routing
            .set_paused(paused, |cfg| {
                if roles.is_privileged(actor, &cfg.admins) {
                    Ok(())
                } else {
                    Err(Error::PermissionDenied("pause".to_string()))
                }
            })
            .await;
        if let Err(e) = checked {
            tracing::warn!(actor = %actor.label(), paused, error = %e, "permission denied");
            return DENIED.to_string();
        }

        if paused {
            tracing::info!(actor = %actor.label(), "forwarding paused");
            "Message forwarding paused.".to_string()
        } else {
            tracing::info!(actor = %actor.label(), "forwarding resumed");
            "Message forwarding resumed.".to_string()
        }
    }

    async fn status(&self, actor: &Actor) -> String {
        let cfg = self.routing.snapshot().await;
        if !self.roles.is_privileged(actor, &cfg.admins) {
            tracing::warn!(actor = %actor.label(), command = "status", "permission denied");
            return DENIED.to_string();
        }

        let origins = self.describe_channels(cfg.origins.iter().copied()).await;
        let destinations = self.describe_channels(cfg.destinations.iter().copied()).await;
        let admins = if cfg.admins.is_empty() {
            "None".to_string()
        } else {
            cfg.admins.iter().cloned().collect::<Vec<_>>().join(", ")
        };

        tracing::info!(actor = %actor.label(), "status checked");
        format!(
            "Status: {}\nOrigin Channels: {origins}\nDestination Channels: {destinations}\nAdmins: {admins}",
            if cfg.paused { "Paused" } else { "Running" },
        )
    }

    async fn describe_channels(&self, ids: impl Iterator<Item = ChatId>) -> String {
        let mut parts = Vec::new();
        for id in ids {
            parts.push(format!("{} ({id})", display_name(self.bus.as_ref(), id).await));
        }
        if parts.is_empty() {
            "Not set".to_string()
        } else {
            parts.join(", ")
        }
    }
}

fn help_text() -> String {
    [
        "Commands:",
        "/start - Check the bot is running",
        "/set_origin [ids...] - Replace origin channels",
        "/set_destination [ids...] - Replace destination channels",
        "/add_admin [@username] - Add an admin (super admins only)",
        "/rm_admin [number] - List or remove an admin",
        "/pause - Pause forwarding",
        "/resume - Resume forwarding",
        "/status - Show current configuration",
        "/cancel - Abort the current operation",
    ]
    .join("\n")
}

/// Whitespace-separated integer chat ids. Any bad token rejects the whole input.
pub fn parse_chat_ids(payload: &str) -> Result<Vec<ChatId>> {
    let mut ids = Vec::new();
    for token in payload.split_whitespace() {
        let id = token
            .parse::<i64>()
            .map_err(|_| Error::InvalidInput(format!("not a channel id: {token}")))?;
        ids.push(ChatId(id));
    }
    if ids.is_empty() {
        return Err(Error::InvalidInput("no channel ids given".to_string()));
    }
    Ok(ids)
}

/// A single `@handle` token; returns the handle without the marker.
pub fn parse_admin_handle(payload: &str) -> Result<String> {
    let mut tokens = payload.split_whitespace();
    let (Some(token), None) = (tokens.next(), tokens.next()) else {
        return Err(Error::InvalidInput(
            "expected exactly one @username".to_string(),
        ));
    };
    let handle = token
        .strip_prefix('@')
        .ok_or_else(|| Error::InvalidInput(format!("missing @ marker: {token}")))?;
    if handle.is_empty() {
        return Err(Error::InvalidInput("empty username".to_string()));
    }
    Ok(handle.to_string())
}
