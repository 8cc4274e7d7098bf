use std::collections::BTreeSet;

use tokio::sync::Mutex;

use crate::{domain::ChatId, store::ConfigStore, Result};

/// The mutable routing configuration.
///
/// Sets are ordered so the persisted record (and admin indices shown by
/// `/rm_admin`) are deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoutingConfig {
    pub origins: BTreeSet<ChatId>,
    pub destinations: BTreeSet<ChatId>,
    pub admins: BTreeSet<String>,
    pub paused: bool,
}

/// Single owner of [`RoutingConfig`].
///
/// Every read and write goes through one async mutex. Writers hold it across
/// persistence, so racing admin commands are applied one after another and the
/// file always reflects the last committed state.
pub struct RoutingTable {
    state: Mutex<RoutingConfig>,
    store: ConfigStore,
    pinned_admins: BTreeSet<String>,
}

impl RoutingTable {
    /// `pinned_admins` (the super admins) are re-added after every update.
    pub fn new(
        mut initial: RoutingConfig,
        store: ConfigStore,
        pinned_admins: impl IntoIterator<Item = String>,
    ) -> Self {
        let pinned_admins: BTreeSet<String> = pinned_admins.into_iter().collect();
        initial.admins.extend(pinned_admins.iter().cloned());
        Self {
            state: Mutex::new(initial),
            store,
            pinned_admins,
        }
    }

    /// Load from `store` (falling back to defaults) and build the table.
    pub fn load(store: ConfigStore, super_admins: &[String]) -> Self {
        let initial = store.load(super_admins);
        Self::new(initial, store, super_admins.iter().cloned())
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Consistent copy of the current config.
    pub async fn snapshot(&self) -> RoutingConfig {
        self.state.lock().await.clone()
    }

    /// Apply `f` to a copy of the config, persist it, then commit.
    ///
    /// If `f` fails nothing is written. If persisting fails the in-memory state
    /// is left untouched and the error is returned.
    pub async fn update<T>(
        &self,
        f: impl FnOnce(&mut RoutingConfig) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.state.lock().await;
        let mut next = guard.clone();
        let out = f(&mut next)?;
        next.admins.extend(self.pinned_admins.iter().cloned());

        self.store.save(&next)?;
        *guard = next;
        Ok(out)
    }

    /// Toggle forwarding. Returns the previous value. Not persisted.
    ///
    /// `check` sees the state under the same lock as the write; if it fails
    /// the flag is left alone.
    pub async fn set_paused(
        &self,
        paused: bool,
        check: impl FnOnce(&RoutingConfig) -> Result<()>,
    ) -> Result<bool> {
        let mut guard = self.state.lock().await;
        check(&guard)?;
        Ok(std::mem::replace(&mut guard.paused, paused))
    }
}
