use std::collections::BTreeSet;

use crate::domain::{Actor, Role};

/// Decides who may run privileged operations.
///
/// Super admins are fixed for the lifetime of the process; regular admins come
/// from the mutable routing config and are passed in by the caller so checks
/// always run against the same snapshot that is about to be mutated.
#[derive(Clone, Debug, Default)]
pub struct RoleAuthority {
    super_admins: BTreeSet<String>,
}

impl RoleAuthority {
    pub fn new<I, S>(super_admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            super_admins: super_admins.into_iter().map(Into::into).collect(),
        }
    }

    pub fn super_admins(&self) -> &BTreeSet<String> {
        &self.super_admins
    }

    pub fn is_super_handle(&self, handle: &str) -> bool {
        self.super_admins.contains(handle)
    }

    pub fn role(&self, actor: &Actor, admins: &BTreeSet<String>) -> Role {
        let Some(handle) = actor.handle() else {
            return Role::Unprivileged;
        };
        if self.super_admins.contains(handle) {
            Role::SuperAdmin
        } else if admins.contains(handle) {
            Role::Admin
        } else {
            Role::Unprivileged
        }
    }

    pub fn is_privileged(&self, actor: &Actor, admins: &BTreeSet<String>) -> bool {
        self.role(actor, admins) != Role::Unprivileged
    }

    pub fn is_super_admin(&self, actor: &Actor) -> bool {
        actor.handle().is_some_and(|h| self.super_admins.contains(h))
    }

    pub fn can_add_admin(&self, actor: &Actor) -> bool {
        self.is_super_admin(actor)
    }

    pub fn can_remove_admin(&self, actor: &Actor, admins: &BTreeSet<String>, target: &str) -> bool {
        self.is_privileged(actor, admins) && !self.is_super_handle(target)
    }

    /// Admins that may be removed at runtime, in stable (sorted) order.
    pub fn regular_admins(&self, admins: &BTreeSet<String>) -> Vec<String> {
        admins
            .iter()
            .filter(|a| !self.super_admins.contains(*a))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admins(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn roles_are_derived_from_handles() {
        let roles = RoleAuthority::new(["root"]);
        let set = admins(&["root", "alice"]);

        assert_eq!(roles.role(&Actor::new(1, Some("root")), &set), Role::SuperAdmin);
        assert_eq!(roles.role(&Actor::new(2, Some("alice")), &set), Role::Admin);
        assert_eq!(roles.role(&Actor::new(3, Some("eve")), &set), Role::Unprivileged);
        assert_eq!(roles.role(&Actor::new(4, None), &set), Role::Unprivileged);
    }

    #[test]
    fn super_admin_is_privileged_even_if_missing_from_admin_set() {
        let roles = RoleAuthority::new(["root"]);
        assert!(roles.is_privileged(&Actor::new(1, Some("root")), &BTreeSet::new()));
    }

    #[test]
    fn only_super_admins_add_admins() {
        let roles = RoleAuthority::new(["root"]);
        assert!(roles.can_add_admin(&Actor::new(1, Some("root"))));
        assert!(!roles.can_add_admin(&Actor::new(2, Some("alice"))));
        assert!(!roles.can_add_admin(&Actor::new(3, None)));
    }

    #[test]
    fn super_admins_cannot_be_removed() {
        let roles = RoleAuthority::new(["root"]);
        let set = admins(&["root", "alice", "bob"]);
        let alice = Actor::new(2, Some("alice"));
        let eve = Actor::new(3, Some("eve"));

        assert!(roles.can_remove_admin(&alice, &set, "bob"));
        assert!(!roles.can_remove_admin(&alice, &set, "root"));
        assert!(!roles.can_remove_admin(&eve, &set, "bob"));
        assert_eq!(roles.regular_admins(&set), vec!["alice", "bob"]);
    }
}
