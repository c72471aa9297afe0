//! Lookup of access keys for member roles and individual members.

use std::collections::HashMap;

use uuid::Uuid;

/// Resolves the principals named in access rules to access keys.
pub trait AccessKeyDirectory: Send + Sync {
    /// Access key of a member role (group).
    fn role_key(&self, role: &str) -> Option<Uuid>;

    /// Access key of an individual member, by login.
    fn member_key(&self, login: &str) -> Option<Uuid>;
}

/// In-memory directory keyed by lowercased role names and member logins.
#[derive(Debug, Clone, Default)]
pub struct MemoryAccessKeyDirectory {
    roles: HashMap<String, Uuid>,
    members: HashMap<String, Uuid>,
}

impl MemoryAccessKeyDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a role.
    pub fn with_role(mut self, role: &str, key: Uuid) -> Self {
        self.roles.insert(role.to_lowercase(), key);
        self
    }

    /// Register a member.
    pub fn with_member(mut self, login: &str, key: Uuid) -> Self {
        self.members.insert(login.to_lowercase(), key);
        self
    }
}

impl AccessKeyDirectory for MemoryAccessKeyDirectory {
    fn role_key(&self, role: &str) -> Option<Uuid> {
        self.roles.get(&role.to_lowercase()).copied()
    }

    fn member_key(&self, login: &str) -> Option<Uuid> {
        self.members.get(&login.to_lowercase()).copied()
    }
}
