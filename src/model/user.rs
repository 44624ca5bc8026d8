use serde::Serialize;

use super::role::Role;

/// A row of the `users` table. Read-only for this service: it resolves
/// tenancy and the manager relationship.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: u64,
    pub tenant_id: u64,
    pub username: String,
    #[sqlx(rename = "role_id", try_from = "u8")]
    pub role: Role,
    pub manager_id: Option<u64>,
    pub is_active: bool,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// True when `self` may read `other`'s requests and balances.
    pub fn can_view(&self, other: &User) -> bool {
        if self.tenant_id != other.tenant_id {
            return false;
        }
        self.id == other.id || other.manager_id == Some(self.id) || self.is_admin()
    }
}
