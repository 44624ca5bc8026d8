use derive_more::Display;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[display(fmt = "admin")]
    Admin = 1,
    #[display(fmt = "manager")]
    Manager = 2,
    #[display(fmt = "employee")]
    Employee = 3,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role id {0}")]
pub struct UnknownRole(pub u8);

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Manager),
            3 => Some(Role::Employee),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Role {
    type Error = UnknownRole;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Role::from_id(id).ok_or(UnknownRole(id))
    }
}
