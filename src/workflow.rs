//! The leave approval state machine.
//!
//! ```text
//! pending ──manager approve──▶ manager_approved ──admin approve──▶ admin_approved
//!    │                              │
//!    ├──manager reject──▶ manager_rejected      └──admin reject──▶ admin_rejected
//!    └──cancel (owner, from either open state)──▶ cancelled
//! ```
//!
//! [`transition`] is the only place that decides whether a move is legal and
//! what it does to the requester's balance.
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};
use utoipa::ToSchema;

use crate::error::LeaveError;
use crate::ledger::BalanceDelta;
use crate::model::user::User;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, EnumString, Display,
    AsRefStr, IntoStaticStr, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeaveStatus {
    Pending,
    ManagerApproved,
    ManagerRejected,
    AdminApproved,
    AdminRejected,
    Cancelled,
}

impl LeaveStatus {
    /// Open requests still hold their days as pending.
    pub fn is_open(self) -> bool {
        matches!(self, LeaveStatus::Pending | LeaveStatus::ManagerApproved)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_open()
    }

    /// Statuses that block the same dates for another request.
    pub fn occupies_calendar(self) -> bool {
        self.is_open() || self == LeaveStatus::AdminApproved
    }

    /// The review level that acts next, if any.
    pub fn review_stage(self) -> Option<Level> {
        match self {
            LeaveStatus::Pending => Some(Level::Manager),
            LeaveStatus::ManagerApproved => Some(Level::Admin),
            _ => None,
        }
    }
}

impl TryFrom<String> for LeaveStatus {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    Approve,
    Reject,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Level {
    Manager,
    Admin,
}

/// How the acting user relates to the owner of a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActorRelation {
    pub same_tenant: bool,
    pub is_owner: bool,
    pub is_owners_manager: bool,
    pub is_admin: bool,
}

impl ActorRelation {
    pub fn between(actor: &User, owner: &User) -> Self {
        Self {
            same_tenant: actor.tenant_id == owner.tenant_id,
            is_owner: actor.id == owner.id,
            is_owners_manager: owner.manager_id == Some(actor.id),
            is_admin: actor.is_admin(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceEffect {
    Unchanged,
    /// pending days go back to remaining
    Release,
    /// pending days become used days
    Consume,
}

impl BalanceEffect {
    pub fn delta(self, days: u32) -> Option<BalanceDelta> {
        match self {
            BalanceEffect::Unchanged => None,
            BalanceEffect::Release => Some(BalanceDelta::release(days)),
            BalanceEffect::Consume => Some(BalanceDelta::consume(days)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: LeaveStatus,
    pub to: LeaveStatus,
    pub action: Action,
    /// Review level that performed the move; `None` for cancellation.
    pub level: Option<Level>,
    pub effect: BalanceEffect,
}

/// Validates `(current state, action, level, actor)` and returns the move to
/// apply. A `level` of `None` on approve/reject means "whichever level is
/// next".
///
/// The state is checked before the actor, so a request in a terminal state
/// always yields [`LeaveError::InvalidState`].
pub fn transition(
    from: LeaveStatus,
    action: Action,
    level: Option<Level>,
    relation: &ActorRelation,
) -> Result<Transition, LeaveError> {
    let invalid = || LeaveError::InvalidState {
        status: from,
        action,
    };

    if from.is_terminal() {
        return Err(invalid());
    }

    let (to, effect, level) = match action {
        Action::Cancel => (LeaveStatus::Cancelled, BalanceEffect::Release, None),
        Action::Approve | Action::Reject => {
            let stage = from.review_stage().ok_or_else(invalid)?;
            if level.is_some_and(|requested| requested != stage) {
                return Err(invalid());
            }
            let (to, effect) = match (stage, action) {
                (Level::Manager, Action::Approve) => {
                    (LeaveStatus::ManagerApproved, BalanceEffect::Unchanged)
                }
                (Level::Manager, _) => (LeaveStatus::ManagerRejected, BalanceEffect::Release),
                (Level::Admin, Action::Approve) => {
                    (LeaveStatus::AdminApproved, BalanceEffect::Consume)
                }
                (Level::Admin, _) => (LeaveStatus::AdminRejected, BalanceEffect::Release),
            };
            (to, effect, Some(stage))
        }
    };

    authorize(action, level, relation)?;

    Ok(Transition {
        from,
        to,
        action,
        level,
        effect,
    })
}

fn authorize(
    action: Action,
    level: Option<Level>,
    relation: &ActorRelation,
) -> Result<(), LeaveError> {
    let deny = |msg: &str| Err(LeaveError::Unauthorized(msg.to_string()));

    if !relation.same_tenant {
        return deny("leave request belongs to another organisation");
    }

    match (action, level) {
        (Action::Cancel, _) if relation.is_owner => Ok(()),
        (Action::Cancel, _) => deny("only the requester can cancel a leave request"),
        _ if relation.is_owner => deny("cannot review your own leave request"),
        (_, Some(Level::Manager)) if relation.is_owners_manager || relation.is_admin => Ok(()),
        (_, Some(Level::Manager)) => {
            deny("only the requester's manager or an admin can review this request")
        }
        _ if relation.is_admin => Ok(()),
        _ => deny("final approval requires the admin role"),
    }
}
