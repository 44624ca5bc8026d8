//! Balance arithmetic. Every balance mutation goes through
//! [`LeaveBalance::apply`] before it is written, so an impossible delta is
//! refused in Rust even if the database would accept it.
use thiserror::Error;

use crate::model::leave_balance::{BalanceKey, LeaveBalance, NewBalance};
use crate::model::leave_type::LeaveType;

/// Signed change to the pending and used columns of one balance row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BalanceDelta {
    pub pending: i64,
    pub used: i64,
}

impl BalanceDelta {
    /// Submission: the days are held as pending.
    pub fn reserve(days: u32) -> Self {
        Self {
            pending: i64::from(days),
            used: 0,
        }
    }

    /// Rejection or cancellation: the held days are returned.
    pub fn release(days: u32) -> Self {
        Self {
            pending: -i64::from(days),
            used: 0,
        }
    }

    /// Final approval: the held days are spent.
    pub fn consume(days: u32) -> Self {
        Self {
            pending: -i64::from(days),
            used: i64::from(days),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.pending == 0 && self.used == 0
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("{column} for {key:?} would become {value}")]
    OutOfRange {
        key: BalanceKey,
        column: &'static str,
        value: i64,
    },
    #[error("balance {key:?} would be overdrawn to {remaining} remaining day(s)")]
    Overdrawn { key: BalanceKey, remaining: i64 },
}

impl LeaveBalance {
    pub fn remaining_days(&self) -> i64 {
        i64::from(self.total_days) - i64::from(self.used_days) - i64::from(self.pending_days)
    }

    pub fn covers(&self, days: u32) -> bool {
        self.remaining_days() >= i64::from(days)
    }

    /// Returns the balance after `delta`, or why it cannot be applied.
    pub fn apply(&self, delta: BalanceDelta) -> Result<LeaveBalance, LedgerError> {
        let key = self.key();
        let column = |column: &'static str, current: u32, change: i64| {
            let value = i64::from(current) + change;
            u32::try_from(value).map_err(|_| LedgerError::OutOfRange { key, column, value })
        };

        let next = LeaveBalance {
            pending_days: column("pending_days", self.pending_days, delta.pending)?,
            used_days: column("used_days", self.used_days, delta.used)?,
            ..self.clone()
        };

        let remaining = next.remaining_days();
        if remaining < 0 {
            return Err(LedgerError::Overdrawn { key, remaining });
        }
        Ok(next)
    }
}

/// Rows a user needs for `year`: one per leave type, seeded with the type's
/// annual allotment.
pub fn opening_balances(user_id: u64, year: i32, catalog: &[LeaveType]) -> Vec<NewBalance> {
    catalog
        .iter()
        .map(|leave_type| NewBalance {
            key: BalanceKey {
                user_id,
                leave_type_id: leave_type.id,
                year,
            },
            total_days: leave_type.annual_days,
        })
        .collect()
}
