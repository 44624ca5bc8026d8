use serde::Serialize;
use utoipa::ToSchema;

use super::leave_type::{LeaveCategory, LeaveType};

/// Identifies one balance row: one per (user, leave type, year).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BalanceKey {
    pub user_id: u64,
    pub leave_type_id: u64,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct LeaveBalance {
    pub id: u64,
    pub user_id: u64,
    pub leave_type_id: u64,
    pub year: i32,
    pub total_days: u32,
    pub used_days: u32,
    pub pending_days: u32,
}

impl LeaveBalance {
    pub fn key(&self) -> BalanceKey {
        BalanceKey {
            user_id: self.user_id,
            leave_type_id: self.leave_type_id,
            year: self.year,
        }
    }
}

/// A balance row that provisioning wants to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBalance {
    pub key: BalanceKey,
    pub total_days: u32,
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "leave_type_id": 1,
    "leave_type": "Annual Leave",
    "category": "annual",
    "year": 2026,
    "total_days": 12,
    "used_days": 3,
    "pending_days": 2,
    "remaining_days": 7
}))]
pub struct BalanceView {
    pub leave_type_id: u64,
    pub leave_type: String,
    pub category: Option<LeaveCategory>,
    pub year: i32,
    pub total_days: u32,
    pub used_days: u32,
    pub pending_days: u32,
    pub remaining_days: i64,
}

impl BalanceView {
    pub fn new(balance: &LeaveBalance, leave_type: Option<&LeaveType>) -> Self {
        Self {
            leave_type_id: balance.leave_type_id,
            leave_type: leave_type
                .map(|t| t.name.clone())
                .unwrap_or_else(|| format!("#{}", balance.leave_type_id)),
            category: leave_type.map(|t| t.category),
            year: balance.year,
            total_days: balance.total_days,
            used_days: balance.used_days,
            pending_days: balance.pending_days,
            remaining_days: balance.remaining_days(),
        }
    }
}
