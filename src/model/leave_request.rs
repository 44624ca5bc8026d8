use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::leave_balance::BalanceKey;
use crate::workflow::LeaveStatus;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "user_id": 1000,
    "leave_type_id": 1,
    "start_date": "2026-01-05",
    "end_date": "2026-01-07",
    "total_days": 3,
    "reason": "Family trip",
    "emergency": false,
    "status": "pending",
    "created_at": "2026-01-01T00:00:00Z",
    "updated_at": "2026-01-01T00:00:00Z"
}))]
pub struct LeaveRequest {
    pub id: u64,
    /// owner of the request
    pub user_id: u64,
    pub leave_type_id: u64,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-07", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub total_days: u32,
    pub reason: String,
    pub emergency: bool,
    #[sqlx(try_from = "String")]
    pub status: LeaveStatus,
    pub manager_actor_id: Option<u64>,
    pub manager_comment: Option<String>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub manager_acted_at: Option<DateTime<Utc>>,
    pub admin_actor_id: Option<u64>,
    pub admin_comment: Option<String>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub admin_acted_at: Option<DateTime<Utc>>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

impl LeaveRequest {
    /// The balance row this request draws from.
    pub fn balance_key(&self) -> BalanceKey {
        BalanceKey {
            user_id: self.user_id,
            leave_type_id: self.leave_type_id,
            year: balance_year(self.start_date),
        }
    }
}

pub fn balance_year(date: NaiveDate) -> i32 {
    use chrono::Datelike;
    date.year()
}

/// Inclusive calendar-day span.
pub fn span_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

#[derive(Debug, Clone)]
pub struct NewLeaveRequest {
    pub user_id: u64,
    pub leave_type_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_days: u32,
    pub reason: String,
    pub emergency: bool,
}

/// What a transition writes onto the request row.
#[derive(Debug, Clone)]
pub struct TransitionRecord {
    pub request_id: u64,
    pub from: LeaveStatus,
    pub to: LeaveStatus,
    pub actor_id: u64,
    pub comment: Option<String>,
    pub at: DateTime<Utc>,
}
