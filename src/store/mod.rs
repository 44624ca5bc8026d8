//! Persistence boundary. Balance mutations are only reachable through a
//! [`LeaveTx`], so every write happens inside a transaction that also holds
//! the row locks the decision was based on.
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::ledger::BalanceDelta;
use crate::model::leave_balance::{BalanceKey, LeaveBalance, NewBalance};
use crate::model::leave_request::{LeaveRequest, NewLeaveRequest, TransitionRecord};
use crate::model::leave_type::LeaveType;
use crate::model::notification::{NewNotification, Notification};
use crate::model::user::User;
use crate::workflow::LeaveStatus;

pub mod mysql;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("inconsistent data: {0}")]
    Inconsistent(String),
}

/// Whose requests a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestScope {
    User(u64),
    /// direct reports of a manager
    Team { manager_id: u64 },
    Tenant(u64),
}

#[derive(Debug, Clone)]
pub struct RequestFilter {
    pub scope: RequestScope,
    pub status: Option<LeaveStatus>,
    pub year: Option<i32>,
    pub page: u32,
    pub per_page: u32,
}

impl RequestFilter {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// Requests waiting on a reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalQueue {
    /// `pending` requests of the manager's direct reports
    Manager(u64),
    /// `manager_approved` requests in the tenant, plus `pending` requests of
    /// users who have no manager
    Admin(u64),
}

#[allow(async_fn_in_trait)]
pub trait LeaveStore {
    type Tx: LeaveTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    async fn leave_types(&self) -> Result<Vec<LeaveType>, StoreError>;

    async fn user(&self, id: u64) -> Result<Option<User>, StoreError>;

    async fn tenant_users(&self, tenant_id: u64) -> Result<Vec<User>, StoreError>;

    async fn balances(&self, user_id: u64, year: i32) -> Result<Vec<LeaveBalance>, StoreError>;

    async fn request(&self, id: u64) -> Result<Option<LeaveRequest>, StoreError>;

    async fn list_requests(&self, filter: &RequestFilter)
    -> Result<Page<LeaveRequest>, StoreError>;

    async fn approval_queue(&self, queue: ApprovalQueue) -> Result<Vec<LeaveRequest>, StoreError>;

    async fn status_counts(
        &self,
        user_id: u64,
        year: i32,
    ) -> Result<Vec<(LeaveStatus, i64)>, StoreError>;

    async fn notifications(
        &self,
        user_id: u64,
        unread_only: bool,
        limit: u32,
    ) -> Result<Vec<Notification>, StoreError>;

    async fn unread_count(&self, user_id: u64) -> Result<i64, StoreError>;

    /// Marks one of the user's notifications read; `None` when it is not theirs.
    async fn mark_read(
        &self,
        user_id: u64,
        id: u64,
        at: DateTime<Utc>,
    ) -> Result<Option<Notification>, StoreError>;

    async fn mark_all_read(&self, user_id: u64, at: DateTime<Utc>) -> Result<u64, StoreError>;

    async fn delete_notification(&self, user_id: u64, id: u64) -> Result<bool, StoreError>;
}

/// One open transaction. Dropping it without [`LeaveTx::commit`] rolls back.
///
/// Submissions take [`LeaveTx::lock_user`] on the owner before any other
/// read, so every submission for one user runs one after another. The
/// later locking reads ([`LeaveTx::lock_balance`],
/// [`LeaveTx::count_overlapping`]) then see the latest committed rows rather
/// than an older snapshot.
#[allow(async_fn_in_trait)]
pub trait LeaveTx {
    async fn user(&mut self, id: u64) -> Result<Option<User>, StoreError>;

    /// Reads and locks a user row.
    async fn lock_user(&mut self, id: u64) -> Result<Option<User>, StoreError>;

    /// Lowest-id active admin of the tenant.
    async fn first_admin(&mut self, tenant_id: u64) -> Result<Option<User>, StoreError>;

    /// Reads and locks a request row.
    async fn lock_request(&mut self, id: u64) -> Result<Option<LeaveRequest>, StoreError>;

    /// Reads and locks a balance row.
    async fn lock_balance(&mut self, key: &BalanceKey)
    -> Result<Option<LeaveBalance>, StoreError>;

    /// Inserts the row unless one exists for the key; true when inserted.
    async fn insert_balance_if_absent(&mut self, balance: &NewBalance) -> Result<bool, StoreError>;

    async fn apply_delta(&mut self, key: &BalanceKey, delta: BalanceDelta)
    -> Result<(), StoreError>;

    /// Requests of the user in a calendar-occupying status that intersect
    /// `[start, end]`. A locking read: rows committed by a submission that
    /// held the owner lock first are counted.
    async fn count_overlapping(
        &mut self,
        user_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<i64, StoreError>;

    async fn insert_request(&mut self, request: &NewLeaveRequest) -> Result<u64, StoreError>;

    /// Writes the new status guarded on the old one; false when the row was
    /// no longer in `record.from`.
    async fn record_transition(&mut self, record: &TransitionRecord) -> Result<bool, StoreError>;

    async fn insert_notification(
        &mut self,
        notification: &NewNotification,
    ) -> Result<u64, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;
}
