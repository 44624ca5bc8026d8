//! MySQL implementation of the leave store.
//!
//! Expected tables (column names as queried below): `users`, `leave_types`,
//! `leave_balances` (unique on `user_id, leave_type_id, year`, with
//! `remaining_days` as a generated column that is never read back),
//! `leave_requests` and `notifications`.
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Connection, MySql, MySqlPool, Transaction};

use super::{ApprovalQueue, LeaveStore, LeaveTx, Page, RequestFilter, RequestScope, StoreError};
use crate::ledger::BalanceDelta;
use crate::model::leave_balance::{BalanceKey, LeaveBalance, NewBalance};
use crate::model::leave_request::{LeaveRequest, NewLeaveRequest, TransitionRecord};
use crate::model::leave_type::LeaveType;
use crate::model::notification::{NewNotification, Notification};
use crate::model::role::Role;
use crate::model::user::User;
use crate::workflow::LeaveStatus;

const USER_COLUMNS: &str = "id, tenant_id, username, role_id, manager_id, is_active";

const BALANCE_COLUMNS: &str =
    "id, user_id, leave_type_id, year, total_days, used_days, pending_days";

const REQUEST_COLUMNS: &str = r#"
    r.id, r.user_id, r.leave_type_id, r.start_date, r.end_date, r.total_days,
    r.reason, r.emergency, r.status,
    r.manager_actor_id, r.manager_comment, r.manager_acted_at,
    r.admin_actor_id, r.admin_comment, r.admin_acted_at,
    r.cancelled_at, r.created_at, r.updated_at
"#;

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, leave_request_id, title, message, kind, is_read, created_at, read_at";

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    I32(i32),
    Str(&'static str),
}

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

pub struct MySqlTx {
    tx: Transaction<'static, MySql>,
}

impl LeaveStore for MySqlStore {
    type Tx = MySqlTx;

    async fn begin(&self) -> Result<MySqlTx, StoreError> {
        Ok(MySqlTx {
            tx: self.pool.begin().await?,
        })
    }

    async fn leave_types(&self) -> Result<Vec<LeaveType>, StoreError> {
        let types = sqlx::query_as::<_, LeaveType>(
            r#"
            SELECT id, category, name, annual_days, carry_forward_days,
                   max_consecutive_days, notice_days
            FROM leave_types
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(types)
    }

    async fn user(&self, id: u64) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn tenant_users(&self, tenant_id: u64) -> Result<Vec<User>, StoreError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE tenant_id = ? AND is_active = TRUE ORDER BY id"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn balances(&self, user_id: u64, year: i32) -> Result<Vec<LeaveBalance>, StoreError> {
        let sql = format!(
            "SELECT {BALANCE_COLUMNS} FROM leave_balances WHERE user_id = ? AND year = ? ORDER BY leave_type_id"
        );
        Ok(sqlx::query_as::<_, LeaveBalance>(&sql)
            .bind(user_id)
            .bind(year)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn request(&self, id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM leave_requests r WHERE r.id = ?");
        Ok(sqlx::query_as::<_, LeaveRequest>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<Page<LeaveRequest>, StoreError> {
        let mut conditions: Vec<&str> = Vec::new();
        let mut args: Vec<FilterValue> = Vec::new();

        match filter.scope {
            RequestScope::User(user_id) => {
                conditions.push("r.user_id = ?");
                args.push(FilterValue::U64(user_id));
            }
            RequestScope::Team { manager_id } => {
                conditions.push("u.manager_id = ?");
                args.push(FilterValue::U64(manager_id));
            }
            RequestScope::Tenant(tenant_id) => {
                conditions.push("u.tenant_id = ?");
                args.push(FilterValue::U64(tenant_id));
            }
        }

        if let Some(status) = filter.status {
            conditions.push("r.status = ?");
            args.push(FilterValue::Str(status_str(status)));
        }

        if let Some(year) = filter.year {
            conditions.push("YEAR(r.start_date) = ?");
            args.push(FilterValue::I32(year));
        }

        let where_sql = format!("WHERE {}", conditions.join(" AND "));

        // -------------------------
        // COUNT query
        // -------------------------
        let count_sql = format!(
            "SELECT COUNT(*) FROM leave_requests r JOIN users u ON u.id = r.user_id {where_sql}"
        );
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::I32(v) => count_q.bind(*v),
                FilterValue::Str(s) => count_q.bind(*s),
            };
        }
        let total = count_q.fetch_one(&self.pool).await?;

        // -------------------------
        // DATA query
        // -------------------------
        let data_sql = format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM leave_requests r
            JOIN users u ON u.id = r.user_id
            {where_sql}
            ORDER BY r.created_at DESC, r.id DESC
            LIMIT ? OFFSET ?
            "#
        );
        let mut data_q = sqlx::query_as::<_, LeaveRequest>(&data_sql);
        for arg in &args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(*v),
                FilterValue::I32(v) => data_q.bind(*v),
                FilterValue::Str(s) => data_q.bind(*s),
            };
        }
        let data = data_q
            .bind(u64::from(filter.per_page))
            .bind(filter.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            data,
            page: filter.page,
            per_page: filter.per_page,
            total,
        })
    }

    async fn approval_queue(&self, queue: ApprovalQueue) -> Result<Vec<LeaveRequest>, StoreError> {
        let (condition, id) = match queue {
            ApprovalQueue::Manager(manager_id) => (
                "r.status = 'pending' AND u.manager_id = ?",
                manager_id,
            ),
            ApprovalQueue::Admin(tenant_id) => (
                "u.tenant_id = ? AND (r.status = 'manager_approved' OR (r.status = 'pending' AND u.manager_id IS NULL))",
                tenant_id,
            ),
        };
        let sql = format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM leave_requests r
            JOIN users u ON u.id = r.user_id
            WHERE {condition}
            ORDER BY r.start_date ASC, r.id ASC
            "#
        );
        Ok(sqlx::query_as::<_, LeaveRequest>(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn status_counts(
        &self,
        user_id: u64,
        year: i32,
    ) -> Result<Vec<(LeaveStatus, i64)>, StoreError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT status, COUNT(*)
            FROM leave_requests
            WHERE user_id = ? AND YEAR(start_date) = ?
            GROUP BY status
            "#,
        )
        .bind(user_id)
        .bind(year)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(status, count)| {
                let status = status
                    .parse::<LeaveStatus>()
                    .map_err(|_| StoreError::Inconsistent(format!("unknown status {status}")))?;
                Ok((status, count))
            })
            .collect()
    }

    async fn notifications(
        &self,
        user_id: u64,
        unread_only: bool,
        limit: u32,
    ) -> Result<Vec<Notification>, StoreError> {
        let unread_sql = if unread_only { "AND is_read = FALSE" } else { "" };
        let sql = format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS}
            FROM notifications
            WHERE user_id = ? {unread_sql}
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#
        );
        Ok(sqlx::query_as::<_, Notification>(&sql)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn unread_count(&self, user_id: u64) -> Result<i64, StoreError> {
        Ok(sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn mark_read(
        &self,
        user_id: u64,
        id: u64,
        at: DateTime<Utc>,
    ) -> Result<Option<Notification>, StoreError> {
        sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = TRUE, read_at = ?
            WHERE id = ? AND user_id = ? AND is_read = FALSE
            "#,
        )
        .bind(at)
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        // already-read rows report zero affected rows, so look the row up
        let sql = format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ? AND user_id = ?");
        Ok(sqlx::query_as::<_, Notification>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn mark_all_read(&self, user_id: u64, at: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = ? WHERE user_id = ? AND is_read = FALSE",
        )
        .bind(at)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_notification(&self, user_id: u64, id: u64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl LeaveTx for MySqlTx {
    async fn user(&mut self, id: u64) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn lock_user(&mut self, id: u64) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ? FOR UPDATE");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn first_admin(&mut self, tenant_id: u64) -> Result<Option<User>, StoreError> {
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE tenant_id = ? AND role_id = ? AND is_active = TRUE
            ORDER BY id
            LIMIT 1
            "#
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(tenant_id)
            .bind(Role::Admin.id())
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn lock_request(&mut self, id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        let sql =
            format!("SELECT {REQUEST_COLUMNS} FROM leave_requests r WHERE r.id = ? FOR UPDATE");
        Ok(sqlx::query_as::<_, LeaveRequest>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn lock_balance(
        &mut self,
        key: &BalanceKey,
    ) -> Result<Option<LeaveBalance>, StoreError> {
        let sql = format!(
            r#"
            SELECT {BALANCE_COLUMNS}
            FROM leave_balances
            WHERE user_id = ? AND leave_type_id = ? AND year = ?
            FOR UPDATE
            "#
        );
        Ok(sqlx::query_as::<_, LeaveBalance>(&sql)
            .bind(key.user_id)
            .bind(key.leave_type_id)
            .bind(key.year)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn insert_balance_if_absent(&mut self, balance: &NewBalance) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT IGNORE INTO leave_balances
                (user_id, leave_type_id, year, total_days, used_days, pending_days)
            VALUES (?, ?, ?, ?, 0, 0)
            "#,
        )
        .bind(balance.key.user_id)
        .bind(balance.key.leave_type_id)
        .bind(balance.key.year)
        .bind(balance.total_days)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn apply_delta(
        &mut self,
        key: &BalanceKey,
        delta: BalanceDelta,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE leave_balances
            SET pending_days = pending_days + ?,
                used_days = used_days + ?
            WHERE user_id = ? AND leave_type_id = ? AND year = ?
            "#,
        )
        .bind(delta.pending)
        .bind(delta.used)
        .bind(key.user_id)
        .bind(key.leave_type_id)
        .bind(key.year)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() != 1 {
            return Err(StoreError::Inconsistent(format!(
                "balance row {key:?} missing while applying {delta:?}"
            )));
        }
        Ok(())
    }

    async fn count_overlapping(
        &mut self,
        user_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<i64, StoreError> {
        Ok(sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM leave_requests
            WHERE user_id = ?
              AND status IN ('pending', 'manager_approved', 'admin_approved')
              AND start_date <= ?
              AND end_date >= ?
            FOR SHARE
            "#,
        )
        .bind(user_id)
        .bind(end)
        .bind(start)
        .fetch_one(&mut *self.tx)
        .await?)
    }

    async fn insert_request(&mut self, request: &NewLeaveRequest) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (user_id, leave_type_id, start_date, end_date, total_days, reason, emergency, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.user_id)
        .bind(request.leave_type_id)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.total_days)
        .bind(&request.reason)
        .bind(request.emergency)
        .bind(status_str(LeaveStatus::Pending))
        .execute(&mut *self.tx)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn record_transition(&mut self, record: &TransitionRecord) -> Result<bool, StoreError> {
        let sql = match record.to {
            LeaveStatus::ManagerApproved | LeaveStatus::ManagerRejected => {
                r#"
                UPDATE leave_requests
                SET status = ?, manager_actor_id = ?, manager_comment = ?,
                    manager_acted_at = ?, updated_at = ?
                WHERE id = ? AND status = ?
                "#
            }
            LeaveStatus::AdminApproved | LeaveStatus::AdminRejected => {
                r#"
                UPDATE leave_requests
                SET status = ?, admin_actor_id = ?, admin_comment = ?,
                    admin_acted_at = ?, updated_at = ?
                WHERE id = ? AND status = ?
                "#
            }
            LeaveStatus::Cancelled => {
                r#"
                UPDATE leave_requests
                SET status = ?, cancelled_at = ?, updated_at = ?
                WHERE id = ? AND status = ?
                "#
            }
            LeaveStatus::Pending => {
                return Err(StoreError::Inconsistent(format!(
                    "request {} cannot transition back to pending",
                    record.request_id
                )));
            }
        };

        let mut query = sqlx::query(sql).bind(status_str(record.to));
        query = if record.to == LeaveStatus::Cancelled {
            query.bind(record.at)
        } else {
            query
                .bind(record.actor_id)
                .bind(record.comment.as_deref())
                .bind(record.at)
        };
        let result = query
            .bind(record.at)
            .bind(record.request_id)
            .bind(status_str(record.from))
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_notification(
        &mut self,
        notification: &NewNotification,
    ) -> Result<u64, StoreError> {
        // a failed insert rolls back to this savepoint only
        let mut savepoint = self.tx.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO notifications (user_id, leave_request_id, title, message, kind)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(notification.user_id)
        .bind(notification.leave_request_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.kind.as_ref())
        .execute(&mut *savepoint)
        .await?;

        savepoint.commit().await?;
        Ok(result.last_insert_id())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}

fn status_str(status: LeaveStatus) -> &'static str {
    status.into()
}
