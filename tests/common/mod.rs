#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use futures::lock::{Mutex, OwnedMutexGuard};

use leave_management::ledger::BalanceDelta;
use leave_management::model::leave_balance::{BalanceKey, LeaveBalance, NewBalance};
use leave_management::model::leave_request::{LeaveRequest, NewLeaveRequest, TransitionRecord};
use leave_management::model::leave_type::{LeaveCategory, LeaveType};
use leave_management::model::notification::{NewNotification, Notification};
use leave_management::model::role::Role;
use leave_management::model::user::User;
use leave_management::service::{LeaveService, SubmitLeave};
use leave_management::store::{
    ApprovalQueue, LeaveStore, LeaveTx, Page, RequestFilter, RequestScope, StoreError,
};
use leave_management::workflow::LeaveStatus;

/* =========================
In-memory store
========================= */

#[derive(Debug, Clone, Default)]
pub struct State {
    pub users: BTreeMap<u64, User>,
    pub leave_types: Vec<LeaveType>,
    pub balances: BTreeMap<BalanceKey, LeaveBalance>,
    pub requests: BTreeMap<u64, LeaveRequest>,
    pub notifications: BTreeMap<u64, Notification>,
    pub next_id: u64,
    /// makes every notification insert fail
    pub fail_notifications: bool,
    pub leave_type_reads: usize,
    /// reads made inside committed transactions, in order
    pub tx_reads: Vec<&'static str>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn owner(&self, request: &LeaveRequest) -> Option<&User> {
        self.users.get(&request.user_id)
    }
}

/// Transactions hold the whole state lock, so they run one at a time, the
/// way row locks serialize them in MySQL. Writes are staged and only
/// published on commit.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<State>,
    staged: State,
}

impl MemoryStore {
    pub fn new(state: State) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub async fn snapshot(&self) -> State {
        self.state.lock().await.clone()
    }

    pub async fn update(&self, f: impl FnOnce(&mut State)) {
        f(&mut *self.state.lock().await);
    }

    pub async fn balance(&self, key: BalanceKey) -> Option<LeaveBalance> {
        self.state.lock().await.balances.get(&key).cloned()
    }

    pub async fn notifications_for(&self, user_id: u64) -> Vec<Notification> {
        self.state
            .lock()
            .await
            .notifications
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }
}

impl LeaveStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryTx { guard, staged })
    }

    async fn leave_types(&self) -> Result<Vec<LeaveType>, StoreError> {
        let mut state = self.state.lock().await;
        state.leave_type_reads += 1;
        Ok(state.leave_types.clone())
    }

    async fn user(&self, id: u64) -> Result<Option<User>, StoreError> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn tenant_users(&self, tenant_id: u64) -> Result<Vec<User>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .values()
            .filter(|u| u.tenant_id == tenant_id && u.is_active)
            .cloned()
            .collect())
    }

    async fn balances(&self, user_id: u64, year: i32) -> Result<Vec<LeaveBalance>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .balances
            .values()
            .filter(|b| b.user_id == user_id && b.year == year)
            .cloned()
            .collect())
    }

    async fn request(&self, id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        Ok(self.state.lock().await.requests.get(&id).cloned())
    }

    async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<Page<LeaveRequest>, StoreError> {
        let state = self.state.lock().await;

        let mut matching: Vec<LeaveRequest> = state
            .requests
            .values()
            .filter(|r| {
                let Some(owner) = state.owner(r) else {
                    return false;
                };
                let in_scope = match filter.scope {
                    RequestScope::User(user_id) => r.user_id == user_id,
                    RequestScope::Team { manager_id } => owner.manager_id == Some(manager_id),
                    RequestScope::Tenant(tenant_id) => owner.tenant_id == tenant_id,
                };
                in_scope
                    && filter.status.is_none_or(|s| r.status == s)
                    && filter.year.is_none_or(|y| r.start_date.year() == y)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        let total = matching.len() as i64;
        let data = matching
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.per_page as usize)
            .collect();

        Ok(Page {
            data,
            page: filter.page,
            per_page: filter.per_page,
            total,
        })
    }

    async fn approval_queue(&self, queue: ApprovalQueue) -> Result<Vec<LeaveRequest>, StoreError> {
        let state = self.state.lock().await;

        let mut queued: Vec<LeaveRequest> = state
            .requests
            .values()
            .filter(|r| {
                let Some(owner) = state.owner(r) else {
                    return false;
                };
                match queue {
                    ApprovalQueue::Manager(manager_id) => {
                        r.status == LeaveStatus::Pending && owner.manager_id == Some(manager_id)
                    }
                    ApprovalQueue::Admin(tenant_id) => {
                        owner.tenant_id == tenant_id
                            && (r.status == LeaveStatus::ManagerApproved
                                || (r.status == LeaveStatus::Pending
                                    && owner.manager_id.is_none()))
                    }
                }
            })
            .cloned()
            .collect();
        queued.sort_by_key(|r| (r.start_date, r.id));
        Ok(queued)
    }

    async fn status_counts(
        &self,
        user_id: u64,
        year: i32,
    ) -> Result<Vec<(LeaveStatus, i64)>, StoreError> {
        let state = self.state.lock().await;

        let mut counts: Vec<(LeaveStatus, i64)> = Vec::new();
        for r in state
            .requests
            .values()
            .filter(|r| r.user_id == user_id && r.start_date.year() == year)
        {
            match counts.iter_mut().find(|(s, _)| *s == r.status) {
                Some((_, n)) => *n += 1,
                None => counts.push((r.status, 1)),
            }
        }
        Ok(counts)
    }

    async fn notifications(
        &self,
        user_id: u64,
        unread_only: bool,
        limit: u32,
    ) -> Result<Vec<Notification>, StoreError> {
        let state = self.state.lock().await;

        let mut found: Vec<Notification> = state
            .notifications
            .values()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.is_read))
            .cloned()
            .collect();
        found.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        found.truncate(limit as usize);
        Ok(found)
    }

    async fn unread_count(&self, user_id: u64) -> Result<i64, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .notifications
            .values()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count() as i64)
    }

    async fn mark_read(
        &self,
        user_id: u64,
        id: u64,
        at: DateTime<Utc>,
    ) -> Result<Option<Notification>, StoreError> {
        let mut state = self.state.lock().await;

        let Some(notification) = state
            .notifications
            .get_mut(&id)
            .filter(|n| n.user_id == user_id)
        else {
            return Ok(None);
        };
        if !notification.is_read {
            notification.is_read = true;
            notification.read_at = Some(at);
        }
        Ok(Some(notification.clone()))
    }

    async fn mark_all_read(&self, user_id: u64, at: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;

        let mut updated = 0;
        for n in state
            .notifications
            .values_mut()
            .filter(|n| n.user_id == user_id && !n.is_read)
        {
            n.is_read = true;
            n.read_at = Some(at);
            updated += 1;
        }
        Ok(updated)
    }

    async fn delete_notification(&self, user_id: u64, id: u64) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;

        if state
            .notifications
            .get(&id)
            .is_some_and(|n| n.user_id == user_id)
        {
            state.notifications.remove(&id);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

impl LeaveTx for MemoryTx {
    async fn user(&mut self, id: u64) -> Result<Option<User>, StoreError> {
        self.staged.tx_reads.push("user");
        Ok(self.staged.users.get(&id).cloned())
    }

    async fn lock_user(&mut self, id: u64) -> Result<Option<User>, StoreError> {
        self.staged.tx_reads.push("lock_user");
        Ok(self.staged.users.get(&id).cloned())
    }

    async fn first_admin(&mut self, tenant_id: u64) -> Result<Option<User>, StoreError> {
        Ok(self
            .staged
            .users
            .values()
            .find(|u| u.tenant_id == tenant_id && u.role == Role::Admin && u.is_active)
            .cloned())
    }

    async fn lock_request(&mut self, id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        Ok(self.staged.requests.get(&id).cloned())
    }

    async fn lock_balance(
        &mut self,
        key: &BalanceKey,
    ) -> Result<Option<LeaveBalance>, StoreError> {
        self.staged.tx_reads.push("lock_balance");
        Ok(self.staged.balances.get(key).cloned())
    }

    async fn insert_balance_if_absent(&mut self, balance: &NewBalance) -> Result<bool, StoreError> {
        if self.staged.balances.contains_key(&balance.key) {
            return Ok(false);
        }
        let id = self.staged.next_id();
        self.staged.balances.insert(
            balance.key,
            LeaveBalance {
                id,
                user_id: balance.key.user_id,
                leave_type_id: balance.key.leave_type_id,
                year: balance.key.year,
                total_days: balance.total_days,
                used_days: 0,
                pending_days: 0,
            },
        );
        Ok(true)
    }

    async fn apply_delta(
        &mut self,
        key: &BalanceKey,
        delta: BalanceDelta,
    ) -> Result<(), StoreError> {
        let balance = self
            .staged
            .balances
            .get_mut(key)
            .ok_or_else(|| StoreError::Inconsistent(format!("no balance row for {key:?}")))?;
        *balance = balance
            .apply(delta)
            .map_err(|e| StoreError::Inconsistent(e.to_string()))?;
        Ok(())
    }

    async fn count_overlapping(
        &mut self,
        user_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<i64, StoreError> {
        self.staged.tx_reads.push("count_overlapping");
        Ok(self
            .staged
            .requests
            .values()
            .filter(|r| {
                r.user_id == user_id
                    && r.status.occupies_calendar()
                    && r.start_date <= end
                    && r.end_date >= start
            })
            .count() as i64)
    }

    async fn insert_request(&mut self, request: &NewLeaveRequest) -> Result<u64, StoreError> {
        let id = self.staged.next_id();
        let now = Utc::now();
        self.staged.requests.insert(
            id,
            LeaveRequest {
                id,
                user_id: request.user_id,
                leave_type_id: request.leave_type_id,
                start_date: request.start_date,
                end_date: request.end_date,
                total_days: request.total_days,
                reason: request.reason.clone(),
                emergency: request.emergency,
                status: LeaveStatus::Pending,
                manager_actor_id: None,
                manager_comment: None,
                manager_acted_at: None,
                admin_actor_id: None,
                admin_comment: None,
                admin_acted_at: None,
                cancelled_at: None,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn record_transition(&mut self, record: &TransitionRecord) -> Result<bool, StoreError> {
        let Some(request) = self
            .staged
            .requests
            .get_mut(&record.request_id)
            .filter(|r| r.status == record.from)
        else {
            return Ok(false);
        };

        match record.to {
            LeaveStatus::ManagerApproved | LeaveStatus::ManagerRejected => {
                request.manager_actor_id = Some(record.actor_id);
                request.manager_comment = record.comment.clone();
                request.manager_acted_at = Some(record.at);
            }
            LeaveStatus::AdminApproved | LeaveStatus::AdminRejected => {
                request.admin_actor_id = Some(record.actor_id);
                request.admin_comment = record.comment.clone();
                request.admin_acted_at = Some(record.at);
            }
            LeaveStatus::Cancelled => request.cancelled_at = Some(record.at),
            LeaveStatus::Pending => {
                return Err(StoreError::Inconsistent(
                    "cannot transition back to pending".into(),
                ));
            }
        }
        request.status = record.to;
        request.updated_at = record.at;
        Ok(true)
    }

    async fn insert_notification(
        &mut self,
        notification: &NewNotification,
    ) -> Result<u64, StoreError> {
        if self.staged.fail_notifications {
            return Err(StoreError::Inconsistent("notifications table unavailable".into()));
        }
        let id = self.staged.next_id();
        self.staged.notifications.insert(
            id,
            Notification {
                id,
                user_id: notification.user_id,
                leave_request_id: notification.leave_request_id,
                title: notification.title.clone(),
                message: notification.message.clone(),
                kind: notification.kind,
                is_read: false,
                created_at: Utc::now(),
                read_at: None,
            },
        );
        Ok(id)
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        *self.guard = self.staged;
        Ok(())
    }
}

/* =========================
Fixture
========================= */

pub const TENANT: u64 = 1;
pub const OTHER_TENANT: u64 = 2;

pub const ADMIN: u64 = 1;
pub const MANAGER: u64 = 2;
pub const ALICE: u64 = 3; // reports to MANAGER
pub const BOB: u64 = 4; // reports to MANAGER
pub const CAROL: u64 = 5; // no manager
pub const OUTSIDER_ADMIN: u64 = 10;
pub const OUTSIDER: u64 = 11;

pub const ANNUAL: u64 = 1;
pub const CASUAL: u64 = 2;
pub const SICK: u64 = 3;

pub const YEAR: i32 = 2026;

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

pub fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(YEAR, month, day).unwrap()
}

pub fn user(id: u64, tenant_id: u64, role: Role, manager_id: Option<u64>) -> User {
    User {
        id,
        tenant_id,
        username: format!("user{id}"),
        role,
        manager_id,
        is_active: true,
    }
}

pub fn leave_types() -> Vec<LeaveType> {
    vec![
        LeaveType {
            id: ANNUAL,
            category: LeaveCategory::Annual,
            name: "Annual Leave".into(),
            annual_days: 12,
            carry_forward_days: 5,
            max_consecutive_days: None,
            notice_days: 7,
        },
        LeaveType {
            id: CASUAL,
            category: LeaveCategory::Casual,
            name: "Casual Leave".into(),
            annual_days: 10,
            carry_forward_days: 0,
            max_consecutive_days: Some(3),
            notice_days: 1,
        },
        LeaveType {
            id: SICK,
            category: LeaveCategory::Sick,
            name: "Sick Leave".into(),
            annual_days: 14,
            carry_forward_days: 0,
            max_consecutive_days: None,
            notice_days: 0,
        },
    ]
}

pub fn key(user_id: u64, leave_type_id: u64) -> BalanceKey {
    key_for(user_id, leave_type_id, YEAR)
}

pub fn key_for(user_id: u64, leave_type_id: u64, year: i32) -> BalanceKey {
    BalanceKey {
        user_id,
        leave_type_id,
        year,
    }
}

pub struct Fixture {
    pub store: MemoryStore,
    pub service: LeaveService<MemoryStore>,
}

/// Two tenants; every user of the first tenant holds fresh balances for
/// [`YEAR`].
pub fn fixture() -> Fixture {
    let mut state = State {
        leave_types: leave_types(),
        next_id: 100,
        ..State::default()
    };

    for u in [
        user(ADMIN, TENANT, Role::Admin, None),
        user(MANAGER, TENANT, Role::Manager, None),
        user(ALICE, TENANT, Role::Employee, Some(MANAGER)),
        user(BOB, TENANT, Role::Employee, Some(MANAGER)),
        user(CAROL, TENANT, Role::Employee, None),
        user(OUTSIDER_ADMIN, OTHER_TENANT, Role::Admin, None),
        user(OUTSIDER, OTHER_TENANT, Role::Employee, Some(OUTSIDER_ADMIN)),
    ] {
        state.users.insert(u.id, u);
    }

    for user_id in [ADMIN, MANAGER, ALICE, BOB, CAROL, OUTSIDER] {
        for leave_type in leave_types() {
            let id = state.next_id();
            let key = key(user_id, leave_type.id);
            state.balances.insert(
                key,
                LeaveBalance {
                    id,
                    user_id,
                    leave_type_id: leave_type.id,
                    year: YEAR,
                    total_days: leave_type.annual_days,
                    used_days: 0,
                    pending_days: 0,
                },
            );
        }
    }

    let store = MemoryStore::new(state);
    let service = LeaveService::new(store.clone(), Duration::from_secs(300)).with_today(today);
    Fixture { store, service }
}

pub fn annual(start: NaiveDate, end: NaiveDate) -> SubmitLeave {
    SubmitLeave {
        leave_type_id: ANNUAL,
        start_date: start,
        end_date: end,
        reason: "Family trip".into(),
        emergency: false,
    }
}

impl Fixture {
    /// Submits three annual days (6-8 April) for `user_id`.
    pub async fn submit_three_days(&self, user_id: u64) -> LeaveRequest {
        self.service
            .submit(user_id, annual(date(4, 6), date(4, 8)))
            .await
            .unwrap()
    }

    pub async fn balance(&self, user_id: u64, leave_type_id: u64) -> LeaveBalance {
        self.store.balance(key(user_id, leave_type_id)).await.unwrap()
    }
}

/// (total, used, pending, remaining)
pub fn figures(balance: &LeaveBalance) -> (u32, u32, u32, i64) {
    (
        balance.total_days,
        balance.used_days,
        balance.pending_days,
        balance.remaining_days(),
    )
}
