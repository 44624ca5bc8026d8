use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDate, Utc};
use moka::future::Cache;
use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::error::{LeaveError, LeaveResult};
use crate::ledger::{self, BalanceDelta};
use crate::model::leave_balance::{BalanceKey, BalanceView};
use crate::model::leave_request::{
    LeaveRequest, NewLeaveRequest, TransitionRecord, balance_year, span_days,
};
use crate::model::leave_type::LeaveType;
use crate::model::notification::Notification;
use crate::model::role::Role;
use crate::model::user::User;
use crate::notify::{self, Audience, LeaveEvent, NoticeContext};
use crate::store::{
    ApprovalQueue, LeaveStore, LeaveTx, Page, RequestFilter, RequestScope, StoreError,
};
use crate::workflow::{self, Action, ActorRelation, LeaveStatus, Level};

const MAX_REASON_LEN: usize = 1000;
const DEFAULT_PER_PAGE: u32 = 20;
const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone)]
pub struct SubmitLeave {
    pub leave_type_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub emergency: bool,
}

#[derive(Debug, Clone)]
pub struct TransitionCommand {
    pub request_id: u64,
    pub actor_id: u64,
    pub action: Action,
    pub level: Option<Level>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RequestQuery {
    pub employee_id: Option<u64>,
    pub status: Option<LeaveStatus>,
    pub year: Option<i32>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ProvisionSummary {
    #[schema(example = 1)]
    pub users: u32,
    /// balance rows inserted
    #[schema(example = 3)]
    pub created: u32,
    /// rows that already existed and were left untouched
    #[schema(example = 0)]
    pub existing: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusCount {
    pub status: LeaveStatus,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Dashboard {
    #[schema(example = 2026)]
    pub year: i32,
    pub balances: Vec<BalanceView>,
    /// own requests starting in `year`, one entry per status
    pub requests: Vec<StatusCount>,
    pub awaiting_my_review: usize,
    pub unread_notifications: i64,
}

/// Leave workflow operations over a [`LeaveStore`].
///
/// Only the immutable leave type catalog is cached; balances and requests are
/// read from the store on every call.
pub struct LeaveService<S> {
    store: S,
    catalog: Cache<(), Arc<[LeaveType]>>,
    today: fn() -> NaiveDate,
}

impl<S: LeaveStore> LeaveService<S> {
    pub fn new(store: S, catalog_ttl: Duration) -> Self {
        Self {
            store,
            catalog: Cache::builder()
                .max_capacity(1)
                .time_to_live(catalog_ttl)
                .build(),
            today: || Utc::now().date_naive(),
        }
    }

    /// Overrides the calendar used for date validation.
    pub fn with_today(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn today(&self) -> NaiveDate {
        (self.today)()
    }

    /* =========================
    Leave type catalog
    ========================= */

    pub async fn leave_types(&self) -> LeaveResult<Arc<[LeaveType]>> {
        if let Some(catalog) = self.catalog.get(&()).await {
            return Ok(catalog);
        }
        self.reload_catalog().await
    }

    async fn reload_catalog(&self) -> LeaveResult<Arc<[LeaveType]>> {
        let catalog: Arc<[LeaveType]> = self.store.leave_types().await?.into();
        self.catalog.insert((), catalog.clone()).await;
        Ok(catalog)
    }

    async fn leave_type(&self, id: u64) -> LeaveResult<LeaveType> {
        let find = |catalog: &[LeaveType]| catalog.iter().find(|t| t.id == id).cloned();

        if let Some(found) = find(&self.leave_types().await?) {
            return Ok(found);
        }
        // seeded after the cache was filled
        find(&self.reload_catalog().await?).ok_or(LeaveError::NotFound("leave type"))
    }

    /* =========================
    Submission
    ========================= */

    #[instrument(skip(self, input), fields(leave_type_id = input.leave_type_id))]
    pub async fn submit(&self, user_id: u64, input: SubmitLeave) -> LeaveResult<LeaveRequest> {
        let today = self.today();
        let reason = input.reason.trim();

        if reason.is_empty() {
            return Err(LeaveError::validation("reason", "reason is required"));
        }
        if reason.chars().count() > MAX_REASON_LEN {
            return Err(LeaveError::validation(
                "reason",
                format!("reason cannot exceed {MAX_REASON_LEN} characters"),
            ));
        }
        if input.end_date < input.start_date {
            return Err(LeaveError::validation(
                "end_date",
                "end_date cannot be before start_date",
            ));
        }
        if input.start_date < today {
            return Err(LeaveError::validation(
                "start_date",
                "start_date cannot be in the past",
            ));
        }
        let year = balance_year(input.start_date);
        if balance_year(input.end_date) != year {
            return Err(LeaveError::validation(
                "end_date",
                "a leave request cannot span two calendar years",
            ));
        }

        let leave_type = self.leave_type(input.leave_type_id).await?;
        let total_days = u32::try_from(span_days(input.start_date, input.end_date))
            .map_err(|_| LeaveError::validation("end_date", "leave span is out of range"))?;

        if let Some(max) = leave_type.max_consecutive_days {
            if total_days > max {
                return Err(LeaveError::validation(
                    "end_date",
                    format!(
                        "{} allows at most {max} consecutive day(s)",
                        leave_type.name
                    ),
                ));
            }
        }
        if !input.emergency {
            let notice = (input.start_date - today).num_days();
            if notice < i64::from(leave_type.notice_days) {
                return Err(LeaveError::validation(
                    "start_date",
                    format!(
                        "{} requires {} day(s) notice",
                        leave_type.name, leave_type.notice_days
                    ),
                ));
            }
        }

        let mut tx = self.store.begin().await?;

        // serializes submissions per user; must be the first read
        let owner = tx
            .lock_user(user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| LeaveError::Unauthorized("unknown or inactive user".into()))?;

        let key = BalanceKey {
            user_id,
            leave_type_id: leave_type.id,
            year,
        };
        let balance = tx.lock_balance(&key).await?;
        let remaining = balance.as_ref().map_or(0, |b| b.remaining_days());
        let Some(balance) = balance.filter(|b| b.covers(total_days)) else {
            return Err(LeaveError::InsufficientBalance {
                requested: total_days,
                remaining,
            });
        };

        if tx
            .count_overlapping(user_id, input.start_date, input.end_date)
            .await?
            > 0
        {
            return Err(LeaveError::validation(
                "start_date",
                "dates overlap another open or approved leave request",
            ));
        }

        let delta = BalanceDelta::reserve(total_days);
        balance.apply(delta)?;

        let request_id = tx
            .insert_request(&NewLeaveRequest {
                user_id,
                leave_type_id: leave_type.id,
                start_date: input.start_date,
                end_date: input.end_date,
                total_days,
                reason: reason.to_string(),
                emergency: input.emergency,
            })
            .await?;
        tx.apply_delta(&key, delta).await?;

        let request = tx.lock_request(request_id).await?.ok_or_else(|| {
            StoreError::Inconsistent(format!("leave request {request_id} vanished after insert"))
        })?;

        emit(
            &mut tx,
            LeaveEvent::Submitted,
            &request,
            &owner,
            &leave_type.name,
            None,
        )
        .await;

        tx.commit().await?;

        info!(request_id, total_days, "Leave request submitted");
        Ok(request)
    }

    /* =========================
    Transitions
    ========================= */

    #[instrument(
        skip(self, cmd),
        fields(request_id = cmd.request_id, actor_id = cmd.actor_id, action = %cmd.action)
    )]
    pub async fn transition(&self, cmd: TransitionCommand) -> LeaveResult<LeaveRequest> {
        let catalog = self.leave_types().await?;

        let mut tx = self.store.begin().await?;

        let request = tx
            .lock_request(cmd.request_id)
            .await?
            .ok_or(LeaveError::NotFound("leave request"))?;
        let actor = tx
            .user(cmd.actor_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| LeaveError::Unauthorized("unknown or inactive user".into()))?;
        let owner = tx.user(request.user_id).await?.ok_or_else(|| {
            StoreError::Inconsistent(format!("owner of leave request {} missing", request.id))
        })?;

        let relation = ActorRelation::between(&actor, &owner);
        let transition = workflow::transition(request.status, cmd.action, cmd.level, &relation)?;

        if let Some(delta) = transition.effect.delta(request.total_days) {
            let key = request.balance_key();
            let balance = tx.lock_balance(&key).await?.ok_or_else(|| {
                StoreError::Inconsistent(format!("balance {key:?} missing for request {}", request.id))
            })?;
            balance.apply(delta)?;
            tx.apply_delta(&key, delta).await?;
        }

        let comment = cmd
            .comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        let record = TransitionRecord {
            request_id: request.id,
            from: transition.from,
            to: transition.to,
            actor_id: actor.id,
            comment: comment.clone(),
            at: Utc::now(),
        };
        if !tx.record_transition(&record).await? {
            return Err(LeaveError::InvalidState {
                status: request.status,
                action: cmd.action,
            });
        }

        let updated = tx.lock_request(request.id).await?.ok_or_else(|| {
            StoreError::Inconsistent(format!("leave request {} vanished", request.id))
        })?;

        let leave_type = catalog
            .iter()
            .find(|t| t.id == request.leave_type_id)
            .map_or("leave", |t| t.name.as_str());

        emit(
            &mut tx,
            LeaveEvent::Transitioned(transition),
            &updated,
            &owner,
            leave_type,
            comment.as_deref(),
        )
        .await;

        tx.commit().await?;

        info!(
            from = %transition.from,
            to = %transition.to,
            "Leave request transitioned"
        );
        Ok(updated)
    }

    pub async fn approve(
        &self,
        request_id: u64,
        actor_id: u64,
        level: Option<Level>,
        comment: Option<String>,
    ) -> LeaveResult<LeaveRequest> {
        self.transition(TransitionCommand {
            request_id,
            actor_id,
            action: Action::Approve,
            level,
            comment,
        })
        .await
    }

    pub async fn reject(
        &self,
        request_id: u64,
        actor_id: u64,
        level: Option<Level>,
        comment: Option<String>,
    ) -> LeaveResult<LeaveRequest> {
        self.transition(TransitionCommand {
            request_id,
            actor_id,
            action: Action::Reject,
            level,
            comment,
        })
        .await
    }

    pub async fn cancel(&self, request_id: u64, actor_id: u64) -> LeaveResult<LeaveRequest> {
        self.transition(TransitionCommand {
            request_id,
            actor_id,
            action: Action::Cancel,
            level: None,
            comment: None,
        })
        .await
    }

    /* =========================
    Balances
    ========================= */

    pub async fn balances(
        &self,
        actor_id: u64,
        user_id: u64,
        year: i32,
    ) -> LeaveResult<Vec<BalanceView>> {
        let actor = self.active_user(actor_id).await?;
        let subject = self.visible_user(&actor, user_id).await?;
        let catalog = self.leave_types().await?;

        let rows = self.store.balances(subject.id, year).await?;
        Ok(rows
            .iter()
            .map(|b| BalanceView::new(b, catalog.iter().find(|t| t.id == b.leave_type_id)))
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn provision_year(
        &self,
        actor_id: u64,
        user_id: u64,
        year: i32,
    ) -> LeaveResult<ProvisionSummary> {
        let actor = self.active_user(actor_id).await?;
        require_admin(&actor)?;
        validate_year(year)?;

        let user = self
            .store
            .user(user_id)
            .await?
            .filter(|u| u.tenant_id == actor.tenant_id)
            .ok_or(LeaveError::NotFound("user"))?;
        let catalog = self.leave_types().await?;

        let mut tx = self.store.begin().await?;
        let mut summary = ProvisionSummary::default();
        provision_into(&mut tx, &mut summary, user.id, year, &catalog).await?;
        tx.commit().await?;

        info!(created = summary.created, existing = summary.existing, "Provisioned leave year");
        Ok(summary)
    }

    #[instrument(skip(self))]
    pub async fn provision_tenant_year(
        &self,
        actor_id: u64,
        year: i32,
    ) -> LeaveResult<ProvisionSummary> {
        let actor = self.active_user(actor_id).await?;
        require_admin(&actor)?;
        validate_year(year)?;

        let users = self.store.tenant_users(actor.tenant_id).await?;
        let catalog = self.leave_types().await?;

        let mut tx = self.store.begin().await?;
        let mut summary = ProvisionSummary::default();
        for user in users.iter().filter(|u| u.is_active) {
            provision_into(&mut tx, &mut summary, user.id, year, &catalog).await?;
        }
        tx.commit().await?;

        info!(
            tenant_id = actor.tenant_id,
            users = summary.users,
            created = summary.created,
            "Provisioned leave year for tenant"
        );
        Ok(summary)
    }

    /* =========================
    Queries
    ========================= */

    pub async fn get_request(&self, actor_id: u64, request_id: u64) -> LeaveResult<LeaveRequest> {
        let actor = self.active_user(actor_id).await?;
        let request = self
            .store
            .request(request_id)
            .await?
            .ok_or(LeaveError::NotFound("leave request"))?;
        self.visible_user(&actor, request.user_id).await?;
        Ok(request)
    }

    pub async fn list_requests(
        &self,
        actor_id: u64,
        query: RequestQuery,
    ) -> LeaveResult<Page<LeaveRequest>> {
        let actor = self.active_user(actor_id).await?;

        let scope = match query.employee_id {
            Some(employee_id) => {
                RequestScope::User(self.visible_user(&actor, employee_id).await?.id)
            }
            None => match actor.role {
                Role::Employee => RequestScope::User(actor.id),
                Role::Manager => RequestScope::Team {
                    manager_id: actor.id,
                },
                Role::Admin => RequestScope::Tenant(actor.tenant_id),
            },
        };

        let filter = RequestFilter {
            scope,
            status: query.status,
            year: query.year,
            page: query.page.unwrap_or(1).max(1),
            per_page: query
                .per_page
                .unwrap_or(DEFAULT_PER_PAGE)
                .clamp(1, MAX_PER_PAGE),
        };
        Ok(self.store.list_requests(&filter).await?)
    }

    /// Requests the actor can act on next: their direct reports' pending
    /// requests, plus the admin queue for admins.
    pub async fn approval_queue(&self, actor_id: u64) -> LeaveResult<Vec<LeaveRequest>> {
        let actor = self.active_user(actor_id).await?;

        let mut queue = self
            .store
            .approval_queue(ApprovalQueue::Manager(actor.id))
            .await?;
        if actor.is_admin() {
            let admin_queue = self
                .store
                .approval_queue(ApprovalQueue::Admin(actor.tenant_id))
                .await?;
            for request in admin_queue {
                if !queue.iter().any(|r| r.id == request.id) {
                    queue.push(request);
                }
            }
        }
        // own requests are never reviewable by their owner
        queue.retain(|r| r.user_id != actor.id);
        queue.sort_by_key(|r| (r.start_date, r.id));
        Ok(queue)
    }

    pub async fn dashboard(&self, actor_id: u64, year: Option<i32>) -> LeaveResult<Dashboard> {
        let year = year.unwrap_or_else(|| self.today().year());
        let balances = self.balances(actor_id, actor_id, year).await?;

        let counts = self.store.status_counts(actor_id, year).await?;
        let requests = LeaveStatus::iter()
            .map(|status| StatusCount {
                status,
                count: counts
                    .iter()
                    .find(|(s, _)| *s == status)
                    .map_or(0, |(_, count)| *count),
            })
            .collect();

        let awaiting_my_review = self.approval_queue(actor_id).await?.len();
        let unread_notifications = self.store.unread_count(actor_id).await?;

        Ok(Dashboard {
            year,
            balances,
            requests,
            awaiting_my_review,
            unread_notifications,
        })
    }

    /* =========================
    Notifications
    ========================= */

    pub async fn notifications(
        &self,
        user_id: u64,
        unread_only: bool,
        limit: Option<u32>,
    ) -> LeaveResult<Vec<Notification>> {
        let limit = limit.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
        Ok(self.store.notifications(user_id, unread_only, limit).await?)
    }

    pub async fn unread_count(&self, user_id: u64) -> LeaveResult<i64> {
        Ok(self.store.unread_count(user_id).await?)
    }

    pub async fn mark_read(&self, user_id: u64, id: u64) -> LeaveResult<Notification> {
        self.store
            .mark_read(user_id, id, Utc::now())
            .await?
            .ok_or(LeaveError::NotFound("notification"))
    }

    pub async fn mark_all_read(&self, user_id: u64) -> LeaveResult<u64> {
        Ok(self.store.mark_all_read(user_id, Utc::now()).await?)
    }

    pub async fn delete_notification(&self, user_id: u64, id: u64) -> LeaveResult<()> {
        if self.store.delete_notification(user_id, id).await? {
            Ok(())
        } else {
            Err(LeaveError::NotFound("notification"))
        }
    }

    /* =========================
    Helpers
    ========================= */

    async fn active_user(&self, id: u64) -> LeaveResult<User> {
        self.store
            .user(id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| LeaveError::Unauthorized("unknown or inactive user".into()))
    }

    /// Loads `user_id` if `actor` may see their leave data. Users of another
    /// tenant are reported as missing.
    async fn visible_user(&self, actor: &User, user_id: u64) -> LeaveResult<User> {
        if user_id == actor.id {
            return Ok(actor.clone());
        }
        let user = self
            .store
            .user(user_id)
            .await?
            .filter(|u| u.tenant_id == actor.tenant_id)
            .ok_or(LeaveError::NotFound("user"))?;
        if !actor.can_view(&user) {
            return Err(LeaveError::Unauthorized(
                "only the user, their manager, or an admin can view this".into(),
            ));
        }
        Ok(user)
    }
}

fn require_admin(actor: &User) -> LeaveResult<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(LeaveError::Unauthorized("Admin only".into()))
    }
}

fn validate_year(year: i32) -> LeaveResult<()> {
    if (2000..=2100).contains(&year) {
        Ok(())
    } else {
        Err(LeaveError::validation("year", "year must be between 2000 and 2100"))
    }
}

async fn provision_into<T: LeaveTx>(
    tx: &mut T,
    summary: &mut ProvisionSummary,
    user_id: u64,
    year: i32,
    catalog: &[LeaveType],
) -> Result<(), StoreError> {
    summary.users += 1;
    for row in ledger::opening_balances(user_id, year, catalog) {
        if tx.insert_balance_if_absent(&row).await? {
            summary.created += 1;
        } else {
            summary.existing += 1;
        }
    }
    Ok(())
}

/// Writes the notification for `event`. Never fails the caller: problems are
/// logged and the surrounding transaction carries on.
async fn emit<T: LeaveTx>(
    tx: &mut T,
    event: LeaveEvent,
    request: &LeaveRequest,
    owner: &User,
    leave_type: &str,
    comment: Option<&str>,
) {
    let recipient = match resolve_audience(tx, notify::audience(&event), owner).await {
        Ok(Some(recipient)) => recipient,
        Ok(None) => {
            warn!(request_id = request.id, "No recipient for leave notification");
            return;
        }
        Err(e) => {
            warn!(error = %e, request_id = request.id, "Failed to resolve notification recipient");
            return;
        }
    };

    let ctx = NoticeContext {
        request,
        owner_name: &owner.username,
        leave_type,
        comment,
    };
    let notification = notify::compose(&event, &ctx, recipient);

    if let Err(e) = tx.insert_notification(&notification).await {
        warn!(
            error = %e,
            request_id = request.id,
            recipient,
            "Failed to write leave notification"
        );
    }
}

async fn resolve_audience<T: LeaveTx>(
    tx: &mut T,
    audience: Audience,
    owner: &User,
) -> Result<Option<u64>, StoreError> {
    match audience {
        Audience::Owner => Ok(Some(owner.id)),
        Audience::Reviewer(Level::Manager) => {
            if let Some(manager_id) = owner.manager_id {
                if let Some(manager) = tx.user(manager_id).await?.filter(|m| m.is_active) {
                    return Ok(Some(manager.id));
                }
            }
            Ok(tx.first_admin(owner.tenant_id).await?.map(|admin| admin.id))
        }
        Audience::Reviewer(Level::Admin) => {
            Ok(tx.first_admin(owner.tenant_id).await?.map(|admin| admin.id))
        }
    }
}
