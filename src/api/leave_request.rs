use actix_web::{FromRequest, HttpRequest, HttpResponse, Responder, dev::Payload, web};
use chrono::NaiveDate;
use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::AppService;
use crate::auth::auth::AuthUser;
use crate::error::LeaveError;
use crate::model::leave_request::LeaveRequest;
use crate::service::{RequestQuery, SubmitLeave};
use crate::store::Page;
use crate::workflow::{LeaveStatus, Level};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = 1)]
    pub leave_type_id: u64,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-07", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Family trip")]
    pub reason: String,
    /// waives the notice period of the leave type
    #[serde(default)]
    pub emergency: bool,
}

#[derive(Deserialize, ToSchema, Default)]
pub struct ReviewLeave {
    /// defaults to the stage the request is waiting on
    #[schema(example = "manager")]
    pub level: Option<Level>,
    #[schema(example = "Enjoy the trip")]
    pub comment: Option<String>,
}

impl ReviewLeave {
    /// An absent or blank body means "no level, no comment"; anything else
    /// must be a valid review object.
    fn parse(body: &[u8]) -> Result<Self, LeaveError> {
        if body.trim_ascii().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| LeaveError::validation("body", format!("invalid review body: {e}")))
    }
}

impl FromRequest for ReviewLeave {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let body = web::Bytes::from_request(req, payload);
        Box::pin(async move {
            let body = body.await?;
            Ok(ReviewLeave::parse(&body)?)
        })
    }
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    #[schema(example = 1000)]
    /// Filter by owner; must be visible to the caller
    pub employee_id: Option<u64>,
    #[schema(example = "pending")]
    /// Filter by leave status
    pub status: Option<LeaveStatus>,
    #[schema(example = 2026)]
    /// Year of the start date
    pub year: Option<i32>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u32>,
    #[schema(example = 20)]
    /// Pagination per page number, at most 100
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

impl From<Page<LeaveRequest>> for LeaveListResponse {
    fn from(page: Page<LeaveRequest>) -> Self {
        Self {
            data: page.data,
            page: page.page,
            per_page: page.per_page,
            total: page.total,
        }
    }
}

/* =========================
Submit leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveRequest),
        (status = 400, description = "Invalid dates, reason, overlap or insufficient balance"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    service: web::Data<AppService>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.into_inner();

    let request = service
        .submit(
            auth.user_id,
            SubmitLeave {
                leave_type_id: payload.leave_type_id,
                start_date: payload.start_date,
                end_date: payload.end_date,
                reason: payload.reason,
                emergency: payload.emergency,
            },
        )
        .await?;

    Ok(HttpResponse::Created().json(request))
}

/* =========================
Approve / reject / cancel
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    request_body(content = ReviewLeave, content_type = "application/json"),
    responses(
        (status = 200, description = "Leave approved at the given level", body = LeaveRequest),
        (status = 400, description = "Malformed body, or request is not awaiting this level", body = Object, example = json!({
            "error": { "kind": "invalid_state", "message": "cannot approve a leave request that is cancelled" }
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    service: web::Data<AppService>,
    path: web::Path<u64>,
    review: ReviewLeave,
) -> actix_web::Result<impl Responder> {
    let request = service
        .approve(path.into_inner(), auth.user_id, review.level, review.comment)
        .await?;

    Ok(HttpResponse::Ok().json(request))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    request_body(content = ReviewLeave, content_type = "application/json"),
    responses(
        (status = 200, description = "Leave rejected, pending days released", body = LeaveRequest),
        (status = 400, description = "Malformed body, or request is not awaiting this level"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    service: web::Data<AppService>,
    path: web::Path<u64>,
    review: ReviewLeave,
) -> actix_web::Result<impl Responder> {
    let request = service
        .reject(path.into_inner(), auth.user_id, review.level, review.comment)
        .await?;

    Ok(HttpResponse::Ok().json(request))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/cancel",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to cancel")
    ),
    responses(
        (status = 200, description = "Leave cancelled by its owner", body = LeaveRequest),
        (status = 400, description = "Request is already decided"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only the owner can cancel"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn cancel_leave(
    auth: AuthUser,
    service: web::Data<AppService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let request = service.cancel(path.into_inner(), auth.user_id).await?;
    Ok(HttpResponse::Ok().json(request))
}

/* =========================
Queries
========================= */
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "error": { "kind": "not_found", "message": "leave request not found" }
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    service: web::Data<AppService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let request = service.get_request(auth.user_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(request))
}

#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    service: web::Data<AppService>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    let filter = query.into_inner();

    let page = service
        .list_requests(
            auth.user_id,
            RequestQuery {
                employee_id: filter.employee_id,
                status: filter.status,
                year: filter.year,
                page: filter.page,
                per_page: filter.per_page,
            },
        )
        .await?;

    Ok(HttpResponse::Ok().json(LeaveListResponse::from(page)))
}

#[utoipa::path(
    get,
    path = "/api/leave/approvals",
    responses(
        (status = 200, description = "Requests waiting on the caller", body = Vec<LeaveRequest>),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approval_queue(
    auth: AuthUser,
    service: web::Data<AppService>,
) -> actix_web::Result<impl Responder> {
    let queue = service.approval_queue(auth.user_id).await?;
    Ok(HttpResponse::Ok().json(queue))
}
