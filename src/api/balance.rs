use actix_web::{HttpResponse, Responder, web};
use chrono::Datelike;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::AppService;
use crate::auth::auth::AuthUser;
use crate::model::leave_balance::BalanceView;
use crate::service::ProvisionSummary;

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct YearQuery {
    #[schema(example = 2026)]
    /// Defaults to the current year
    pub year: Option<i32>,
}

#[derive(Deserialize, ToSchema)]
pub struct ProvisionUser {
    #[schema(example = 1000)]
    pub user_id: u64,
    #[schema(example = 2026)]
    pub year: i32,
}

#[derive(Deserialize, ToSchema)]
pub struct ProvisionTenant {
    #[schema(example = 2026)]
    pub year: i32,
}

#[utoipa::path(
    get,
    path = "/api/balance",
    params(YearQuery),
    responses(
        (status = 200, description = "Caller's balances for the year", body = Vec<BalanceView>),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Balance"
)]
pub async fn my_balances(
    auth: AuthUser,
    service: web::Data<AppService>,
    query: web::Query<YearQuery>,
) -> actix_web::Result<impl Responder> {
    let year = query.year.unwrap_or_else(|| service.today().year());
    let balances = service.balances(auth.user_id, auth.user_id, year).await?;
    Ok(HttpResponse::Ok().json(balances))
}

#[utoipa::path(
    get,
    path = "/api/balance/{user_id}",
    params(
        ("user_id" = u64, Path, description = "User whose balances to fetch"),
        YearQuery
    ),
    responses(
        (status = 200, description = "User's balances for the year", body = Vec<BalanceView>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only the user, their manager, or an admin"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Balance"
)]
pub async fn user_balances(
    auth: AuthUser,
    service: web::Data<AppService>,
    path: web::Path<u64>,
    query: web::Query<YearQuery>,
) -> actix_web::Result<impl Responder> {
    let year = query.year.unwrap_or_else(|| service.today().year());
    let balances = service
        .balances(auth.user_id, path.into_inner(), year)
        .await?;
    Ok(HttpResponse::Ok().json(balances))
}

#[utoipa::path(
    post,
    path = "/api/balance/provision",
    request_body(content = ProvisionUser, content_type = "application/json"),
    responses(
        (status = 200, description = "Opening balances created where missing", body = ProvisionSummary),
        (status = 400, description = "Invalid year"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Balance"
)]
pub async fn provision_user(
    auth: AuthUser,
    service: web::Data<AppService>,
    payload: web::Json<ProvisionUser>,
) -> actix_web::Result<impl Responder> {
    let summary = service
        .provision_year(auth.user_id, payload.user_id, payload.year)
        .await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[utoipa::path(
    post,
    path = "/api/balance/provision/tenant",
    request_body(content = ProvisionTenant, content_type = "application/json"),
    responses(
        (status = 200, description = "Opening balances created for every active user", body = ProvisionSummary),
        (status = 400, description = "Invalid year"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Balance"
)]
pub async fn provision_tenant(
    auth: AuthUser,
    service: web::Data<AppService>,
    payload: web::Json<ProvisionTenant>,
) -> actix_web::Result<impl Responder> {
    let summary = service
        .provision_tenant_year(auth.user_id, payload.year)
        .await?;
    Ok(HttpResponse::Ok().json(summary))
}
