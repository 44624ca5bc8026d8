use actix_web::{HttpResponse, Responder, web};

use crate::AppService;
use crate::api::balance::YearQuery;
use crate::auth::auth::AuthUser;
use crate::service::Dashboard;

#[utoipa::path(
    get,
    path = "/api/dashboard",
    params(YearQuery),
    responses(
        (status = 200, description = "Balances, request counts and review workload", body = Dashboard),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Dashboard"
)]
pub async fn dashboard(
    auth: AuthUser,
    service: web::Data<AppService>,
    query: web::Query<YearQuery>,
) -> actix_web::Result<impl Responder> {
    let dashboard = service.dashboard(auth.user_id, query.year).await?;
    Ok(HttpResponse::Ok().json(dashboard))
}
