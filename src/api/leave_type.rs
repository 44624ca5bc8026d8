use actix_web::{HttpResponse, Responder, web};

use crate::AppService;
use crate::auth::auth::AuthUser;
use crate::model::leave_type::LeaveType;

#[utoipa::path(
    get,
    path = "/api/leave-types",
    responses(
        (status = 200, description = "Leave type catalog", body = Vec<LeaveType>),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn list_leave_types(
    _auth: AuthUser,
    service: web::Data<AppService>,
) -> actix_web::Result<impl Responder> {
    let catalog = service.leave_types().await?;
    Ok(HttpResponse::Ok().json(&*catalog))
}
