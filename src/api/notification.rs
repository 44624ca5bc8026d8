use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use crate::AppService;
use crate::auth::auth::AuthUser;
use crate::model::notification::Notification;

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct NotificationQuery {
    /// Only unread notifications
    #[serde(default)]
    pub unread_only: bool,
    #[schema(example = 20)]
    /// At most 100
    pub limit: Option<u32>,
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    params(NotificationQuery),
    responses(
        (status = 200, description = "Newest notifications first", body = Vec<Notification>),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Notification"
)]
pub async fn list_notifications(
    auth: AuthUser,
    service: web::Data<AppService>,
    query: web::Query<NotificationQuery>,
) -> actix_web::Result<impl Responder> {
    let notifications = service
        .notifications(auth.user_id, query.unread_only, query.limit)
        .await?;
    Ok(HttpResponse::Ok().json(notifications))
}

#[utoipa::path(
    get,
    path = "/api/notifications/unread-count",
    responses(
        (status = 200, description = "Unread notification count", body = Object, example = json!({
            "unread": 3
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Notification"
)]
pub async fn unread_count(
    auth: AuthUser,
    service: web::Data<AppService>,
) -> actix_web::Result<impl Responder> {
    let unread = service.unread_count(auth.user_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "unread": unread })))
}

#[utoipa::path(
    put,
    path = "/api/notifications/{notification_id}/read",
    params(
        ("notification_id" = u64, Path, description = "Notification to mark read")
    ),
    responses(
        (status = 200, description = "Notification marked read", body = Notification),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Notification not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Notification"
)]
pub async fn mark_read(
    auth: AuthUser,
    service: web::Data<AppService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let notification = service.mark_read(auth.user_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(notification))
}

#[utoipa::path(
    put,
    path = "/api/notifications/read-all",
    responses(
        (status = 200, description = "All notifications marked read", body = Object, example = json!({
            "updated": 4
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Notification"
)]
pub async fn mark_all_read(
    auth: AuthUser,
    service: web::Data<AppService>,
) -> actix_web::Result<impl Responder> {
    let updated = service.mark_all_read(auth.user_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "updated": updated })))
}

#[utoipa::path(
    delete,
    path = "/api/notifications/{notification_id}",
    params(
        ("notification_id" = u64, Path, description = "Notification to delete")
    ),
    responses(
        (status = 204, description = "Notification deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Notification not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Notification"
)]
pub async fn delete_notification(
    auth: AuthUser,
    service: web::Data<AppService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    service
        .delete_notification(auth.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
