use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, EnumString, Display,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    LeaveSubmitted,
    LeaveManagerApproved,
    LeaveApproved,
    LeaveRejected,
    LeaveCancelled,
}

impl TryFrom<String> for NotificationKind {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Notification {
    pub id: u64,
    pub user_id: u64,
    pub leave_request_id: Option<u64>,
    pub title: String,
    pub message: String,
    #[sqlx(try_from = "String")]
    pub kind: NotificationKind,
    pub is_read: bool,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: u64,
    pub leave_request_id: Option<u64>,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
}
