use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Leave categories. A deployment seeds either the casual/health pair or the
/// annual/sick/personal set.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, EnumString, Display,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeaveCategory {
    Casual,
    Health,
    Annual,
    Sick,
    Personal,
}

impl TryFrom<String> for LeaveCategory {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "category": "annual",
    "name": "Annual Leave",
    "annual_days": 12,
    "carry_forward_days": 5,
    "max_consecutive_days": 10,
    "notice_days": 3
}))]
pub struct LeaveType {
    #[schema(example = 1)]
    pub id: u64,
    #[sqlx(try_from = "String")]
    pub category: LeaveCategory,
    #[schema(example = "Annual Leave")]
    pub name: String,
    /// days granted per year
    #[schema(example = 12)]
    pub annual_days: u32,
    #[schema(example = 5)]
    pub carry_forward_days: u32,
    /// longest single request, when limited
    #[schema(example = 10, nullable = true)]
    pub max_consecutive_days: Option<u32>,
    /// minimum days between submission and start date for non-emergency requests
    #[schema(example = 3)]
    pub notice_days: u32,
}
