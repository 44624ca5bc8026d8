use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

use crate::api::balance::{ProvisionTenant, ProvisionUser, YearQuery};
use crate::api::leave_request::{CreateLeave, LeaveFilter, LeaveListResponse, ReviewLeave};
use crate::api::notification::NotificationQuery;
use crate::model::leave_balance::BalanceView;
use crate::model::leave_request::LeaveRequest;
use crate::model::leave_type::{LeaveCategory, LeaveType};
use crate::model::notification::{Notification, NotificationKind};
use crate::service::{Dashboard, ProvisionSummary, StatusCount};
use crate::workflow::{LeaveStatus, Level};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leave Management API",
        version = "1.0.0",
        description = r#"
## Leave Management

Multi-tenant leave requests with a two-stage approval workflow.

### Workflow
- An employee submits a request; its days are reserved as **pending**
- The employee's manager approves or rejects it
- A tenant admin gives the final approval, moving the days to **used**
- The owner may cancel while the request is still open

### Security
Every endpoint requires a **JWT Bearer** access token issued by the identity service.

### Response Format
- JSON bodies; errors are `{"error": {"kind", "message", "field"?}}`
- Pagination supported for request lists
"#,
    ),
    paths(
        crate::api::leave_type::list_leave_types,

        crate::api::leave_request::create_leave,
        crate::api::leave_request::leave_list,
        crate::api::leave_request::approval_queue,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::cancel_leave,

        crate::api::balance::my_balances,
        crate::api::balance::user_balances,
        crate::api::balance::provision_user,
        crate::api::balance::provision_tenant,

        crate::api::notification::list_notifications,
        crate::api::notification::unread_count,
        crate::api::notification::mark_read,
        crate::api::notification::mark_all_read,
        crate::api::notification::delete_notification,

        crate::api::dashboard::dashboard
    ),
    components(
        schemas(
            LeaveType,
            LeaveCategory,
            LeaveRequest,
            LeaveStatus,
            Level,
            CreateLeave,
            ReviewLeave,
            LeaveFilter,
            LeaveListResponse,
            BalanceView,
            YearQuery,
            ProvisionUser,
            ProvisionTenant,
            ProvisionSummary,
            Notification,
            NotificationKind,
            NotificationQuery,
            Dashboard,
            StatusCount
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave", description = "Leave requests and approvals"),
        (name = "Balance", description = "Yearly leave balances"),
        (name = "Notification", description = "In-app notifications"),
        (name = "Dashboard", description = "Per-user summary"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
