//! Who hears about a leave request event, and what they are told.
//!
//! The service resolves the [`Audience`] to a user and writes the
//! notification inside the transition's transaction on a best-effort basis.
use crate::model::leave_request::LeaveRequest;
use crate::model::notification::{NewNotification, NotificationKind};
use crate::workflow::{Action, Level, LeaveStatus, Transition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveEvent {
    Submitted,
    Transitioned(Transition),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// whoever reviews at this level next
    Reviewer(Level),
    Owner,
}

pub fn audience(event: &LeaveEvent) -> Audience {
    match event {
        LeaveEvent::Submitted => Audience::Reviewer(Level::Manager),
        LeaveEvent::Transitioned(t) if t.to == LeaveStatus::ManagerApproved => {
            Audience::Reviewer(Level::Admin)
        }
        LeaveEvent::Transitioned(_) => Audience::Owner,
    }
}

pub struct NoticeContext<'a> {
    pub request: &'a LeaveRequest,
    pub owner_name: &'a str,
    pub leave_type: &'a str,
    pub comment: Option<&'a str>,
}

pub fn compose(event: &LeaveEvent, ctx: &NoticeContext<'_>, recipient_id: u64) -> NewNotification {
    let request = ctx.request;
    let span = format!(
        "{} to {} ({} day(s))",
        request.start_date, request.end_date, request.total_days
    );

    let (kind, title, mut message) = match event {
        LeaveEvent::Submitted => (
            NotificationKind::LeaveSubmitted,
            if request.emergency {
                "Emergency leave request".to_string()
            } else {
                "New leave request".to_string()
            },
            format!(
                "{} requested {} from {}.",
                ctx.owner_name, ctx.leave_type, span
            ),
        ),
        LeaveEvent::Transitioned(t) => match t.action {
            Action::Approve if t.to == LeaveStatus::ManagerApproved => (
                NotificationKind::LeaveManagerApproved,
                "Leave request awaiting final approval".to_string(),
                format!(
                    "{}'s {} request for {} was approved by their manager.",
                    ctx.owner_name, ctx.leave_type, span
                ),
            ),
            Action::Approve => (
                NotificationKind::LeaveApproved,
                "Leave request approved".to_string(),
                format!("Your {} request for {} was approved.", ctx.leave_type, span),
            ),
            Action::Reject => (
                NotificationKind::LeaveRejected,
                "Leave request rejected".to_string(),
                format!(
                    "Your {} request for {} was rejected at {} review.",
                    ctx.leave_type,
                    span,
                    t.level.unwrap_or(Level::Manager)
                ),
            ),
            Action::Cancel => (
                NotificationKind::LeaveCancelled,
                "Leave request cancelled".to_string(),
                format!("Your {} request for {} was cancelled.", ctx.leave_type, span),
            ),
        },
    };

    if let Some(comment) = ctx.comment.filter(|c| !c.trim().is_empty()) {
        message.push_str(&format!(" Comment: {}", comment.trim()));
    }

    NewNotification {
        user_id: recipient_id,
        leave_request_id: Some(request.id),
        title,
        message,
        kind,
    }
}
