pub mod balance;
pub mod dashboard;
pub mod leave_request;
pub mod leave_type;
pub mod notification;
