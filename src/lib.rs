pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod ledger;
pub mod model;
pub mod notify;
pub mod routes;
pub mod service;
pub mod store;
pub mod workflow;

/// The service as wired by the HTTP server.
pub type AppService = service::LeaveService<store::mysql::MySqlStore>;
