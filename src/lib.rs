pub mod api;
pub mod auth;
pub mod backoff;
pub mod config;
pub mod fetch;
pub mod ledger;
pub mod money;
pub mod observability;
pub mod queue;
pub mod server;
pub mod service;
pub mod storage;
pub mod triggers;
