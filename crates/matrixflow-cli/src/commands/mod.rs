//! Command handlers grouped by dashboard view.

pub(crate) mod activity;
pub(crate) mod auth;
pub(crate) mod config;
pub(crate) mod devices;
pub(crate) mod error_logs;
pub(crate) mod remote;
pub(crate) mod reports;
pub(crate) mod watch;
