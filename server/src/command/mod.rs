//! Relay command dispatch for the server
//!
//! This module handles:
//! - Queuing relay commands issued from the dashboard
//! - Applying status reports from the polling device
//! - Expiring unconfirmed commands when the device next polls

mod dispatcher;

pub use dispatcher::RelayDispatcher;
