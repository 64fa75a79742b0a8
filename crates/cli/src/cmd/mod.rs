//! Command implementations

pub mod checkout;
pub mod config;
pub mod diff;
pub mod document;
pub mod history;
pub mod verify;
