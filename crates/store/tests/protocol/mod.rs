//! Protocol integration tests

pub mod atomicity;
pub mod checkout_lifecycle;
pub mod concurrency;
pub mod integrity;
