//! HTTP route handlers, one module per resource.

pub mod alerts;
pub mod health;
pub mod metrics;
pub mod stock;
pub mod transfers;
