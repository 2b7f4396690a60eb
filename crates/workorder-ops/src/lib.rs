//! Operator tooling for the work-order lifecycle engine
//!
//! Drives [`WorkOrderService`](workorder_lifecycle::WorkOrderService) over a
//! JSON snapshot so operators can inspect and repair orders, and smoke tests
//! can run the engine end to end without a database.

pub mod cli;
pub mod snapshot;

pub use cli::{run, Caller, Cli, Command};
