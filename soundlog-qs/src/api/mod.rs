//! HTTP API for the query service
//!
//! One module per endpoint group; routing lives in [`crate::build_router`].

pub mod classmap;
pub mod count;
pub mod health;
pub mod logs;
