//! # soundlog Common Library
//!
//! Shared code for the soundlog services:
//! - Event model and wire types for the `/api/audio_logs` contract
//! - Window resolution (`[start, end)` from request parameters)
//! - Database schema bootstrap and access helpers
//! - Configuration loading and root folder resolution
//! - Error types and time utilities

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod time;
pub mod window;

pub use error::{Error, Result};
pub use model::{AudioEvent, ClassMapEntry};
pub use window::{WindowBounds, WindowSpec};
