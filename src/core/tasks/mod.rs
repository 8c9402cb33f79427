// src/core/tasks/mod.rs

//! Long-running background tasks that support the multiplexer.

pub mod event_pump;
