//! Data models for the task manager.
//!
//! Wire names are camelCase to match the browser client.

mod tag;
mod task;

pub use tag::*;
pub use task::*;
