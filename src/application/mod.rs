// Application layer - orchestration of the balance engine and settlement
// planner over the group store. This is the primary interface for any
// client (CLI, API, bot, etc.).

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
