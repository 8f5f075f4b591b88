//! Muse generation task client.
//!
//! Implements the client half of the task submission & polling
//! protocol: typed HTTP wrappers for the task-creation and result-query
//! endpoints, a reusable fixed-interval polling primitive with
//! cancellation, and a task manager that synthesizes placeholder
//! display records and broadcasts lifecycle events to subscribers.

pub mod api;
pub mod assets;
pub mod config;
pub mod events;
pub mod manager;
pub mod poller;

pub use config::ClientConfig;
pub use events::TaskEvent;
pub use manager::{ClientError, GenerationClient};
pub use poller::PollConfig;
