//! Domain types and pure logic for the Muse generation client.
//!
//! Everything in this crate is I/O-free: identifiers, wire statuses,
//! the task lifecycle state machine, request/result models with their
//! validation rules, and the placeholder reconciliation used to build
//! display lists. The async protocol machinery lives in `muse-client`.

pub mod display;
pub mod error;
pub mod request;
pub mod result;
pub mod status;
pub mod types;
