#![forbid(unsafe_code)]

//! Test fixtures shared by the cmdx crates.
//!
//! - [`fixtures`]: ready-made command types and command values
//! - [`handlers`]: handlers that count calls or fail on demand
//! - [`log_capture`]: a tracing layer that records spans and events

pub mod fixtures;
pub mod handlers;
pub mod log_capture;

pub use fixtures::{NamedCommand, PlainCommand, TestClock, edit_type, plain_type};
pub use handlers::{Call, CallLog, FailingHandler, RecordingHandler};
pub use log_capture::{CaptureHandle, CapturedEvent, CapturedSpan, LogCapture, with_captured_logs};
