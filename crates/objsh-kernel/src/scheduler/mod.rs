//! Scheduler module for objsh: streaming pipelines.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                            Pipeline                              │
//! │  ┌──────┐ channel ┌────────┐ channel ┌────────┐ channel ┌───────┐│
//! │  │ feed │────────▶│ stage1 │────────▶│ stage2 │────────▶│collect││
//! │  └──────┘         └────────┘         └────────┘         └───────┘│
//! │        all polled together on the invoking task                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

mod pipeline;
mod stream;

pub use pipeline::{Pipeline, PipelineInput, PipelineState};
pub use stream::{object_stream, InputStream, OutputStream, StageIo};
