//! fetchtask
//!
//! Typed response handling for HTTP tasks. A task declares which shape it
//! expects its response body in (raw content, bytes, a file, text, JSON,
//! url-encoded pairs or a `serde` type). When the response arrives the body is
//! decoded inline and the typed value is delivered on the task's serial
//! dispatch queue, or the task's error callback runs instead.
//!
//! - **content**: raw response body (`Content`) and metadata (`ResponseMeta`)
//! - **decoders**: content decoders and `DecodeError`
//! - **handlers**: `ResponseHandler` trait and the decoding adapter
//! - **dispatch**: serial `DispatchQueue` and its weak handle
//! - **task**: `ServiceTask` builder surface and failure channel
//! - **transport**: `Transport` trait, `reqwest`-based `HttpTransport`

pub mod config;
pub mod content;
pub mod decoders;
pub mod dispatch;
pub mod handlers;
pub mod humanize;
pub mod observability;
pub mod task;
pub mod transport;

pub use content::{Content, ContentKind, ResponseMeta};
pub use decoders::DecodeError;
pub use dispatch::{DispatchQueue, WeakDispatcher};
pub use handlers::ResponseHandler;
pub use task::{ServiceTask, TaskError, TaskState};
