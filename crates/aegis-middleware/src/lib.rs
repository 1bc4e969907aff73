//! # Aegis Middleware
//!
//! Request pipeline for HTTP services: bearer-token authentication,
//! role-based authorization, error classification and panic recovery.
//!
//! ## Pipeline Stages
//!
//! ```text
//! Request → Logging → Recovery → Authentication → Authorization → custom → Handler
//!                        ↓
//!          single JSON error response for the last recorded error or panic
//! ```
//!
//! | Stage | Middleware     | Purpose                                        |
//! |-------|----------------|------------------------------------------------|
//! | 1     | Logging        | One log line per request with status and time  |
//! | 2     | Recovery       | Catch panics, classify errors, write once      |
//! | 3     | Authentication | Bearer token extraction and validation         |
//! | 4     | Authorization  | Role to permission check                       |
//!
//! Stages that reject a request record a [`Failure`](aegis_core::Failure) on
//! the [`MiddlewareContext`] and stop. Recovery turns the last recorded
//! failure into the response envelope, so a request gets at most one error
//! response no matter how many stages failed.
//!
//! ## Example
//!
//! ```
//! use aegis_middleware::pipeline::Stage;
//!
//! let stages = Stage::all();
//! assert_eq!(stages.len(), 4);
//! assert_eq!(stages[0].name(), "request_logging");
//! assert_eq!(stages[3].name(), "authorization");
//! ```

#![doc(html_root_url = "https://docs.rs/aegis-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod binding;
pub mod classify;
pub mod context;
pub mod middleware;
pub mod panic;
pub mod pipeline;
pub mod stages;
pub mod types;

// Re-export main types at crate root
pub use binding::{bind_json, bind_validated_json};
pub use classify::{classify, RequestInfo};
pub use context::{MiddlewareContext, RecordedError, ResponseState};
pub use middleware::{BoxFuture, Middleware, Next, HANDLER_STAGE};
pub use panic::{install_panic_hook, PanicKind, RuntimeFault};
pub use pipeline::{Pipeline, PipelineBuilder, Stage};
pub use types::{respond, HandlerResult, RemoteAddr, Request, Response, ResponseExt};
