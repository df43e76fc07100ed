//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum app, middleware stack)
//!     → request.rs (request ID assigned or propagated)
//!     → routing::Router (lookup, credentials, dispatch)
//!     → handler.rs (named handler invoked with context)
//!     → response.rs (router-generated errors as JSON)
//!     → Send to client
//! ```

pub mod builtin;
pub mod handler;
pub mod request;
pub mod response;
pub mod server;

pub use handler::{Handler, HandlerContext, HandlerError, HandlerRegistry, HandlerResult};
pub use request::X_REQUEST_ID;
pub use server::HttpServer;
