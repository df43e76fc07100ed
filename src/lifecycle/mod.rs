//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Env overrides → Load config dir → Snapshot v1 → Start listeners
//!
//! Reload (reload.rs):
//!     File change / SIGHUP / admin POST → debounce
//!     → build Snapshot vN+1 off to the side → atomic publish
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain in-flight requests → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!     SIGHUP → Trigger config reload
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then snapshot, then listeners
//! - A rejected reload is logged and leaves the active snapshot in place
//! - Reloads never wait on in-flight requests

pub mod reload;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use reload::{Applied, ReloadCoordinator, ReloadError, ReloadTrigger};
pub use shutdown::Shutdown;
