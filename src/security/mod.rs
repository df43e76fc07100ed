//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Matched request:
//!     → access_control.rs (extract X-Caller-Id / X-Caller-Secret)
//!     → credentials.rs (lookup, constant-time secret check, status, capabilities)
//!     → CallerIdentity handed to the handler, or Denied → 401/403
//! ```
//!
//! # Design Decisions
//! - Fail closed: missing or malformed credentials are denied
//! - Secrets are stored only as SHA-256 digests and compared in constant time
//! - Denial reasons are logged and counted, never echoed in release mode

pub mod access_control;
pub mod capability;
pub mod credentials;
pub mod secret;

pub use access_control::{authorize_request, X_CALLER_ID, X_CALLER_SECRET};
pub use capability::{capability_set, Capability, CapabilitySet};
pub use credentials::{CallerIdentity, CredentialRecord, CredentialRegistry, CredentialStatus, Denied};
pub use secret::SecretHash;
