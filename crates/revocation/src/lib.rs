//! `signon-revocation` — revoking a suspended user's access across applications.
//!
//! ## Components
//!
//! - `RevocationClient`: one "revoke access" call against one application
//! - `HttpRevocationClient`: the HTTP implementation used in production
//! - `SuspensionWorkflow`: concurrent fan-out of revocations for one suspension
//! - `SuspensionReport`: ordered successes and failures of one fan-out
//! - `RetryPolicy`: backoff for operator-driven retries of failed applications
//!
//! Per-application failures are never errors here: they are outcomes carried
//! in the report so one unreachable application cannot hide the others.

pub mod client;
pub mod config;
pub mod http;
pub mod report;
pub mod retry;
pub mod workflow;

pub use client::{RevocationClient, RevocationOutcome};
pub use config::{ConfigError, RevocationConfig};
pub use http::{HttpRevocationClient, RevocationClientError};
pub use report::{RevocationFailure, SuspensionReport};
pub use retry::RetryPolicy;
pub use workflow::{SuspensionWorkflow, TIMEOUT_REASON};
