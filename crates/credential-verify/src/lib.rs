//! Credential verification pipeline.
//!
//! Professionals submit evidence of their credentials through one of three
//! strategies (certificate upload, simulated registry lookup, manual claim).
//! Each strategy produces a verification record that a reviewer approves or
//! rejects; approvals propagate into the professional's profile.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
