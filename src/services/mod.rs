//! Services layer - the sync engines
//!
//! Services combine domain logic with infrastructure adapters. They take the
//! adapters as trait objects so tests can swap in fakes.

pub mod credentials;
pub mod deploy;
pub mod erd;
pub mod pull;
pub mod push;

// Re-export commonly used types
pub use credentials::CredentialResolver;
pub use deploy::deploy_or_reset;
pub use erd::write_erd;
pub use pull::PullEngine;
pub use push::{PushEngine, PushOutcome, PushTarget};
