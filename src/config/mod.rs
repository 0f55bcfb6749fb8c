//! # Configuration
//!
//! Two layers feed every run: the command line and the nearest `.ginuerc`.
//!
//! 1. **rc file** (`rc.rs`)
//!    - Discovered from the working directory upwards
//!    - Root defaults plus optional named environments under `env`
//!
//! 2. **Resolver** (`resolve.rs`)
//!    - Picks the environments a run targets
//!    - Merges command-line values field by field
//!
//! Credentials are filled in afterwards by the credential resolver service.

mod rc;
mod resolve;

pub use rc::{EnvSettings, RcConfig};
pub use resolve::{layout_of, resolve, EnvironmentSpec};
