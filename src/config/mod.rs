//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! command-line flags
//!     → cli.rs (clap parse, durations through humantime)
//!     → ServerConfig (immutable)
//!     → validation.rs (warnings only)
//!     → passed by reference to transport, pipeline and server assembly
//! ```
//!
//! # Design Decisions
//! - Config is immutable once built; there is no reload
//! - No ambient global state: every consumer receives the config explicitly
//! - A zero timeout means "no limit" everywhere

pub mod cli;
pub mod schema;
pub mod validation;

pub use cli::Cli;
pub use schema::{EngineConfig, ServerConfig, TlsFiles};
pub use validation::{validate_config, ConfigWarning};
