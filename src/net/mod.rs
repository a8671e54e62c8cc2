//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! configured address
//!     → listener.rs (bind, report the failing address)
//!     → tls.rs (only with a full certificate/key pair)
//!     → handed to the HTTP server
//! ```

pub mod listener;
pub mod tls;
