//! Request pipeline middleware.

mod deadline;
mod strip_prefix;

pub use deadline::fetch_deadline;
pub use strip_prefix::{strip_prefix, strip_uri_prefix};
