//! services/client/src/lib.rs
//!
//! Adapters, the authenticated API client and the background runtime of the
//! Hamro Godam session shell.

pub mod adapters;
pub mod config;
pub mod error;
pub mod http;
pub mod runtime;
pub mod tasks;

pub use error::{ClientError, ClientResult};
pub use http::ApiClient;
pub use runtime::SessionRuntime;
