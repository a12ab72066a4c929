//! Byte sources for repository metadata.
//!
//! The registry crate never talks to the network directly; it asks a
//! [`Fetch`] implementation for a stream. [`Fetcher`] is the default one,
//! backed by a process-wide `ureq` agent configured through
//! [`http_client::configure_http_client`].

pub mod error;
pub mod fetch;
pub mod http;
pub mod http_client;
pub mod traits;

pub use error::{DownloadError, Result};
pub use fetch::Fetcher;
pub use traits::Fetch;
