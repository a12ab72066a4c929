use std::io::Read;

use url::Url;

use crate::error::DownloadError;

/// A byte source for repository metadata.
///
/// Implementations hand back an open stream for the resource behind `url`;
/// the caller owns the stream and drops it once it is done reading.
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &Url) -> Result<Box<dyn Read + Send>, DownloadError>;
}
