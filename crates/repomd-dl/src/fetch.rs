use std::{fs::File, io::Read};

use tracing::debug;
use url::Url;

use crate::{error::DownloadError, http::Http, traits::Fetch};

/// Default [`Fetch`] implementation.
///
/// `http` and `https` URLs go through the shared HTTP agent, `file` URLs are
/// opened from the local filesystem so that on-disk mirrors work the same way
/// as remote ones.
#[derive(Clone, Debug, Default)]
pub struct Fetcher;

impl Fetcher {
    pub fn new() -> Self {
        Self
    }
}

impl Fetch for Fetcher {
    fn fetch(&self, url: &Url) -> Result<Box<dyn Read + Send>, DownloadError> {
        debug!(url = url.as_str(), "fetching");

        match url.scheme() {
            "http" | "https" => {
                let resp = Http::fetch(url.as_str())?;
                Ok(Box::new(resp.into_body().into_reader()))
            }
            "file" => {
                let path = url.to_file_path().map_err(|_| {
                    DownloadError::UnsupportedScheme {
                        scheme: url.scheme().to_string(),
                        url: url.to_string(),
                    }
                })?;
                let file = File::open(&path).map_err(|err| {
                    DownloadError::LocalFile {
                        path: path.display().to_string(),
                        source: err,
                    }
                })?;
                Ok(Box::new(file))
            }
            scheme => {
                Err(DownloadError::UnsupportedScheme {
                    scheme: scheme.to_string(),
                    url: url.to_string(),
                })
            }
        }
    }
}
