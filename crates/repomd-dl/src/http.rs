use ureq::{http::Response, Body};

use crate::{error::DownloadError, http_client};

pub struct Http;

impl Http {
    /// Issues a GET request through the shared agent.
    ///
    /// Non-success statuses are reported as [`DownloadError::HttpError`].
    pub fn fetch(url: &str) -> Result<Response<Body>, DownloadError> {
        http_client::get(url).call().map_err(|err| {
            match err {
                ureq::Error::StatusCode(status) => {
                    DownloadError::HttpError {
                        status,
                        url: url.to_string(),
                    }
                }
                err => DownloadError::from(err),
            }
        })
    }
}
