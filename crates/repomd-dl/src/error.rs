use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum DownloadError {
    #[error("Unsupported URL scheme `{scheme}` in {url}")]
    #[diagnostic(
        code(repomd_dl::unsupported_scheme),
        help("Only http, https and file URLs can be fetched")
    )]
    UnsupportedScheme { scheme: String, url: String },

    #[error(transparent)]
    #[diagnostic(
        code(repomd_dl::network),
        help("Check your internet connection or try again later")
    )]
    Network(#[from] Box<ureq::Error>),

    #[error("HTTP {status}: {url}")]
    #[diagnostic(code(repomd_dl::http_error))]
    HttpError { status: u16, url: String },

    #[error("Failed to open {path}")]
    #[diagnostic(code(repomd_dl::local_file))]
    LocalFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, DownloadError>;

impl From<ureq::Error> for DownloadError {
    /// Converts a `ureq::Error` into a `DownloadError::Network` variant.
    fn from(e: ureq::Error) -> Self {
        Self::Network(Box::new(e))
    }
}
