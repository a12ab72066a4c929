use miette::Diagnostic;
use repomd_config::error::ConfigError;
use repomd_registry::RegistryError;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum AppError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error("Invalid proxy {proxy}: {reason}")]
    #[diagnostic(
        code(repomd::invalid_proxy),
        help("Use a proxy URL such as http://host:port or socks5://host:port")
    )]
    InvalidProxy { proxy: String, reason: String },

    #[error("Invalid header: {0:?}")]
    #[diagnostic(
        code(repomd::invalid_header),
        help("Headers must be given as `Key: Value`")
    )]
    InvalidHeader(String),

    #[error("No enabled repositories")]
    #[diagnostic(
        code(repomd::no_repositories),
        help("Add a repository to your config file or pass --mirror and --path")
    )]
    NoRepositories,

    #[error("Error while {action}: {source}")]
    #[diagnostic(code(repomd::io))]
    IoError {
        action: String,
        source: std::io::Error,
    },
}

pub type AppResult<T> = std::result::Result<T, AppError>;
