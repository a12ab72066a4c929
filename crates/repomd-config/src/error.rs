use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML serialization error: {0}")]
    #[diagnostic(
        code(repomd_config::toml_serialize),
        help("Check your configuration structure for invalid values")
    )]
    TomlSerError(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(repomd_config::toml_deserialize),
        help("Check your config.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Configuration file already exists: {0}")]
    #[diagnostic(
        code(repomd_config::already_exists),
        help("Remove the existing config file or use a different location")
    )]
    ConfigAlreadyExists(String),

    #[error("Invalid repository name: {0:?}")]
    #[diagnostic(
        code(repomd_config::invalid_repository),
        help("Repository names must be non-empty")
    )]
    InvalidRepository(String),

    #[error("Invalid mirror URL for repository '{name}': {reason}")]
    #[diagnostic(
        code(repomd_config::invalid_mirror),
        help("Mirrors must be absolute http://, https:// or file:// URLs")
    )]
    InvalidMirrorUrl { name: String, reason: String },

    #[error("Duplicate repository name: {0}")]
    #[diagnostic(
        code(repomd_config::duplicate_repo),
        help("Each repository must have a unique name")
    )]
    DuplicateRepositoryName(String),

    #[error("Repository not found: {0}")]
    #[diagnostic(
        code(repomd_config::repository_not_found),
        help("Check the repository name, or whether it is disabled, in your config file")
    )]
    RepositoryNotFound(String),

    #[error("parallel_limit must be at least 1")]
    #[diagnostic(code(repomd_config::invalid_parallel_limit))]
    InvalidParallelLimit,

    #[error("Invalid duration: {0:?}")]
    #[diagnostic(
        code(repomd_config::invalid_duration),
        help("Use a duration like \"30s\", \"2m\" or \"1h30m\"")
    )]
    InvalidDuration(String),

    #[error("Path is empty")]
    #[diagnostic(code(repomd_config::empty_path))]
    EmptyPath,

    #[error("Environment variable `{var}` not set in `{input}`")]
    #[diagnostic(code(repomd_config::missing_env_var))]
    MissingEnvVar { var: String, input: String },

    #[error("Unclosed variable expression starting at `{0}`")]
    #[diagnostic(code(repomd_config::unclosed_variable))]
    UnclosedVariable(String),

    #[error("IO error: {0}")]
    #[diagnostic(code(repomd_config::io))]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    #[diagnostic(code(repomd_config::toml))]
    Toml(#[from] toml_edit::TomlError),

    #[error("Encountered unexpected TOML item: {0}")]
    #[diagnostic(code(repomd_config::unexpected_toml_item))]
    UnexpectedTomlItem(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
