use documented::{Documented, DocumentedFields};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ConfigError, Result};

/// Schemes a mirror URL may use.
pub const SUPPORTED_SCHEMES: [&str; 3] = ["http", "https", "file"];

/// Defines an RPM repository on a mirror.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct Repository {
    /// Unique name of the repository.
    pub name: String,

    /// Base URL of the mirror (http, https or file).
    pub mirror: String,

    /// Path of the repository under the mirror, i.e. the directory that
    /// contains `repodata/`.
    pub path: String,

    /// Whether the repository is enabled.
    /// Default: true
    pub enabled: Option<bool>,

    /// Sub-database types to decode (e.g., ["primary"]).
    /// Default: every gzip-compressed XML sub-database
    pub types: Option<Vec<String>>,
}

impl Repository {
    pub fn new<N, M, P>(name: N, mirror: M, path: P) -> Self
    where
        N: Into<String>,
        M: Into<String>,
        P: Into<String>,
    {
        Self {
            name: name.into(),
            mirror: mirror.into(),
            path: path.into(),
            enabled: Some(true),
            types: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    /// Whether sub-databases of `db_type` should be decoded for this repository.
    pub fn wants(&self, db_type: &str) -> bool {
        match &self.types {
            Some(types) => types.iter().any(|t| t == db_type),
            None => true,
        }
    }

    /// Checks that the name is usable and the mirror is an absolute URL with a
    /// supported scheme.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::InvalidRepository(self.name.clone()));
        }

        let invalid = |reason: String| {
            ConfigError::InvalidMirrorUrl {
                name: self.name.clone(),
                reason,
            }
        };

        let url = Url::parse(&self.mirror).map_err(|err| invalid(format!("{}: {err}", self.mirror)))?;
        if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
            return Err(invalid(format!("unsupported scheme `{}`", url.scheme())));
        }

        Ok(())
    }
}

/// The repository used when no configuration file exists.
pub fn default_repository() -> Repository {
    Repository::new(
        "baseos",
        "https://mirrors.edge.kernel.org/centos",
        "8-stream/BaseOS/x86_64/os",
    )
}
