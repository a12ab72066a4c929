use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    sync::{LazyLock, PoisonError, RwLock},
    time::Duration,
};

use documented::{Documented, DocumentedFields};
use serde::{Deserialize, Serialize};
use toml_edit::DocumentMut;
use tracing::{debug, info};

use crate::{
    annotations::{annotate_toml_array_of_tables, annotate_toml_table},
    error::{ConfigError, Result},
    repository::{default_repository, Repository},
    utils::{parse_duration, resolve_path, xdg_config_home},
};

/// Configuration of the repomd tool
#[derive(Clone, Debug, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct Config {
    /// If true, decodes the sub-databases of a repository concurrently.
    /// Default: true
    pub parallel: Option<bool>,

    /// Maximum number of sub-databases decoded at the same time.
    /// Default: 4
    pub parallel_limit: Option<u32>,

    /// If true, package entries that fail to decode are skipped and reported
    /// instead of aborting the whole catalog.
    /// Default: false
    pub skip_invalid: Option<bool>,

    /// Timeout for HTTP requests (e.g., "30s", "2m").
    /// Default: no timeout
    pub timeout: Option<String>,

    /// User agent sent with HTTP requests.
    /// Default: "repomd/<version>"
    pub user_agent: Option<String>,

    /// List of configured repositories.
    #[serde(default)]
    pub repositories: Vec<Repository>,
}

pub static CONFIG: LazyLock<RwLock<Option<Config>>> = LazyLock::new(|| RwLock::new(None));

pub static CONFIG_PATH: LazyLock<RwLock<PathBuf>> = LazyLock::new(|| {
    RwLock::new(match std::env::var("REPOMD_CONFIG") {
        Ok(path) => resolve_path(&path).unwrap_or_else(|_| PathBuf::from(path)),
        Err(_) => default_config_path(),
    })
});

/// `$XDG_CONFIG_HOME/repomd/config.toml`
pub fn default_config_path() -> PathBuf {
    xdg_config_home().join("repomd").join("config.toml")
}

/// Returns the path the configuration is loaded from and written to.
pub fn config_path() -> PathBuf {
    CONFIG_PATH
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Overrides the configuration path, e.g. from a `--config` flag.
pub fn set_config_path(path: &str) -> Result<()> {
    let resolved = resolve_path(path)?;
    *CONFIG_PATH.write().unwrap_or_else(PoisonError::into_inner) = resolved;
    Ok(())
}

/// Loads the configuration file into the process-wide configuration.
pub fn init() -> Result<()> {
    let config = Config::new()?;
    *CONFIG.write().unwrap_or_else(PoisonError::into_inner) = Some(config);
    Ok(())
}

/// Returns the process-wide configuration, falling back to the built-in
/// default if [`init`] has not been called.
pub fn get_config() -> Config {
    if let Some(config) = CONFIG
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
    {
        return config.clone();
    }

    let mut guard = CONFIG.write().unwrap_or_else(PoisonError::into_inner);
    guard.get_or_insert_with(Config::default_config).clone()
}

impl Config {
    pub fn default_config() -> Self {
        Self {
            parallel: Some(true),
            parallel_limit: Some(4),
            skip_invalid: Some(false),
            timeout: None,
            user_agent: None,
            repositories: vec![default_repository()],
        }
    }

    /// Creates a new configuration by loading it from the configuration file.
    /// If the configuration file is not found, it uses the default configuration.
    pub fn new() -> Result<Self> {
        if std::env::var("REPOMD_STEALTH").is_ok() {
            debug!("REPOMD_STEALTH set, using default configuration");
            return Ok(Self::default_config());
        }

        Self::load(&config_path())
    }

    /// Loads and resolves the configuration at `path`, or the default
    /// configuration if the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = match fs::read_to_string(path) {
            Ok(content) => {
                debug!(path = %path.display(), "loading configuration");
                toml::from_str(&content)?
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no configuration file, using defaults");
                Self::default_config()
            }
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        config.resolve()?;

        Ok(config)
    }

    /// Fills in defaults and validates the configuration.
    pub fn resolve(&mut self) -> Result<()> {
        self.parallel.get_or_insert(true);
        self.skip_invalid.get_or_insert(false);
        if *self.parallel_limit.get_or_insert(4) == 0 {
            return Err(ConfigError::InvalidParallelLimit);
        }

        if let Some(timeout) = &self.timeout {
            if parse_duration(timeout).is_none() {
                return Err(ConfigError::InvalidDuration(timeout.clone()));
            }
        }

        let mut seen_repos = HashSet::new();
        for repo in &mut self.repositories {
            repo.validate()?;
            if !seen_repos.insert(repo.name.clone()) {
                return Err(ConfigError::DuplicateRepositoryName(repo.name.clone()));
            }
            repo.enabled.get_or_insert(true);
        }

        Ok(())
    }

    /// Number of sub-databases that may be decoded at once; 1 when parallel
    /// decoding is disabled.
    pub fn parallel_limit(&self) -> usize {
        if self.parallel.unwrap_or(true) {
            self.parallel_limit.unwrap_or(4).max(1) as usize
        } else {
            1
        }
    }

    pub fn skip_invalid(&self) -> bool {
        self.skip_invalid.unwrap_or(false)
    }

    /// The HTTP timeout, if one is configured.
    pub fn timeout(&self) -> Result<Option<Duration>> {
        self.timeout
            .as_deref()
            .map(|value| {
                parse_duration(value)
                    .and_then(|ms| u64::try_from(ms).ok())
                    .map(Duration::from_millis)
                    .ok_or_else(|| ConfigError::InvalidDuration(value.to_string()))
            })
            .transpose()
    }

    /// Returns the enabled repository called `name`.
    pub fn get_repository(&self, name: &str) -> Result<&Repository> {
        self.repositories
            .iter()
            .find(|repo| repo.name == name && repo.is_enabled())
            .ok_or_else(|| ConfigError::RepositoryNotFound(name.to_string()))
    }

    pub fn enabled_repositories(&self) -> impl Iterator<Item = &Repository> {
        self.repositories.iter().filter(|repo| repo.is_enabled())
    }

    /// Serializes the configuration as plain TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Serializes the configuration as TOML with every field documented.
    pub fn to_annotated_document(&self) -> Result<DocumentMut> {
        let mut doc = self.to_toml()?.parse::<DocumentMut>()?;

        annotate_toml_table::<Config>(doc.as_table_mut(), true)?;

        if let Some(repositories) = doc
            .get_mut("repositories")
            .and_then(|item| item.as_array_of_tables_mut())
        {
            annotate_toml_array_of_tables::<Repository>(repositories)?;
        }

        Ok(doc)
    }
}

/// Writes the annotated default configuration to `path`, or to the current
/// configuration path. Refuses to overwrite an existing file.
pub fn generate_default_config(path: Option<&Path>) -> Result<PathBuf> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => config_path(),
    };

    if config_path.exists() {
        return Err(ConfigError::ConfigAlreadyExists(
            config_path.display().to_string(),
        ));
    }

    let annotated_doc = Config::default_config().to_annotated_document()?;

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(&config_path, annotated_doc.to_string())?;
    info!(
        "Default configuration file generated with documentation at: {}",
        config_path.display()
    );
    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;
    use crate::test_utils::with_vars;

    #[test]
    fn test_default_config() {
        let config = Config::default_config();

        assert_eq!(config.parallel_limit(), 4);
        assert!(!config.skip_invalid());
        assert!(config.timeout().unwrap().is_none());
        assert_eq!(config.repositories.len(), 1);

        let repo = config.get_repository("baseos").unwrap();
        assert_eq!(repo.mirror, "https://mirrors.edge.kernel.org/centos");
        assert_eq!(repo.path, "8-stream/BaseOS/x86_64/os");
    }

    #[test]
    fn test_resolve_sets_defaults() {
        let mut config: Config = toml::from_str(
            r#"
            [[repositories]]
            name = "appstream"
            mirror = "https://mirror.example.com/centos"
            path = "8-stream/AppStream/x86_64/os"
            "#,
        )
        .unwrap();

        config.resolve().unwrap();

        assert_eq!(config.parallel, Some(true));
        assert_eq!(config.parallel_limit, Some(4));
        assert_eq!(config.skip_invalid, Some(false));
        assert_eq!(config.repositories[0].enabled, Some(true));
    }

    #[test]
    fn test_resolve_duplicate_repo() {
        let mut config = Config::default_config();
        config.repositories.push(default_repository());

        let result = config.resolve();
        assert!(matches!(result, Err(ConfigError::DuplicateRepositoryName(ref name)) if name == "baseos"));
    }

    #[test]
    fn test_resolve_invalid_values() {
        let mut config = Config::default_config();
        config.parallel_limit = Some(0);
        assert!(matches!(config.resolve(), Err(ConfigError::InvalidParallelLimit)));

        let mut config = Config::default_config();
        config.timeout = Some("soon".to_string());
        assert!(matches!(config.resolve(), Err(ConfigError::InvalidDuration(_))));

        let mut config = Config::default_config();
        config.repositories[0].mirror = "rsync://mirror.example.com".to_string();
        assert!(matches!(
            config.resolve(),
            Err(ConfigError::InvalidMirrorUrl { .. })
        ));
    }

    #[test]
    fn test_parallel_disabled() {
        let mut config = Config::default_config();
        config.parallel = Some(false);
        config.parallel_limit = Some(16);

        assert_eq!(config.parallel_limit(), 1);
    }

    #[test]
    fn test_timeout() {
        let mut config = Config::default_config();
        config.timeout = Some("1m30s".to_string());

        assert_eq!(config.timeout().unwrap(), Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_disabled_repository_is_not_found() {
        let mut config = Config::default_config();
        config.repositories[0].enabled = Some(false);

        assert!(matches!(
            config.get_repository("baseos"),
            Err(ConfigError::RepositoryNotFound(_))
        ));
        assert_eq!(config.enabled_repositories().count(), 0);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("config.toml")).unwrap();

        assert_eq!(config.repositories, vec![default_repository()]);
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "repositories = 3").unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::TomlDeError(_))));
    }

    #[test]
    fn test_generate_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repomd").join("config.toml");

        let written = generate_default_config(Some(&path)).unwrap();
        assert_eq!(written, path);

        let config = Config::load(&path).unwrap();
        assert_eq!(config.repositories, vec![default_repository()]);
        assert_eq!(config.parallel_limit(), 4);

        assert!(matches!(
            generate_default_config(Some(&path)),
            Err(ConfigError::ConfigAlreadyExists(_))
        ));
    }

    #[test]
    #[serial]
    fn test_stealth_ignores_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "not toml at all = = =").unwrap();
        let previous = config_path();
        set_config_path(path.to_str().unwrap()).unwrap();

        with_vars(vec![("REPOMD_STEALTH", Some("1"))], || {
            assert!(Config::new().is_ok());
        });
        with_vars(vec![("REPOMD_STEALTH", None)], || {
            assert!(Config::new().is_err());
        });

        set_config_path(previous.to_str().unwrap()).unwrap();
    }
}
