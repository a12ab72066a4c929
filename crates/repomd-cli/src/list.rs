use std::sync::Arc;

use nu_ansi_term::Color::{Blue, Cyan, Green, LightRed, Yellow};
use repomd_config::config::Config;
use repomd_dl::{Fetch, Fetcher};
use repomd_registry::{
    catalog_url, fetch_catalogs, fetch_index, repository_base_url, DecodePolicy, PackageRecord,
    SubDatabaseRef,
};
use tabled::{
    builder::Builder,
    settings::{peaker::PriorityMax, themes::BorderCorrection, Panel, Style, Width},
};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    cli::RepoSelection,
    error::{AppError, AppResult},
    utils::{join_names, term_width, vec_string, Colored},
};

/// A repository resolved to its base URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub base: Url,
    /// Sub-database types to decode; `None` means all.
    pub types: Option<Vec<String>>,
}

impl Target {
    fn wants(&self, db_type: &str) -> bool {
        self.types
            .as_ref()
            .map_or(true, |types| types.iter().any(|t| t == db_type))
    }
}

/// Resolves the repositories a command should read.
pub fn resolve_targets(config: &Config, selection: &RepoSelection) -> AppResult<Vec<Target>> {
    if let (Some(mirror), Some(path)) = (&selection.mirror, &selection.path) {
        return Ok(vec![Target {
            name: mirror.clone(),
            base: repository_base_url(mirror, path)?,
            types: None,
        }]);
    }

    let repos = match &selection.repo {
        Some(name) => vec![config.get_repository(name)?],
        None => config.enabled_repositories().collect(),
    };

    if repos.is_empty() {
        return Err(AppError::NoRepositories);
    }

    repos
        .into_iter()
        .map(|repo| -> AppResult<Target> {
            Ok(Target {
                name: repo.name.clone(),
                base: repository_base_url(&repo.mirror, &repo.path)?,
                types: repo.types.clone(),
            })
        })
        .collect()
}

/// Picks the sub-databases to decode, warning about the ones that are wanted
/// but not stored as gzip-compressed XML.
pub fn select_databases(target: &Target, data: &[SubDatabaseRef]) -> Vec<SubDatabaseRef> {
    data.iter()
        .filter(|db| target.wants(&db.db_type))
        .filter(|db| {
            if db.is_compressed_xml() {
                true
            } else {
                warn!(
                    db_type = %db.db_type,
                    href = %db.href(),
                    "skipping sub-database with unsupported encoding"
                );
                false
            }
        })
        .cloned()
        .collect()
}

pub fn list_databases(config: &Config, selection: &RepoSelection, json: bool) -> AppResult<()> {
    for target in resolve_targets(config, selection)? {
        debug!(repo = %target.name, base = %target.base, "listing sub-databases");
        let index = fetch_index(&Fetcher, &target.base)?;

        if json {
            for db in &index.data {
                info!(
                    repo = %target.name,
                    revision = %index.revision,
                    db_type = %db.db_type,
                    href = %db.href(),
                    url = %catalog_url(&target.base, db)?,
                    supported = db.is_compressed_xml(),
                    "{}",
                    db.db_type
                );
            }
            continue;
        }

        let mut builder = Builder::new();
        builder.push_record(["Type", "Location", "URL"]);
        for db in &index.data {
            let db_type = if db.is_compressed_xml() {
                Colored(Green, &db.db_type).to_string()
            } else {
                Colored(Yellow, &db.db_type).to_string()
            };
            builder.push_record([
                db_type,
                db.href().to_string(),
                Colored(Blue, catalog_url(&target.base, db)?).to_string(),
            ]);
        }

        let header = if index.revision.is_empty() {
            target.name.clone()
        } else {
            format!("{} (revision {})", target.name, index.revision)
        };

        let table = builder
            .build()
            .with(Panel::header(header))
            .with(Style::rounded())
            .with(BorderCorrection {})
            .with(Width::wrap(term_width()).priority(PriorityMax::default()))
            .to_string();

        info!("\n{table}");
    }

    Ok(())
}

pub struct ListOptions {
    pub types: Vec<String>,
    pub skip_invalid: bool,
    pub limit: Option<usize>,
    pub json: bool,
}

pub async fn list_packages(
    config: &Config,
    selection: &RepoSelection,
    options: ListOptions,
) -> AppResult<()> {
    let policy = if options.skip_invalid || config.skip_invalid() {
        DecodePolicy::SkipInvalid
    } else {
        DecodePolicy::FailFast
    };
    let fetcher: Arc<dyn Fetch> = Arc::new(Fetcher::new());

    for mut target in resolve_targets(config, selection)? {
        if !options.types.is_empty() {
            target.types = Some(options.types.clone());
        }

        let index = fetch_index(fetcher.as_ref(), &target.base)?;
        let databases = select_databases(&target, &index.data);
        if databases.is_empty() {
            warn!(repo = %target.name, "no sub-databases to decode");
            continue;
        }

        let results = fetch_catalogs(
            fetcher.clone(),
            &target.base,
            databases,
            config.parallel_limit(),
            policy,
        )
        .await?;

        let mut total = 0;
        let mut skipped = 0;
        let mut decoded = 0;

        for (db, result) in results {
            let catalog = result?;
            decoded += 1;

            if !options.json {
                info!("{} {}", Colored(Cyan, "DB:"), db.db_type);
                info!(
                    "{} {}",
                    Colored(Cyan, "DB URL:"),
                    catalog_url(&target.base, &db)?
                );
            }

            let shown = options.limit.unwrap_or(usize::MAX);
            for package in catalog.packages.iter().take(shown) {
                print_package(&target.name, &db.db_type, package, options.json);
            }

            for failure in &catalog.skipped {
                warn!(
                    repo = %target.name,
                    db_type = %db.db_type,
                    index = failure.index,
                    "skipped package: {}",
                    failure.reason
                );
            }

            total += catalog.packages.len();
            skipped += catalog.skipped.len();
        }

        if options.json {
            continue;
        }

        let mut builder = Builder::new();
        builder.push_record(["Sub-databases".to_string(), Colored(Cyan, decoded).to_string()]);
        builder.push_record(["Packages".to_string(), Colored(Green, total).to_string()]);
        builder.push_record(["Skipped".to_string(), Colored(LightRed, skipped).to_string()]);

        let table = builder
            .build()
            .with(Panel::header(target.name.clone()))
            .with(Style::rounded())
            .with(BorderCorrection {})
            .to_string();

        info!("\n{table}");
    }

    Ok(())
}

fn print_package(repo: &str, db_type: &str, package: &PackageRecord, json: bool) {
    let requires = package.format.requires.names().collect::<Vec<_>>();
    let provides = package.format.provides.names().collect::<Vec<_>>();

    if json {
        info!(
            repo = repo,
            db_type = db_type,
            name = %package.name,
            arch = %package.arch,
            version = %package.version,
            summary = %package.summary,
            location = %package.location.href,
            requires = vec_string(&requires),
            provides = vec_string(&provides),
            "{}",
            package.name
        );
        return;
    }

    info!(
        "\n{} {}\n{} {}\n{} {}\n{}\n{}\n{}\n{}\n",
        Colored(Blue, "Name:"),
        package.name,
        Colored(Blue, "Version:"),
        Colored(LightRed, &package.version),
        Colored(Blue, "Summary:"),
        package.summary,
        Colored(Blue, "Requires:"),
        join_names(requires),
        Colored(Blue, "Provides:"),
        join_names(provides),
    );
}
