//! Fetching repository metadata from a mirror.
//!
//! These functions tie the [`Fetch`] collaborator to the index resolver and
//! the catalog decoder. They own URL resolution; the decoders themselves never
//! touch the network.

use std::{io::Read, sync::Arc};

use repomd_dl::Fetch;
use tokio::sync::Semaphore;
use tracing::{debug, trace};
use url::Url;

use crate::{
    catalog::{decode_catalog_with, Catalog, DecodePolicy},
    error::{ErrorContext, RegistryError, Result},
    index::{parse_index, RepositoryIndex, SubDatabaseRef},
};

/// Location of the index document relative to the repository base URL.
pub const INDEX_PATH: &str = "repodata/repomd.xml";

/// Outcome of decoding one sub-database during a fan-out.
pub type CatalogResult = (SubDatabaseRef, Result<Catalog>);

/// Builds the base URL of a repository from its mirror and path.
///
/// The returned URL always ends with a slash, so relative `href`s from the
/// index resolve underneath it.
///
/// # Example
///
/// ```
/// use repomd_registry::repository_base_url;
///
/// let base = repository_base_url(
///     "https://mirrors.edge.kernel.org/centos",
///     "8-stream/BaseOS/x86_64/os",
/// )
/// .unwrap();
/// assert_eq!(
///     base.as_str(),
///     "https://mirrors.edge.kernel.org/centos/8-stream/BaseOS/x86_64/os/"
/// );
/// ```
pub fn repository_base_url(mirror: &str, path: &str) -> Result<Url> {
    let mut base = Url::parse(mirror)
        .map_err(|err| RegistryError::InvalidUrl(format!("{mirror}: {err}")))?;

    if base.cannot_be_a_base() {
        return Err(RegistryError::InvalidUrl(format!(
            "{mirror}: cannot be used as a base URL"
        )));
    }

    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }

    let path = path.trim_matches('/');
    if path.is_empty() {
        return Ok(base);
    }

    base.join(&format!("{path}/"))
        .map_err(|err| RegistryError::InvalidUrl(format!("{path}: {err}")))
}

/// URL of the index document (`repodata/repomd.xml`) under `base`.
pub fn index_url(base: &Url) -> Result<Url> {
    resolve_href(base, INDEX_PATH)
}

/// Resolves a sub-database location against the repository base URL.
pub fn catalog_url(base: &Url, data: &SubDatabaseRef) -> Result<Url> {
    resolve_href(base, data.href())
}

fn resolve_href(base: &Url, href: &str) -> Result<Url> {
    base.join(href)
        .map_err(|err| RegistryError::InvalidUrl(format!("{href}: {err}")))
}

fn open(fetcher: &dyn Fetch, url: &Url) -> Result<Box<dyn Read + Send>> {
    trace!(url = %url, "opening");
    fetcher.fetch(url).map_err(|source| {
        RegistryError::Fetch {
            url: url.to_string(),
            source,
        }
    })
}

/// Fetches and resolves the repository index.
pub fn fetch_index(fetcher: &dyn Fetch, base: &Url) -> Result<RepositoryIndex> {
    let url = index_url(base)?;
    debug!(url = %url, "fetching repository index");

    let mut bytes = Vec::new();
    open(fetcher, &url)?
        .read_to_end(&mut bytes)
        .with_context(|| format!("reading {url}"))?;

    parse_index(&bytes)
}

/// Fetches and decodes the catalog referenced by `data`.
///
/// The response body is streamed straight into the decoder.
pub fn fetch_catalog(
    fetcher: &dyn Fetch,
    base: &Url,
    data: &SubDatabaseRef,
    policy: DecodePolicy,
) -> Result<Catalog> {
    let url = catalog_url(base, data)?;
    debug!(url = %url, db_type = %data.db_type, "fetching catalog");

    let reader = open(fetcher, &url)?;
    decode_catalog_with(reader, policy)
}

/// Fetches and decodes several catalogs with at most `limit` in flight.
///
/// Each decode runs on the blocking thread pool. Results come back in the
/// order of `refs`, paired with the reference they belong to, regardless of
/// completion order. A `limit` of 0 or 1 decodes sequentially on the current
/// task.
///
/// # Errors
///
/// The outer `Result` only fails if a decode task panics or the runtime shuts
/// down; per-catalog failures are reported in the returned pairs.
pub async fn fetch_catalogs(
    fetcher: Arc<dyn Fetch>,
    base: &Url,
    refs: Vec<SubDatabaseRef>,
    limit: usize,
    policy: DecodePolicy,
) -> Result<Vec<CatalogResult>> {
    debug!(count = refs.len(), limit, "fetching catalogs");

    if limit <= 1 {
        return Ok(refs
            .into_iter()
            .map(|data| {
                let result = fetch_catalog(fetcher.as_ref(), base, &data, policy);
                (data, result)
            })
            .collect());
    }

    let semaphore = Arc::new(Semaphore::new(limit));
    let mut handles = Vec::with_capacity(refs.len());

    for data in refs {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|err| RegistryError::Custom(format!("Semaphore closed: {err}")))?;
        let fetcher = fetcher.clone();
        let base = base.clone();

        let handle = tokio::task::spawn_blocking(move || {
            let result = fetch_catalog(fetcher.as_ref(), &base, &data, policy);
            drop(permit);
            (data, result)
        });
        handles.push(handle);
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        let pair = handle
            .await
            .map_err(|err| RegistryError::Custom(format!("Join handle error: {err}")))?;
        results.push(pair);
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_base_url() {
        let base = repository_base_url("https://mirror.example.com/centos", "8-stream/BaseOS/x86_64/os")
            .unwrap();
        assert_eq!(
            base.as_str(),
            "https://mirror.example.com/centos/8-stream/BaseOS/x86_64/os/"
        );

        let base = repository_base_url("https://mirror.example.com/centos/", "/8/os/").unwrap();
        assert_eq!(base.as_str(), "https://mirror.example.com/centos/8/os/");

        let base = repository_base_url("file:///srv/mirror", "").unwrap();
        assert_eq!(base.as_str(), "file:///srv/mirror/");
    }

    #[test]
    fn test_repository_base_url_invalid() {
        assert!(matches!(
            repository_base_url("not a url", "os"),
            Err(RegistryError::InvalidUrl(_))
        ));
        assert!(matches!(
            repository_base_url("mailto:root@example.com", "os"),
            Err(RegistryError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_index_and_catalog_urls() {
        let base = repository_base_url("https://mirror.example.com", "os").unwrap();

        assert_eq!(
            index_url(&base).unwrap().as_str(),
            "https://mirror.example.com/os/repodata/repomd.xml"
        );

        let data = SubDatabaseRef::new("primary", "repodata/abc-primary.xml.gz");
        assert_eq!(
            catalog_url(&base, &data).unwrap().as_str(),
            "https://mirror.example.com/os/repodata/abc-primary.xml.gz"
        );
    }
}
