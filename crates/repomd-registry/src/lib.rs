//! RPM repository metadata for the repomd tool.
//!
//! This crate reads the two layers of RPM repository metadata:
//!
//! - **Index**: `repodata/repomd.xml`, listing the sub-databases of a
//!   repository ([`resolve_index`], [`parse_index`])
//! - **Catalogs**: gzip-compressed XML sub-databases such as `primary.xml.gz`,
//!   one `<package>` element per package ([`decode_catalog`],
//!   [`decode_catalog_with`])
//!
//! The decoders work on bytes and readers only. The [`sync`] module resolves
//! URLs against a mirror and drives a [`repomd_dl::Fetch`] implementation.
//!
//! # Example
//!
//! ```no_run
//! use repomd_dl::Fetcher;
//! use repomd_registry::{fetch_catalog, fetch_index, repository_base_url, DecodePolicy};
//!
//! fn list() -> repomd_registry::Result<()> {
//!     let base = repository_base_url(
//!         "https://mirrors.edge.kernel.org/centos",
//!         "8-stream/BaseOS/x86_64/os",
//!     )?;
//!     let index = fetch_index(&Fetcher, &base)?;
//!
//!     if let Some(primary) = index.find("primary") {
//!         let catalog = fetch_catalog(&Fetcher, &base, primary, DecodePolicy::FailFast)?;
//!         for package in catalog.packages {
//!             println!("{} {}", package.name, package.version);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod error;
mod fragment;
pub mod index;
pub mod package;
pub mod sync;

pub use catalog::{
    decode_catalog, decode_catalog_with, decode_package, Catalog, DecodePolicy, FragmentFailure,
    GZIP_MAGIC_BYTES,
};
pub use error::{ErrorContext, RegistryError, Result};
pub use index::{parse_index, resolve_index, RepositoryIndex, SubDatabaseRef};
pub use package::{
    DependencyEntry, DependencyList, FormatBlock, HeaderRange, Location, PackageRecord,
    PackageSize, PackageTime, PackageVersion,
};
pub use sync::{
    catalog_url, fetch_catalog, fetch_catalogs, fetch_index, index_url, repository_base_url,
    CatalogResult,
};
