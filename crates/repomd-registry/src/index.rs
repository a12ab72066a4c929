//! Repository index (`repodata/repomd.xml`) resolution.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{RegistryError, Result},
    fragment::{FragmentReader, ScanError},
    package::Location,
};

/// Name of the index document's root element.
pub const INDEX_ROOT: &str = "repomd";

/// One `<data>` entry of the index: a sub-database and where to find it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename = "data", default)]
pub struct SubDatabaseRef {
    /// Type tag, e.g. `primary`, `filelists`, `other`, `primary_db`.
    #[serde(rename = "@type")]
    pub db_type: String,

    /// Location relative to the repository base URL.
    pub location: Location,
}

impl SubDatabaseRef {
    pub fn new<T: Into<String>, H: Into<String>>(db_type: T, href: H) -> Self {
        Self {
            db_type: db_type.into(),
            location: Location { href: href.into() },
        }
    }

    pub fn href(&self) -> &str {
        &self.location.href
    }

    /// Whether the sub-database is a gzip-compressed XML document, the only
    /// encoding the catalog decoder understands.
    pub fn is_compressed_xml(&self) -> bool {
        self.href().ends_with(".xml.gz")
    }
}

/// The decoded index document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryIndex {
    /// Opaque revision marker; empty if the index has none.
    pub revision: String,
    /// Sub-databases in document order. Duplicate type tags are kept.
    pub data: Vec<SubDatabaseRef>,
}

impl RepositoryIndex {
    /// Returns the first sub-database with the given type tag.
    pub fn find(&self, db_type: &str) -> Option<&SubDatabaseRef> {
        self.data.iter().find(|data| data.db_type == db_type)
    }
}

#[derive(Deserialize)]
struct Revision {
    #[serde(rename = "$text", default)]
    value: String,
}

/// Parses an index document into a [`RepositoryIndex`].
///
/// # Errors
///
/// Returns [`RegistryError::MalformedIndex`] if the document is not
/// well-formed XML, its root element is not `repomd`, or one of its entries
/// cannot be decoded. No partial index is returned.
pub fn parse_index(bytes: &[u8]) -> Result<RepositoryIndex> {
    let mut fragments = FragmentReader::new(bytes, |depth, name| {
        depth == 1 && (name == b"data" || name == b"revision")
    });

    let mut index = RepositoryIndex::default();
    while let Some(fragment) = fragments.next_fragment().map_err(malformed)? {
        if fragments.root() != Some(INDEX_ROOT) {
            break;
        }

        match fragment.name.as_str() {
            "revision" => {
                let revision: Revision = quick_xml::de::from_str(&fragment.xml)
                    .map_err(|err| RegistryError::MalformedIndex(err.to_string()))?;
                index.revision = revision.value;
            }
            _ => {
                let data: SubDatabaseRef = quick_xml::de::from_str(&fragment.xml)
                    .map_err(|err| RegistryError::MalformedIndex(err.to_string()))?;
                index.data.push(data);
            }
        }
    }

    match fragments.root() {
        Some(INDEX_ROOT) => {}
        Some(root) => {
            return Err(RegistryError::MalformedIndex(format!(
                "expected root element `{INDEX_ROOT}`, found `{root}`"
            )));
        }
        None => {
            return Err(RegistryError::MalformedIndex(
                "document has no root element".into(),
            ));
        }
    }

    debug!(
        revision = %index.revision,
        databases = index.data.len(),
        "resolved repository index"
    );

    Ok(index)
}

/// Resolves an index document into its sub-database references, in
/// document order.
pub fn resolve_index(bytes: &[u8]) -> Result<Vec<SubDatabaseRef>> {
    parse_index(bytes).map(|index| index.data)
}

fn malformed(err: ScanError) -> RegistryError {
    match err {
        ScanError::Io(err) => RegistryError::MalformedIndex(err.to_string()),
        ScanError::Syntax(msg) => RegistryError::MalformedIndex(msg),
    }
}
