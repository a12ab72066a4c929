//! Package catalog decoding.
//!
//! A catalog (`primary.xml.gz` and friends) is a gzip-compressed XML document
//! with one `<package>` element per package. The decoder streams it: the
//! gzip layer and the XML reader work incrementally, and each `<package>`
//! element is cut out as a standalone fragment and deserialized on its own.

use std::io::{self, BufRead, BufReader, Read};

use flate2::bufread::GzDecoder;
use tracing::{debug, warn};

use crate::{
    error::{RegistryError, Result},
    fragment::{FragmentReader, ScanError},
    package::PackageRecord,
};

/// Magic bytes at the start of every gzip stream.
pub const GZIP_MAGIC_BYTES: [u8; 2] = [0x1f, 0x8b];

/// What to do when a single `<package>` element cannot be decoded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DecodePolicy {
    /// Abort the whole catalog on the first bad package.
    #[default]
    FailFast,
    /// Record the failure and keep decoding the remaining packages.
    SkipInvalid,
}

/// A package that was skipped under [`DecodePolicy::SkipInvalid`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FragmentFailure {
    /// Zero-based position of the `<package>` element in the document.
    pub index: usize,
    pub reason: String,
}

/// The result of decoding one catalog.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Catalog {
    /// Decoded packages, in document order.
    pub packages: Vec<PackageRecord>,
    /// Packages that failed to decode. Always empty under [`DecodePolicy::FailFast`].
    pub skipped: Vec<FragmentFailure>,
}

/// Decodes a gzip-compressed package catalog, failing on the first package
/// that cannot be decoded.
///
/// The stream is consumed and dropped before this function returns, whether
/// decoding succeeds or not.
///
/// # Errors
///
/// - [`RegistryError::Decompression`] if the input is not a valid gzip stream
/// - [`RegistryError::MalformedCatalog`] if the decompressed document is not
///   well-formed XML
/// - [`RegistryError::FragmentDecode`] if a `<package>` element cannot be
///   bound to [`PackageRecord`]
/// - [`RegistryError::IoError`] if reading the underlying stream fails
///
/// # Example
///
/// ```no_run
/// use std::fs::File;
///
/// use repomd_registry::decode_catalog;
///
/// fn count() -> repomd_registry::Result<usize> {
///     let file = File::open("repodata/primary.xml.gz").unwrap();
///     Ok(decode_catalog(file)?.len())
/// }
/// ```
pub fn decode_catalog<R: Read>(reader: R) -> Result<Vec<PackageRecord>> {
    decode_catalog_with(reader, DecodePolicy::FailFast).map(|catalog| catalog.packages)
}

/// Decodes a gzip-compressed package catalog using the given [`DecodePolicy`].
///
/// Structural errors (not gzip, not well-formed XML) abort regardless of the
/// policy; the policy only governs individual `<package>` elements.
pub fn decode_catalog_with<R: Read>(reader: R, policy: DecodePolicy) -> Result<Catalog> {
    let mut input = BufReader::new(reader);
    check_gzip_header(&mut input)?;

    let decoder = BufReader::new(GzDecoder::new(input));
    let mut fragments = FragmentReader::new(decoder, |_, name| name == b"package");

    let mut catalog = Catalog::default();
    let mut index = 0;

    while let Some(fragment) = fragments.next_fragment().map_err(scan_error)? {
        match bind_package(index, &fragment.xml) {
            Ok(package) => catalog.packages.push(package),
            Err(RegistryError::FragmentDecode { index, reason })
                if policy == DecodePolicy::SkipInvalid =>
            {
                warn!(index, reason = %reason, "skipping undecodable package");
                catalog.skipped.push(FragmentFailure { index, reason });
            }
            Err(err) => return Err(err),
        }
        index += 1;
    }

    debug!(
        packages = catalog.packages.len(),
        skipped = catalog.skipped.len(),
        root = ?fragments.root(),
        "decoded catalog"
    );

    Ok(catalog)
}

/// Decodes a single standalone `<package>` element.
///
/// `index` is only used to label the error. Any failure, including XML that
/// is not well-formed, is reported as [`RegistryError::FragmentDecode`].
pub fn decode_package(index: usize, xml: &str) -> Result<PackageRecord> {
    let decode_error = |reason: String| RegistryError::FragmentDecode { index, reason };

    let mut fragments = FragmentReader::new(xml.as_bytes(), |depth, _| depth == 0);
    let fragment = fragments
        .next_fragment()
        .map_err(|err| decode_error(err.to_string()))?
        .ok_or_else(|| decode_error("document has no root element".into()))?;
    fragments
        .next_fragment()
        .map_err(|err| decode_error(err.to_string()))?;

    bind_package(index, &fragment.xml)
}

/// Binds a fragment produced by [`FragmentReader`] to a [`PackageRecord`].
fn bind_package(index: usize, xml: &str) -> Result<PackageRecord> {
    quick_xml::de::from_str(xml).map_err(|err| {
        RegistryError::FragmentDecode {
            index,
            reason: err.to_string(),
        }
    })
}

fn check_gzip_header<R: BufRead>(input: &mut R) -> Result<()> {
    let head = input.fill_buf().map_err(|err| {
        RegistryError::IoError {
            action: "reading catalog stream".to_string(),
            source: err,
        }
    })?;

    if head.is_empty() {
        return Err(RegistryError::Decompression("catalog stream is empty".into()));
    }
    // A short first read can't be judged here; the gzip decoder validates it.
    if head.len() >= GZIP_MAGIC_BYTES.len() && head[..2] != GZIP_MAGIC_BYTES {
        return Err(RegistryError::Decompression(
            "stream does not start with the gzip magic bytes".into(),
        ));
    }
    Ok(())
}

fn scan_error(err: ScanError) -> RegistryError {
    match err {
        ScanError::Io(err) => {
            match err.kind() {
                io::ErrorKind::InvalidInput
                | io::ErrorKind::InvalidData
                | io::ErrorKind::UnexpectedEof => RegistryError::Decompression(err.to_string()),
                _ => {
                    RegistryError::IoError {
                        action: "reading catalog stream".to_string(),
                        source: err,
                    }
                }
            }
        }
        ScanError::Syntax(msg) => RegistryError::MalformedCatalog(msg),
    }
}
