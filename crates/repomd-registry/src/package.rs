//! Package catalog record structures.
//!
//! This module defines [`PackageRecord`] and its nested parts, which mirror a
//! `<package>` element of an RPM `primary.xml` catalog. Every value is kept as
//! the opaque string found in the document; nothing is parsed numerically.
//!
//! The serde attributes follow the `quick-xml` conventions (`@name` for
//! attributes), so a record can be encoded back into the catalog schema with
//! `quick_xml::se` and decoded again into an equal value. Namespace prefixes
//! such as `rpm:` are stripped before decoding, which is why the field names
//! below carry none.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A relative location inside a repository, e.g.
/// `Packages/bash-5.0.17-1.el8.x86_64.rpm` or `repodata/primary.xml.gz`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Location {
    #[serde(rename = "@href", default)]
    pub href: String,
}

/// Epoch/version/release triple of a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PackageVersion {
    #[serde(rename = "@epoch")]
    pub epoch: String,

    #[serde(rename = "@ver")]
    pub ver: String,

    #[serde(rename = "@rel")]
    pub rel: String,
}

impl fmt::Display for PackageVersion {
    /// Formats the version as `[epoch:]ver[-rel]`, omitting an empty or zero epoch.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.epoch.is_empty() && self.epoch != "0" {
            write!(f, "{}:", self.epoch)?;
        }
        f.write_str(&self.ver)?;
        if !self.rel.is_empty() {
            write!(f, "-{}", self.rel)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PackageTime {
    #[serde(rename = "@file")]
    pub file: String,

    #[serde(rename = "@build")]
    pub build: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PackageSize {
    #[serde(rename = "@package")]
    pub package: String,

    #[serde(rename = "@installed")]
    pub installed: String,

    #[serde(rename = "@archive")]
    pub archive: String,
}

/// Byte range of the RPM header inside the package file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HeaderRange {
    #[serde(rename = "@start")]
    pub start: String,

    #[serde(rename = "@end")]
    pub end: String,
}

/// A capability a package requires or provides.
///
/// Only the symbolic name is kept; version constraints (`flags`, `ver`, ...)
/// are ignored while decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DependencyEntry {
    #[serde(rename = "@name", default)]
    pub name: String,
}

impl DependencyEntry {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into() }
    }
}

/// Ordered list of `<entry>` elements under `<requires>` or `<provides>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DependencyList {
    #[serde(rename = "entry", default)]
    pub entries: Vec<DependencyEntry>,
}

impl DependencyList {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterates over the entry names in document order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }
}

impl<S: Into<String>> FromIterator<S> for DependencyList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(DependencyEntry::new).collect(),
        }
    }
}

/// The `<format>` block of a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FormatBlock {
    pub license: String,
    pub vendor: String,
    pub group: String,
    pub buildhost: String,

    #[serde(rename = "header-range")]
    pub header_range: HeaderRange,

    pub requires: DependencyList,
    pub provides: DependencyList,
}

/// One `<package>` element of a package catalog.
///
/// Elements missing from the document decode to empty values; unknown
/// elements (`checksum`, `file`, `rpm:sourcerpm`, ...) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename = "package", default)]
pub struct PackageRecord {
    pub name: String,
    pub arch: String,
    pub version: PackageVersion,
    pub summary: String,
    pub description: String,
    pub packager: String,
    pub url: String,
    pub time: PackageTime,
    pub size: PackageSize,
    pub location: Location,
    pub format: FormatBlock,
}

impl PackageRecord {
    /// Encodes the record as a standalone `<package>` element.
    pub fn to_xml(&self) -> Result<String, quick_xml::SeError> {
        quick_xml::se::to_string(self)
    }
}
