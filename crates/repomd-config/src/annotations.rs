//! Turns field doc comments into TOML comments for the generated config file.

use std::any::type_name;

use documented::{Documented, DocumentedFields};
use toml_edit::{ArrayOfTables, Decor, Item, RawString, Table};
use tracing::warn;

use crate::error::{ConfigError, Result};

fn to_comment_block(docs: &str) -> String {
    docs.lines()
        .map(|line| {
            if line.is_empty() {
                "#\n".to_string()
            } else {
                format!("# {line}\n")
            }
        })
        .collect()
}

/// Prepends `docs` as `#` comment lines to whatever prefix `decor` already has.
///
/// An existing non-blank prefix is separated from the new block by an empty
/// comment line.
pub fn append_docs_as_toml_comments(decor: &mut Decor, docs: &str) {
    let comments = to_comment_block(docs);
    let existing = decor
        .prefix()
        .and_then(RawString::as_str)
        .unwrap_or_default();

    let prefix = match existing.lines().last() {
        None => comments,
        Some("") => format!("{existing}{comments}"),
        Some(_) => format!("{existing}#\n{comments}"),
    };
    decor.set_prefix(prefix);
}

/// Adds the field docs of `T` above every key of `table`.
///
/// Non-root tables also get the doc comment of `T` itself.
pub fn annotate_toml_table<T>(table: &mut Table, is_root: bool) -> Result<()>
where
    T: Documented + DocumentedFields,
{
    if !is_root {
        append_docs_as_toml_comments(table.decor_mut(), T::DOCS);
    }

    for (mut key, item) in table.iter_mut() {
        let name = key.get().to_string();
        let Ok(docs) = T::get_field_docs(&name) else {
            warn!(
                field = %name,
                ty = type_name::<T>(),
                "no documentation for config field"
            );
            continue;
        };

        match item {
            Item::None => return Err(ConfigError::UnexpectedTomlItem(name)),
            Item::Value(_) => append_docs_as_toml_comments(key.leaf_decor_mut(), docs),
            Item::Table(sub_table) => append_docs_as_toml_comments(sub_table.decor_mut(), docs),
            Item::ArrayOfTables(array) => {
                if let Some(first) = array.iter_mut().next() {
                    append_docs_as_toml_comments(first.decor_mut(), docs);
                }
            }
        }
    }

    Ok(())
}

/// Annotates the first table of `array` with the docs of `T`; the remaining
/// entries share its shape and are left bare.
pub fn annotate_toml_array_of_tables<T>(array: &mut ArrayOfTables) -> Result<()>
where
    T: Documented + DocumentedFields,
{
    match array.iter_mut().next() {
        Some(first) => annotate_toml_table::<T>(first, false),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn prefix(decor: &Decor) -> String {
        decor
            .prefix()
            .and_then(RawString::as_str)
            .unwrap_or_default()
            .to_string()
    }

    #[test]
    fn test_append_docs_as_toml_comments() {
        let mut decor = Decor::new("", "");
        append_docs_as_toml_comments(&mut decor, "Line 1\n\nLine 2");

        assert_eq!(prefix(&decor), "# Line 1\n#\n# Line 2\n");
    }

    #[test]
    fn test_append_docs_separates_existing_prefix() {
        let mut decor = Decor::new("# existing\n", "");
        append_docs_as_toml_comments(&mut decor, "Added");

        assert_eq!(prefix(&decor), "# existing\n#\n# Added\n");
    }

    #[test]
    fn test_annotated_document_documents_fields() {
        let doc = Config::default_config().to_annotated_document().unwrap();
        let text = doc.to_string();

        assert!(text.contains("# Maximum number of sub-databases decoded at the same time."));
        assert!(text.contains("# Base URL of the mirror"));
        assert!(text.contains("[[repositories]]"));
    }
}
