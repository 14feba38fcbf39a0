use crate::container::{self, Package, Part};
use crate::document::{DocumentTree, NoteKind};
use crate::error::{ContainerError, ConversionError};
use crate::markdown;
use crate::metadata::Metadata;
use crate::notes;
use crate::numbering::NumberingTable;
use crate::options::ConvertOptions;
use crate::parser;
use crate::resolver;
use crate::styles::StyleTable;
use log::debug;

/// Convert a `.docx` byte buffer to Markdown with the default options.
///
/// All-or-nothing: either the whole document converts or the first
/// unrecoverable error is returned. Nothing is shared between calls, so
/// concurrent conversions on separate threads are independent.
pub fn convert(bytes: &[u8]) -> Result<String, ConversionError> {
    convert_with_options(bytes, &ConvertOptions::default())
}

pub fn convert_with_options(
    bytes: &[u8],
    options: &ConvertOptions,
) -> Result<String, ConversionError> {
    let package = container::open(bytes)?;
    convert_package(&package, options)
}

/// Convert an already opened package. Useful when the caller also needs the
/// package's media entries.
pub fn convert_package(
    package: &Package,
    options: &ConvertOptions,
) -> Result<String, ConversionError> {
    let parsed = parse_package(package)?;
    debug!(
        "parsed {} styles, {} footnotes, {} endnotes, {} comments",
        parsed.styles.len(),
        parsed.tree.footnotes.len(),
        parsed.tree.endnotes.len(),
        parsed.tree.comments.len()
    );

    let resolved = resolver::resolve(parsed.tree, &parsed.styles, &parsed.numbering)?;
    let md = markdown::emit(&resolved, options, package);
    debug!("emitted {} bytes of markdown", md.len());
    Ok(md)
}

struct ParsedPackage {
    tree: DocumentTree,
    styles: StyleTable,
    numbering: NumberingTable,
}

fn parse_package(package: &Package) -> Result<ParsedPackage, ConversionError> {
    let body = package.document_body().ok_or_else(|| {
        ContainerError::Malformed("package has no main document part".to_string())
    })?;
    let mut tree = parser::parse(body, package.relationships())
        .map_err(|e| ConversionError::parse(body.name(), e))?;

    let styles = match package.part(Part::Styles) {
        Some(entry) => {
            StyleTable::parse(entry.data()).map_err(|e| ConversionError::parse(entry.name(), e))?
        }
        None => {
            debug!("package has no styles part");
            StyleTable::new()
        }
    };

    let numbering = match package.part(Part::Numbering) {
        Some(entry) => NumberingTable::parse(entry.data())
            .map_err(|e| ConversionError::parse(entry.name(), e))?,
        None => NumberingTable::new(),
    };

    for (part, kind) in [
        (Part::Footnotes, NoteKind::Footnote),
        (Part::Endnotes, NoteKind::Endnote),
        (Part::Comments, NoteKind::Comment),
    ] {
        let Some(entry) = package.part(part) else {
            continue;
        };
        let rels = package.relationships_for(entry.name())?;
        let bodies = notes::parse_notes(entry.data(), &rels, kind)
            .map_err(|e| ConversionError::parse(entry.name(), e))?;
        match kind {
            NoteKind::Footnote => tree.footnotes = bodies,
            NoteKind::Endnote => tree.endnotes = bodies,
            NoteKind::Comment => tree.comments = bodies,
        }
    }

    if let Some(entry) = package.part(Part::CoreProperties) {
        let metadata =
            Metadata::parse(entry.data()).map_err(|e| ConversionError::parse(entry.name(), e))?;
        if !metadata.is_empty() {
            tree.metadata = Some(metadata);
        }
    }

    Ok(ParsedPackage {
        tree,
        styles,
        numbering,
    })
}
