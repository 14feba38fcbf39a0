//! Container reader: unpacks the ZIP/OPC package of a `.docx` file and
//! exposes its entries by logical name.

use crate::error::ContainerError;
use crate::markdown::MediaSource;
use crate::relationships::{self, RelationshipTable};
use crate::xml;
use quick_xml::events::Event;
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read};
use zip::result::ZipError;
use zip::ZipArchive;

/// Largest decompressed size accepted for a single entry.
pub const MAX_ENTRY_SIZE: u64 = 256 * 1024 * 1024;

const CONTENT_TYPES: &str = "[Content_Types].xml";
const OLE_SIGNATURE: [u8; 4] = [0xD0, 0xCF, 0x11, 0xE0];

/// One decompressed file of the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    name: String,
    data: Vec<u8>,
}

impl ArchiveEntry {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Path within the package, without a leading slash.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn file_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// Logical parts a wordprocessing package may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Part {
    DocumentBody,
    Styles,
    Numbering,
    /// Relationships of the document body part
    Relationships,
    Footnotes,
    Endnotes,
    Comments,
    CoreProperties,
}

/// An opened package: every entry plus the logical-name layout.
#[derive(Debug, Clone)]
pub struct Package {
    entries: BTreeMap<String, ArchiveEntry>,
    parts: HashMap<Part, String>,
    relationships: RelationshipTable,
}

/// Open a `.docx` byte buffer. The input is never modified.
pub fn open(bytes: &[u8]) -> Result<Package, ContainerError> {
    if bytes.len() < 4 {
        return Err(ContainerError::Malformed(format!(
            "input is {} bytes, too short for an archive",
            bytes.len()
        )));
    }
    if bytes.starts_with(&OLE_SIGNATURE) {
        return Err(ContainerError::Unsupported(
            "compound binary file (legacy .doc or encrypted package)".to_string(),
        ));
    }
    if !bytes.starts_with(b"PK") {
        return Err(ContainerError::Malformed("missing ZIP signature".to_string()));
    }

    let entries = read_entries(bytes)?;
    log::debug!("container holds {} entries", entries.len());

    let Some(content_types) = find_entry(&entries, CONTENT_TYPES) else {
        return Err(ContainerError::Unsupported(format!(
            "ZIP archive without {CONTENT_TYPES} is not an Open Packaging container"
        )));
    };
    let content_types = ContentTypes::parse(content_types.data())?;

    let package_rels = match find_entry(&entries, "_rels/.rels") {
        Some(entry) => parse_rels(entry, "")?,
        None => RelationshipTable::new(),
    };

    let main_part = package_rels
        .find_by_type("officeDocument")
        .filter(|r| !r.external)
        .map(|r| r.target.clone())
        .unwrap_or_else(|| "word/document.xml".to_string());
    let Some(main_entry) = find_entry(&entries, &main_part) else {
        return Err(ContainerError::Malformed(format!(
            "main document part '{main_part}' is missing"
        )));
    };
    let main_part = main_entry.name().to_string();

    if let Some(content_type) = content_types.lookup(&main_part) {
        if !is_wordprocessing(content_type) {
            return Err(ContainerError::Unsupported(format!(
                "main part '{main_part}' has content type {content_type}"
            )));
        }
    }

    let rels_path = relationships::rels_path_for(&main_part);
    let (doc_rels, rels_name) = match find_entry(&entries, &rels_path) {
        Some(entry) => (parse_rels(entry, &main_part)?, Some(entry.name().to_string())),
        None => {
            log::debug!("{main_part} has no relationships part");
            (RelationshipTable::new(), None)
        }
    };

    let mut parts = HashMap::new();
    parts.insert(Part::DocumentBody, main_part.clone());
    if let Some(name) = rels_name {
        parts.insert(Part::Relationships, name);
    }

    let dir = relationships::parent_dir(&main_part);
    for (part, type_name, conventional) in [
        (Part::Styles, "styles", "styles.xml"),
        (Part::Numbering, "numbering", "numbering.xml"),
        (Part::Footnotes, "footnotes", "footnotes.xml"),
        (Part::Endnotes, "endnotes", "endnotes.xml"),
        (Part::Comments, "comments", "comments.xml"),
    ] {
        let by_rel = doc_rels
            .find_by_type(type_name)
            .filter(|r| !r.external)
            .map(|r| r.target.clone());
        let path = by_rel.unwrap_or_else(|| relationships::resolve_target(dir, conventional));
        if let Some(entry) = find_entry(&entries, &path) {
            parts.insert(part, entry.name().to_string());
        }
    }

    let core = package_rels
        .find_by_type("core-properties")
        .map(|r| r.target.clone())
        .unwrap_or_else(|| "docProps/core.xml".to_string());
    if let Some(entry) = find_entry(&entries, &core) {
        parts.insert(Part::CoreProperties, entry.name().to_string());
    }

    Ok(Package {
        entries,
        parts,
        relationships: doc_rels,
    })
}

impl Package {
    /// Entry for a logical part, if the package has one.
    pub fn part(&self, part: Part) -> Option<&ArchiveEntry> {
        self.parts.get(&part).and_then(|name| self.entries.get(name))
    }

    pub fn part_name(&self, part: Part) -> Option<&str> {
        self.parts.get(&part).map(String::as_str)
    }

    pub fn document_body(&self) -> Option<&ArchiveEntry> {
        self.part(Part::DocumentBody)
    }

    /// Entry by its package path; falls back to a case-insensitive match.
    pub fn entry(&self, name: &str) -> Option<&ArchiveEntry> {
        find_entry(&self.entries, name)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ArchiveEntry> {
        self.entries.values()
    }

    /// Media files stored next to the document body (`word/media/*`).
    pub fn media(&self) -> impl Iterator<Item = &ArchiveEntry> {
        let prefix = match self.part_name(Part::DocumentBody) {
            Some(body) if !relationships::parent_dir(body).is_empty() => {
                format!("{}/media/", relationships::parent_dir(body))
            }
            _ => "media/".to_string(),
        };
        self.entries
            .values()
            .filter(move |e| e.name().starts_with(&prefix))
    }

    /// Relationships of the document body.
    pub fn relationships(&self) -> &RelationshipTable {
        &self.relationships
    }

    /// Relationships of any other part; empty when the part has none.
    pub fn relationships_for(&self, part_name: &str) -> Result<RelationshipTable, ContainerError> {
        match self.entry(&relationships::rels_path_for(part_name)) {
            Some(entry) => parse_rels(entry, part_name),
            None => Ok(RelationshipTable::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MediaSource for Package {
    fn media_bytes(&self, name: &str) -> Option<&[u8]> {
        self.entry(name).map(ArchiveEntry::data)
    }
}

fn read_entries(bytes: &[u8]) -> Result<BTreeMap<String, ArchiveEntry>, ContainerError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(zip_error)?;
    let mut entries = BTreeMap::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(zip_error)?;
        if file.is_dir() {
            continue;
        }
        let name = normalize_name(file.name());
        if file.size() > MAX_ENTRY_SIZE {
            return Err(ContainerError::Malformed(format!(
                "entry '{name}' declares {} bytes, above the {MAX_ENTRY_SIZE} byte limit",
                file.size()
            )));
        }

        let mut data = Vec::with_capacity(file.size() as usize);
        (&mut file)
            .take(MAX_ENTRY_SIZE + 1)
            .read_to_end(&mut data)
            .map_err(|e| ContainerError::Malformed(format!("failed to read '{name}': {e}")))?;
        if data.len() as u64 > MAX_ENTRY_SIZE {
            return Err(ContainerError::Malformed(format!(
                "entry '{name}' exceeds the {MAX_ENTRY_SIZE} byte limit"
            )));
        }

        entries.insert(name.clone(), ArchiveEntry::new(name, data));
    }

    Ok(entries)
}

fn zip_error(err: ZipError) -> ContainerError {
    match err {
        ZipError::UnsupportedArchive(_) => ContainerError::Unsupported(err.to_string()),
        _ => ContainerError::Malformed(err.to_string()),
    }
}

fn normalize_name(name: &str) -> String {
    name.replace('\\', "/").trim_start_matches('/').to_string()
}

fn find_entry<'a>(
    entries: &'a BTreeMap<String, ArchiveEntry>,
    name: &str,
) -> Option<&'a ArchiveEntry> {
    let name = normalize_name(name);
    entries.get(&name).or_else(|| {
        // Part names are case-insensitive in OPC.
        entries
            .values()
            .find(|e| e.name().eq_ignore_ascii_case(&name))
    })
}

fn parse_rels(entry: &ArchiveEntry, source_part: &str) -> Result<RelationshipTable, ContainerError> {
    RelationshipTable::parse(entry.data(), source_part)
        .map_err(|e| ContainerError::Malformed(format!("{}: {}", entry.name(), e)))
}

fn is_wordprocessing(content_type: &str) -> bool {
    content_type.contains("wordprocessingml") || content_type.contains("ms-word")
}

/// `[Content_Types].xml`: extension defaults and per-part overrides.
#[derive(Debug, Default)]
struct ContentTypes {
    defaults: HashMap<String, String>,
    overrides: HashMap<String, String>,
}

impl ContentTypes {
    fn parse(xml_bytes: &[u8]) -> Result<Self, ContainerError> {
        let mut reader = xml::reader(xml_bytes);
        let mut types = Self::default();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => match e.local_name().as_ref() {
                    b"Default" => {
                        if let (Some(ext), Some(ct)) =
                            (xml::attr(&e, b"Extension"), xml::attr(&e, b"ContentType"))
                        {
                            types.defaults.insert(ext.to_ascii_lowercase(), ct);
                        }
                    }
                    b"Override" => {
                        if let (Some(part), Some(ct)) =
                            (xml::attr(&e, b"PartName"), xml::attr(&e, b"ContentType"))
                        {
                            types
                                .overrides
                                .insert(normalize_name(&part).to_ascii_lowercase(), ct);
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(ContainerError::Malformed(format!(
                        "{CONTENT_TYPES}: {}",
                        xml::malformed(e, &reader)
                    )))
                }
                _ => {}
            }
        }

        Ok(types)
    }

    fn lookup(&self, part: &str) -> Option<&str> {
        let key = normalize_name(part).to_ascii_lowercase();
        self.overrides
            .get(&key)
            .or_else(|| {
                let ext = key.rsplit_once('.').map(|(_, ext)| ext)?;
                // Plain `xml` defaults say nothing about the document kind.
                if ext == "xml" {
                    return None;
                }
                self.defaults.get(ext)
            })
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const WORD_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;

    const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

    const DOC_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

    fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in files {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn minimal_docx() -> Vec<u8> {
        zip_bytes(&[
            ("[Content_Types].xml", WORD_TYPES.as_bytes()),
            ("_rels/.rels", ROOT_RELS.as_bytes()),
            ("word/document.xml", b"<w:document/>"),
            ("word/_rels/document.xml.rels", DOC_RELS.as_bytes()),
            ("word/styles.xml", b"<w:styles/>"),
            ("word/media/image1.png", &[0x89, b'P', b'N', b'G']),
        ])
    }

    #[test]
    fn test_open_exposes_logical_parts() {
        let package = open(&minimal_docx()).unwrap();
        assert_eq!(package.part_name(Part::DocumentBody), Some("word/document.xml"));
        assert_eq!(package.part_name(Part::Styles), Some("word/styles.xml"));
        assert_eq!(
            package.part_name(Part::Relationships),
            Some("word/_rels/document.xml.rels")
        );
        assert!(package.part(Part::Numbering).is_none());
        assert_eq!(package.document_body().unwrap().data(), b"<w:document/>");
        assert_eq!(package.relationships().len(), 1);
    }

    #[test]
    fn test_media_entries() {
        let package = open(&minimal_docx()).unwrap();
        let media: Vec<&str> = package.media().map(|e| e.name()).collect();
        assert_eq!(media, vec!["word/media/image1.png"]);
        assert_eq!(package.media_bytes("word/media/image1.png").unwrap().len(), 4);
    }

    #[test]
    fn test_truncated_input_is_malformed() {
        let bytes = minimal_docx();
        let err = open(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, ContainerError::Malformed(_)), "{err:?}");
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(open(b"hello world"), Err(ContainerError::Malformed(_))));
        assert!(matches!(open(b""), Err(ContainerError::Malformed(_))));
    }

    #[test]
    fn test_ole_file_is_unsupported() {
        let mut bytes = OLE_SIGNATURE.to_vec();
        bytes.extend_from_slice(&[0xA1, 0xB1, 0x1A, 0xE1, 0, 0, 0, 0]);
        assert!(matches!(open(&bytes), Err(ContainerError::Unsupported(_))));
    }

    #[test]
    fn test_plain_zip_is_unsupported() {
        let bytes = zip_bytes(&[("notes.txt", b"just text")]);
        assert!(matches!(open(&bytes), Err(ContainerError::Unsupported(_))));
    }

    #[test]
    fn test_spreadsheet_package_is_unsupported() {
        let types = r#"<Types><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/></Types>"#;
        let rels = r#"<Relationships><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;
        let bytes = zip_bytes(&[
            ("[Content_Types].xml", types.as_bytes()),
            ("_rels/.rels", rels.as_bytes()),
            ("xl/workbook.xml", b"<workbook/>"),
        ]);
        assert!(matches!(open(&bytes), Err(ContainerError::Unsupported(_))));
    }

    #[test]
    fn test_missing_body_is_malformed() {
        let bytes = zip_bytes(&[
            ("[Content_Types].xml", WORD_TYPES.as_bytes()),
            ("_rels/.rels", ROOT_RELS.as_bytes()),
        ]);
        assert!(matches!(open(&bytes), Err(ContainerError::Malformed(_))));
    }

    #[test]
    fn test_missing_root_rels_falls_back_to_conventional_path() {
        let bytes = zip_bytes(&[
            ("[Content_Types].xml", WORD_TYPES.as_bytes()),
            ("word/document.xml", b"<w:document/>"),
        ]);
        let package = open(&bytes).unwrap();
        assert_eq!(package.part_name(Part::DocumentBody), Some("word/document.xml"));
        assert!(package.relationships().is_empty());
    }

    #[test]
    fn test_input_bytes_untouched() {
        let bytes = minimal_docx();
        let copy = bytes.clone();
        let _ = open(&bytes).unwrap();
        assert_eq!(bytes, copy);
    }
}
