//! Footnote, endnote and comment bodies from `word/footnotes.xml`,
//! `word/endnotes.xml` and `word/comments.xml`.

use crate::document::{DocumentNode, NoteKind};
use crate::error::ParseError;
use crate::parser;
use crate::relationships::RelationshipTable;
use std::collections::BTreeMap;

/// Note types Word uses for the separator lines it draws itself.
const SEPARATOR_TYPES: &[&str] = &["separator", "continuationSeparator", "continuationNotice"];

/// Parse every user-authored note or comment in a part, keyed by `w:id`.
pub fn parse_notes(
    xml_bytes: &[u8],
    relationships: &RelationshipTable,
    kind: NoteKind,
) -> Result<BTreeMap<String, Vec<DocumentNode>>, ParseError> {
    let tag: &[u8] = match kind {
        NoteKind::Footnote => b"footnote",
        NoteKind::Endnote => b"endnote",
        NoteKind::Comment => b"comment",
    };
    let containers = parser::parse_containers(xml_bytes, relationships, &[tag])?;

    let notes: BTreeMap<String, Vec<DocumentNode>> = containers
        .into_iter()
        .filter(|c| {
            !c.note_type
                .as_deref()
                .is_some_and(|t| SEPARATOR_TYPES.contains(&t))
        })
        .filter_map(|c| c.id.map(|id| (id, c.children)))
        .collect();

    log::debug!("parsed {} {:?} bodies", notes.len(), kind);
    Ok(notes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOOTNOTES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:footnotes xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:footnote w:type="separator" w:id="-1"><w:p><w:r><w:separator/></w:r></w:p></w:footnote>
  <w:footnote w:type="continuationSeparator" w:id="0"><w:p><w:r><w:continuationSeparator/></w:r></w:p></w:footnote>
  <w:footnote w:id="1">
    <w:p><w:r><w:rPr><w:rStyle w:val="FootnoteReference"/></w:rPr><w:footnoteRef/></w:r><w:r><w:t xml:space="preserve"> See the appendix.</w:t></w:r></w:p>
  </w:footnote>
</w:footnotes>"#;

    #[test]
    fn test_separators_skipped() {
        let notes =
            parse_notes(FOOTNOTES.as_bytes(), &RelationshipTable::new(), NoteKind::Footnote)
                .unwrap();
        assert_eq!(notes.len(), 1);
        let body = &notes["1"];
        assert_eq!(body.len(), 1);
        assert_eq!(body[0].plain_text(), " See the appendix.");
    }

    #[test]
    fn test_parse_endnotes() {
        let xml = r#"<w:endnotes xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:endnote w:id="2"><w:p><w:r><w:t>Late</w:t></w:r></w:p></w:endnote></w:endnotes>"#;
        let notes = parse_notes(xml.as_bytes(), &RelationshipTable::new(), NoteKind::Endnote)
            .unwrap();
        assert_eq!(notes["2"][0].plain_text(), "Late");
    }

    #[test]
    fn test_parse_comments() {
        let xml = r#"<w:comments xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:comment w:id="0" w:author="Reviewer" w:initials="R"><w:p><w:r><w:annotationRef/></w:r><w:r><w:t>Check this figure.</w:t></w:r></w:p></w:comment></w:comments>"#;
        let comments = parse_notes(xml.as_bytes(), &RelationshipTable::new(), NoteKind::Comment)
            .unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments["0"][0].plain_text(), "Check this figure.");
    }
}
