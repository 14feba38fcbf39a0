//! Style definitions from `word/styles.xml`.

use crate::error::ParseError;
use crate::formatting::{self, ParagraphProperties, RunProperties};
use crate::xml;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StyleKind {
    #[default]
    Paragraph,
    Character,
    Table,
    Numbering,
}

impl StyleKind {
    fn from_xml(value: &str) -> Self {
        match value {
            "character" => StyleKind::Character,
            "table" => StyleKind::Table,
            "numbering" => StyleKind::Numbering,
            _ => StyleKind::Paragraph,
        }
    }
}

/// A `<w:style>` element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleDefinition {
    pub id: String,
    /// UI name such as `heading 2`
    pub name: Option<String>,
    pub kind: StyleKind,
    /// `w:basedOn`
    pub parent: Option<String>,
    pub is_default: bool,
    pub run: RunProperties,
    pub paragraph: ParagraphProperties,
}

impl StyleDefinition {
    pub fn new(id: impl Into<String>, kind: StyleKind) -> Self {
        Self {
            id: id.into(),
            kind,
            ..Default::default()
        }
    }

    /// Heading depth implied by the style's name or ID (`heading 2`,
    /// `Heading2`, `Title`, `Subtitle`). Outline levels are handled by the
    /// resolver since they are inherited like any other property.
    pub fn heading_from_name(&self) -> Option<u8> {
        self.name
            .as_deref()
            .and_then(heading_level_of)
            .or_else(|| heading_level_of(&self.id))
    }
}

fn heading_level_of(name: &str) -> Option<u8> {
    let compact: String = name
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    match compact.as_str() {
        "title" => return Some(1),
        "subtitle" => return Some(2),
        _ => {}
    }
    let digits = compact.strip_prefix("heading")?;
    match digits.parse::<u8>() {
        Ok(level) if level >= 1 => Some(level),
        _ => None,
    }
}

/// All styles of a document plus the document-wide defaults.
#[derive(Debug, Clone, Default)]
pub struct StyleTable {
    styles: HashMap<String, StyleDefinition>,
    default_run: RunProperties,
    default_paragraph: ParagraphProperties,
}

#[derive(Debug, Clone, Copy)]
enum Owner {
    Defaults,
    Style,
}

#[derive(Debug, Clone, Copy)]
enum Scope {
    Other,
    Defaults,
    Style,
    RunProps(Owner),
    ParagraphProps(Owner),
}

impl StyleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(xml_bytes: &[u8]) -> Result<Self, ParseError> {
        let mut reader = xml::reader(xml_bytes);
        let mut table = Self::new();
        let mut scopes: Vec<Scope> = Vec::new();
        let mut current: Option<StyleDefinition> = None;
        let mut skip_depth = 0usize;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    if skip_depth > 0 {
                        skip_depth += 1;
                        continue;
                    }
                    let name = e.local_name();
                    let local = name.as_ref();
                    // Conditional table formatting and revision records never
                    // apply to ordinary paragraphs.
                    if matches!(
                        local,
                        b"tblStylePr" | b"rPrChange" | b"pPrChange" | b"tblPr" | b"trPr" | b"tcPr"
                    ) {
                        skip_depth = 1;
                        continue;
                    }

                    let nearest = scopes
                        .iter()
                        .rev()
                        .find(|s| !matches!(s, Scope::Other))
                        .copied();
                    let scope = match (nearest, local) {
                        (Some(Scope::RunProps(owner)), _) => {
                            let props = match owner {
                                Owner::Defaults => Some(&mut table.default_run),
                                Owner::Style => current.as_mut().map(|s| &mut s.run),
                            };
                            if let Some(props) = props {
                                formatting::apply_run_property(props, local, &e);
                            }
                            Scope::Other
                        }
                        (Some(Scope::ParagraphProps(owner)), _) => {
                            if formatting::is_skipped_in_paragraph_props(local) {
                                skip_depth = 1;
                                continue;
                            }
                            let props = match owner {
                                Owner::Defaults => Some(&mut table.default_paragraph),
                                Owner::Style => current.as_mut().map(|s| &mut s.paragraph),
                            };
                            if let Some(props) = props {
                                formatting::apply_paragraph_property(props, local, &e);
                            }
                            Scope::Other
                        }
                        (_, b"docDefaults") => Scope::Defaults,
                        (Some(Scope::Defaults), b"rPr") => Scope::RunProps(Owner::Defaults),
                        (Some(Scope::Defaults), b"pPr") => Scope::ParagraphProps(Owner::Defaults),
                        (_, b"style") => {
                            current = Some(style_from_start(&e));
                            Scope::Style
                        }
                        (Some(Scope::Style), b"name") => {
                            if let Some(style) = current.as_mut() {
                                style.name = xml::val(&e);
                            }
                            Scope::Other
                        }
                        (Some(Scope::Style), b"basedOn") => {
                            if let Some(style) = current.as_mut() {
                                style.parent = xml::val(&e).filter(|p| !p.is_empty());
                            }
                            Scope::Other
                        }
                        (Some(Scope::Style), b"rPr") => Scope::RunProps(Owner::Style),
                        (Some(Scope::Style), b"pPr") => Scope::ParagraphProps(Owner::Style),
                        _ => Scope::Other,
                    };
                    scopes.push(scope);
                }
                Ok(Event::End(_)) => {
                    if skip_depth > 0 {
                        skip_depth -= 1;
                        continue;
                    }
                    if let Some(Scope::Style) = scopes.pop() {
                        if let Some(style) = current.take().filter(|s| !s.id.is_empty()) {
                            table.insert(style);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml::malformed(e, &reader)),
                _ => {}
            }
        }

        log::debug!("parsed {} style definitions", table.len());
        Ok(table)
    }

    pub fn insert(&mut self, style: StyleDefinition) {
        self.styles.insert(style.id.clone(), style);
    }

    pub fn get(&self, id: &str) -> Option<&StyleDefinition> {
        self.styles.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StyleDefinition> {
        self.styles.values()
    }

    /// The style marked `w:default="1"` for `kind` (usually `Normal`).
    pub fn default_style(&self, kind: StyleKind) -> Option<&StyleDefinition> {
        let mut defaults: Vec<&StyleDefinition> = self
            .styles
            .values()
            .filter(|s| s.is_default && s.kind == kind)
            .collect();
        defaults.sort_by(|a, b| a.id.cmp(&b.id));
        defaults.into_iter().next()
    }

    /// Run properties from `w:docDefaults`.
    pub fn default_run(&self) -> &RunProperties {
        &self.default_run
    }

    pub fn default_paragraph(&self) -> &ParagraphProperties {
        &self.default_paragraph
    }

    pub fn set_default_run(&mut self, props: RunProperties) {
        self.default_run = props;
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

fn style_from_start(e: &BytesStart) -> StyleDefinition {
    StyleDefinition {
        id: xml::attr(e, b"styleId").unwrap_or_default(),
        kind: xml::attr(e, b"type")
            .map(|t| StyleKind::from_xml(&t))
            .unwrap_or_default(),
        is_default: matches!(xml::attr(e, b"default").as_deref(), Some("1" | "true" | "on")),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:docDefaults>
    <w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri"/><w:sz w:val="22"/></w:rPr></w:rPrDefault>
    <w:pPrDefault><w:pPr><w:spacing w:after="160"/></w:pPr></w:pPrDefault>
  </w:docDefaults>
  <w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style>
  <w:style w:type="paragraph" w:styleId="Heading2">
    <w:name w:val="heading 2"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/>
    <w:pPr><w:keepNext/><w:outlineLvl w:val="1"/></w:pPr>
    <w:rPr><w:b/><w:sz w:val="26"/></w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="ListBullet">
    <w:name w:val="List Bullet"/><w:basedOn w:val="Normal"/>
    <w:pPr><w:numPr><w:numId w:val="7"/></w:numPr></w:pPr>
  </w:style>
  <w:style w:type="character" w:styleId="Strong"><w:name w:val="Strong"/><w:rPr><w:b/></w:rPr></w:style>
  <w:style w:type="table" w:styleId="TableGrid">
    <w:name w:val="Table Grid"/>
    <w:tblPr><w:tblBorders/></w:tblPr>
    <w:tblStylePr w:type="firstRow"><w:rPr><w:i/></w:rPr></w:tblStylePr>
  </w:style>
</w:styles>"#;

    #[test]
    fn test_parse_styles() {
        let table = StyleTable::parse(STYLES.as_bytes()).unwrap();
        assert_eq!(table.len(), 5);

        let heading = table.get("Heading2").unwrap();
        assert_eq!(heading.name.as_deref(), Some("heading 2"));
        assert_eq!(heading.parent.as_deref(), Some("Normal"));
        assert_eq!(heading.paragraph.outline_level, Some(1));
        assert_eq!(heading.run.bold, Some(true));
        assert_eq!(heading.run.font_size, Some(26));

        let strong = table.get("Strong").unwrap();
        assert_eq!(strong.kind, StyleKind::Character);
        assert_eq!(strong.run.bold, Some(true));
    }

    #[test]
    fn test_conditional_table_formatting_ignored() {
        let table = StyleTable::parse(STYLES.as_bytes()).unwrap();
        let grid = table.get("TableGrid").unwrap();
        assert_eq!(grid.kind, StyleKind::Table);
        assert_eq!(grid.run.italic, None);
    }

    #[test]
    fn test_defaults() {
        let table = StyleTable::parse(STYLES.as_bytes()).unwrap();
        assert_eq!(table.default_run().font_size, Some(22));
        assert_eq!(table.default_run().monospace, Some(false));
        assert_eq!(
            table.default_style(StyleKind::Paragraph).map(|s| s.id.as_str()),
            Some("Normal")
        );
    }

    #[test]
    fn test_style_numbering() {
        let table = StyleTable::parse(STYLES.as_bytes()).unwrap();
        let numbering = table.get("ListBullet").unwrap().paragraph.numbering.unwrap();
        assert_eq!(numbering.num_id, Some(7));
        assert_eq!(numbering.level, None);
    }

    #[test]
    fn test_heading_from_name() {
        let mut style = StyleDefinition::new("Custom1", StyleKind::Paragraph);
        style.name = Some("Heading 3".to_string());
        assert_eq!(style.heading_from_name(), Some(3));
        assert_eq!(
            StyleDefinition::new("Heading4", StyleKind::Paragraph).heading_from_name(),
            Some(4)
        );
        assert_eq!(
            StyleDefinition::new("Title", StyleKind::Paragraph).heading_from_name(),
            Some(1)
        );
        assert_eq!(
            StyleDefinition::new("HeadingChar", StyleKind::Character).heading_from_name(),
            None
        );
    }

    #[test]
    fn test_malformed_styles() {
        let err = StyleTable::parse(b"<w:styles><w:style></w:styles>").unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }));
    }
}
