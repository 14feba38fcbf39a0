//! Single forward pass over a WordprocessingML body into [`DocumentNode`]s.
//!
//! Structural elements (`p`, `r`, `t`, `hyperlink`, `tbl`, `tr`, `tc`) are
//! validated against their parent as they open. Anything unknown is treated
//! as a transparent wrapper so content inside vendor extensions, content
//! controls and tracked insertions still lands in the tree; a short list of
//! subtrees that never carry visible body text is skipped outright.

use crate::container::ArchiveEntry;
use crate::document::{
    DocumentNode, DocumentTree, Hyperlink, Image, LinkTarget, NoteKind, NoteReference, Paragraph,
    Run, Table, TableCell, TableRow, MAX_GRID_COLUMNS,
};
use crate::error::ParseError;
use crate::formatting::{self, ParagraphProperties, RunProperties};
use crate::relationships::RelationshipTable;
use crate::xml;
use quick_xml::events::{BytesStart, Event};

/// Subtrees whose content is never rendered.
const SKIPPED: &[&[u8]] = &[
    b"sectPr",
    b"del",
    b"moveFrom",
    b"Fallback",
    b"txbxContent",
    b"instrText",
    b"delText",
    b"delInstrText",
    b"pPrChange",
    b"rPrChange",
    b"tblPrChange",
    b"tcPrChange",
    b"trPrChange",
    b"tblGrid",
    b"rt",
    b"rubyPr",
];

const HIDDEN_BOOKMARK: &str = "_GoBack";

/// Parse the document body entry.
pub fn parse(
    entry: &ArchiveEntry,
    relationships: &RelationshipTable,
) -> Result<DocumentTree, ParseError> {
    parse_document(entry.data(), relationships)
}

/// Parse a `w:document` XML buffer.
pub fn parse_document(
    xml_bytes: &[u8],
    relationships: &RelationshipTable,
) -> Result<DocumentTree, ParseError> {
    let mut containers = parse_containers(xml_bytes, relationships, &[b"body"])?;
    if containers.is_empty() {
        return Err(ParseError::Malformed {
            message: "document has no <body> element".to_string(),
            position: xml_bytes.len(),
        });
    }
    let body = containers.swap_remove(0).children;
    log::debug!("parsed {} top-level blocks", body.len());
    Ok(DocumentTree::new(body))
}

/// Block container found in a part: `w:body`, `w:footnote` or `w:endnote`.
#[derive(Debug, Clone, Default)]
pub(crate) struct Container {
    pub id: Option<String>,
    pub note_type: Option<String>,
    pub children: Vec<DocumentNode>,
}

/// Parse every element named in `container_tags` into its block children.
pub(crate) fn parse_containers(
    xml_bytes: &[u8],
    relationships: &RelationshipTable,
    container_tags: &[&[u8]],
) -> Result<Vec<Container>, ParseError> {
    let mut reader = xml::reader(xml_bytes);
    let mut parser = BodyParser::new(relationships, container_tags);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => parser.start(&e, reader.buffer_position())?,
            Ok(Event::End(_)) => parser.end(),
            Ok(Event::Text(t)) if parser.in_text() => {
                let text = t.unescape().map_err(|e| xml::malformed(e, &reader))?;
                parser.push_text(&text);
            }
            Ok(Event::CData(c)) if parser.in_text() => {
                parser.push_text(&String::from_utf8_lossy(&c));
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml::malformed(e, &reader)),
            _ => {}
        }
    }

    parser.finish(reader.buffer_position())
}

#[derive(Debug, Default)]
struct RunFrame {
    properties: RunProperties,
    text: String,
    /// Completed inline nodes in document order
    nodes: Vec<DocumentNode>,
}

impl RunFrame {
    fn flush(&mut self) {
        if self.text.is_empty() {
            return;
        }
        self.nodes.push(DocumentNode::Run(Run {
            properties: self.properties.clone(),
            text: std::mem::take(&mut self.text),
            ..Default::default()
        }));
    }
}

#[derive(Debug)]
enum Frame {
    Container(Container),
    Paragraph(Paragraph),
    ParagraphProps(ParagraphProperties),
    Run(RunFrame),
    RunProps(RunProperties),
    Text,
    Hyperlink(Hyperlink),
    Table(Table),
    TableProps(Option<String>),
    Row(TableRow),
    Cell(TableCell),
    CellProps(u32),
    Drawing(Image),
    /// Base text of a ruby annotation; its runs belong to the enclosing run
    RubyBase,
    Transparent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Container,
    Paragraph,
    ParagraphProps,
    Run,
    RunProps,
    Text,
    Hyperlink,
    Table,
    TableProps,
    Row,
    Cell,
    CellProps,
    Drawing,
    RubyBase,
}

impl FrameKind {
    fn tag(self) -> &'static str {
        match self {
            FrameKind::Container => "body",
            FrameKind::Paragraph => "p",
            FrameKind::ParagraphProps => "pPr",
            FrameKind::Run => "r",
            FrameKind::RunProps => "rPr",
            FrameKind::Text => "t",
            FrameKind::Hyperlink => "hyperlink",
            FrameKind::Table => "tbl",
            FrameKind::TableProps => "tblPr",
            FrameKind::Row => "tr",
            FrameKind::Cell => "tc",
            FrameKind::CellProps => "tcPr",
            FrameKind::Drawing => "drawing",
            FrameKind::RubyBase => "rubyBase",
        }
    }
}

impl Frame {
    fn kind(&self) -> Option<FrameKind> {
        let kind = match self {
            Frame::Container(_) => FrameKind::Container,
            Frame::Paragraph(_) => FrameKind::Paragraph,
            Frame::ParagraphProps(_) => FrameKind::ParagraphProps,
            Frame::Run(_) => FrameKind::Run,
            Frame::RunProps(_) => FrameKind::RunProps,
            Frame::Text => FrameKind::Text,
            Frame::Hyperlink(_) => FrameKind::Hyperlink,
            Frame::Table(_) => FrameKind::Table,
            Frame::TableProps(_) => FrameKind::TableProps,
            Frame::Row(_) => FrameKind::Row,
            Frame::Cell(_) => FrameKind::Cell,
            Frame::CellProps(_) => FrameKind::CellProps,
            Frame::Drawing(_) => FrameKind::Drawing,
            Frame::RubyBase => FrameKind::RubyBase,
            Frame::Transparent => return None,
        };
        Some(kind)
    }
}

struct BodyParser<'a> {
    relationships: &'a RelationshipTable,
    container_tags: &'a [&'a [u8]],
    stack: Vec<Frame>,
    skip_depth: usize,
    finished: Vec<Container>,
}

impl<'a> BodyParser<'a> {
    fn new(relationships: &'a RelationshipTable, container_tags: &'a [&'a [u8]]) -> Self {
        Self {
            relationships,
            container_tags,
            stack: Vec::new(),
            skip_depth: 0,
            finished: Vec::new(),
        }
    }

    /// Nearest frame that is not a transparent wrapper.
    fn context_mut(&mut self) -> Option<&mut Frame> {
        self.stack
            .iter_mut()
            .rev()
            .find(|f| !matches!(f, Frame::Transparent))
    }

    fn context_kind(&self) -> Option<FrameKind> {
        self.stack.iter().rev().find_map(Frame::kind)
    }

    fn in_text(&self) -> bool {
        self.skip_depth == 0 && matches!(self.stack.last(), Some(Frame::Text))
    }

    fn run_mut(&mut self) -> Option<&mut RunFrame> {
        self.stack.iter_mut().rev().find_map(|f| match f {
            Frame::Run(run) => Some(run),
            _ => None,
        })
    }

    fn push_text(&mut self, text: &str) {
        if let Some(run) = self.run_mut() {
            run.text.push_str(text);
        }
    }

    fn start(&mut self, e: &BytesStart, position: usize) -> Result<(), ParseError> {
        if self.skip_depth > 0 {
            self.skip_depth += 1;
            return Ok(());
        }
        let name = e.local_name();
        let local = name.as_ref();
        if SKIPPED.contains(&local) {
            self.skip_depth = 1;
            return Ok(());
        }

        let context = self.context_kind();
        match context {
            Some(FrameKind::ParagraphProps) => {
                if formatting::is_skipped_in_paragraph_props(local) {
                    self.skip_depth = 1;
                    return Ok(());
                }
                if let Some(Frame::ParagraphProps(props)) = self.context_mut() {
                    formatting::apply_paragraph_property(props, local, e);
                }
            }
            Some(FrameKind::RunProps) => {
                if let Some(Frame::RunProps(props)) = self.context_mut() {
                    formatting::apply_run_property(props, local, e);
                }
            }
            Some(FrameKind::TableProps) => {
                if local == b"tblStyle" {
                    if let Some(Frame::TableProps(style)) = self.context_mut() {
                        *style = xml::val(e);
                    }
                }
            }
            Some(FrameKind::CellProps) => {
                if local == b"gridSpan" {
                    if let Some(Frame::CellProps(span)) = self.context_mut() {
                        *span = xml::val_u32(e).unwrap_or(1).clamp(1, MAX_GRID_COLUMNS);
                    }
                }
            }
            Some(FrameKind::Drawing) => self.image_attribute(local, e),
            Some(FrameKind::Text) => {}
            _ => return self.structural(local, e, context, position),
        }

        self.stack.push(Frame::Transparent);
        Ok(())
    }

    fn structural(
        &mut self,
        local: &[u8],
        e: &BytesStart,
        context: Option<FrameKind>,
        position: usize,
    ) -> Result<(), ParseError> {
        use FrameKind as K;

        let frame = match local {
            tag if self.container_tags.contains(&tag) => Frame::Container(Container {
                id: xml::attr(e, b"id"),
                note_type: xml::attr(e, b"type"),
                children: Vec::new(),
            }),
            b"p" => {
                expect(local, context, &[K::Container, K::Cell], position)?;
                Frame::Paragraph(Paragraph::default())
            }
            b"pPr" if context == Some(K::Paragraph) => {
                Frame::ParagraphProps(ParagraphProperties::default())
            }
            b"r" => {
                expect(local, context, &[K::Paragraph, K::Hyperlink, K::RubyBase], position)?;
                Frame::Run(RunFrame::default())
            }
            b"rubyBase" if context == Some(K::Run) => {
                if let Some(run) = self.run_mut() {
                    run.flush();
                }
                Frame::RubyBase
            }
            b"rPr" if context == Some(K::Run) => Frame::RunProps(RunProperties::default()),
            b"t" => {
                expect(local, context, &[K::Run], position)?;
                Frame::Text
            }
            b"tab" if context == Some(K::Run) => {
                self.push_text("\t");
                Frame::Transparent
            }
            b"noBreakHyphen" if context == Some(K::Run) => {
                self.push_text("-");
                Frame::Transparent
            }
            b"br" | b"cr" if context == Some(K::Run) => {
                let page_or_column =
                    matches!(xml::attr(e, b"type").as_deref(), Some("page" | "column"));
                if !page_or_column {
                    if let Some(run) = self.run_mut() {
                        run.flush();
                        run.nodes.push(DocumentNode::LineBreak);
                    }
                }
                Frame::Transparent
            }
            b"drawing" | b"pict" | b"object" if context == Some(K::Run) => {
                if let Some(run) = self.run_mut() {
                    run.flush();
                }
                Frame::Drawing(Image::default())
            }
            b"footnoteReference" | b"endnoteReference" | b"commentReference"
                if context == Some(K::Run) =>
            {
                let kind = match local {
                    b"footnoteReference" => NoteKind::Footnote,
                    b"endnoteReference" => NoteKind::Endnote,
                    _ => NoteKind::Comment,
                };
                if let (Some(id), Some(run)) = (xml::attr(e, b"id"), self.run_mut()) {
                    run.flush();
                    run.nodes
                        .push(DocumentNode::NoteReference(NoteReference { kind, id }));
                }
                Frame::Transparent
            }
            b"bookmarkStart" => {
                // Word's "last edit position" marker is not a link target
                if let Some(name) = xml::attr(e, b"name").filter(|n| n != HIDDEN_BOOKMARK) {
                    if context == Some(K::Run) {
                        if let Some(run) = self.run_mut() {
                            run.flush();
                        }
                    }
                    self.attach(DocumentNode::Bookmark(name));
                }
                Frame::Transparent
            }
            b"hyperlink" => {
                expect(local, context, &[K::Paragraph], position)?;
                Frame::Hyperlink(Hyperlink {
                    target: self.link_target(e),
                    children: Vec::new(),
                })
            }
            b"tbl" => {
                expect(local, context, &[K::Container, K::Cell], position)?;
                Frame::Table(Table::default())
            }
            b"tblPr" if context == Some(K::Table) => Frame::TableProps(None),
            b"tr" => {
                expect(local, context, &[K::Table], position)?;
                Frame::Row(TableRow::default())
            }
            b"tc" => {
                expect(local, context, &[K::Row], position)?;
                Frame::Cell(TableCell::default())
            }
            b"tcPr" if context == Some(K::Cell) => Frame::CellProps(1),
            _ => Frame::Transparent,
        };

        self.stack.push(frame);
        Ok(())
    }

    fn end(&mut self) {
        if self.skip_depth > 0 {
            self.skip_depth -= 1;
            return;
        }
        let Some(frame) = self.stack.pop() else {
            return;
        };

        match frame {
            Frame::Container(container) => self.finished.push(container),
            Frame::Paragraph(paragraph) => self.attach(DocumentNode::Paragraph(paragraph)),
            Frame::ParagraphProps(props) => {
                if let Some(Frame::Paragraph(paragraph)) = self.context_mut() {
                    paragraph.properties = props;
                }
            }
            Frame::Run(mut run) => {
                run.flush();
                for node in run.nodes {
                    self.attach(node);
                }
            }
            Frame::RunProps(props) => {
                if let Some(Frame::Run(run)) = self.context_mut() {
                    run.properties = props;
                }
            }
            Frame::Hyperlink(link) => self.attach(DocumentNode::Hyperlink(link)),
            Frame::Table(table) => self.attach(DocumentNode::Table(table)),
            Frame::TableProps(style) => {
                if let Some(Frame::Table(table)) = self.context_mut() {
                    table.style_id = style;
                }
            }
            Frame::Row(row) => self.attach(DocumentNode::TableRow(row)),
            Frame::Cell(cell) => self.attach(DocumentNode::TableCell(cell)),
            Frame::CellProps(span) => {
                if let Some(Frame::Cell(cell)) = self.context_mut() {
                    cell.span = span;
                }
            }
            Frame::Drawing(image) => self.attach(DocumentNode::Image(image)),
            Frame::Text | Frame::RubyBase | Frame::Transparent => {}
        }
    }

    /// Append a finished node to the nearest frame that can hold it.
    fn attach(&mut self, node: DocumentNode) {
        match self.context_mut() {
            Some(Frame::Container(c)) => c.children.push(node),
            Some(Frame::Paragraph(p)) => p.children.push(node),
            Some(Frame::Hyperlink(h)) => h.children.push(node),
            Some(Frame::Table(t)) => t.children.push(node),
            Some(Frame::Row(r)) => r.children.push(node),
            Some(Frame::Cell(c)) => c.children.push(node),
            Some(Frame::Run(r)) => r.nodes.push(node),
            Some(Frame::RubyBase) => {
                if let Some(run) = self.run_mut() {
                    run.nodes.push(node);
                }
            }
            _ => log::debug!("dropping {} outside any container", node.kind_name()),
        }
    }

    fn link_target(&self, e: &BytesStart) -> LinkTarget {
        let anchor = xml::attr(e, b"anchor");
        match xml::attr(e, b"id") {
            Some(id) => match self.relationships.get(&id) {
                Some(rel) => {
                    let mut target = rel.target.clone();
                    if let Some(anchor) = anchor {
                        target.push('#');
                        target.push_str(&anchor);
                    }
                    LinkTarget::External(target)
                }
                None => LinkTarget::Unresolved(id),
            },
            None => match anchor {
                Some(anchor) => LinkTarget::Anchor(anchor),
                None => LinkTarget::None,
            },
        }
    }

    fn image_attribute(&mut self, local: &[u8], e: &BytesStart) {
        let rel_attr: &[u8] = match local {
            b"blip" => b"embed",
            b"imagedata" => b"id",
            b"docPr" | b"cNvPr" => {
                let text = xml::attr(e, b"descr")
                    .filter(|d| !d.trim().is_empty())
                    .or_else(|| xml::attr(e, b"title"));
                if let (Some(text), Some(Frame::Drawing(image))) = (text, self.context_mut()) {
                    if image.alt_text.is_empty() {
                        image.alt_text = text.trim().to_string();
                    }
                }
                return;
            }
            _ => return,
        };

        let rel_id = xml::attr(e, rel_attr);
        let title = xml::attr(e, b"title");
        let relationships = self.relationships;
        let Some(Frame::Drawing(image)) = self.context_mut() else {
            return;
        };
        if local == b"imagedata" && image.alt_text.is_empty() {
            if let Some(title) = title {
                image.alt_text = title.trim().to_string();
            }
        }
        let Some(rel_id) = rel_id else {
            return;
        };
        if image.rel_id.is_some() {
            return;
        }
        if let Some(rel) = relationships.get(&rel_id) {
            if rel.external {
                image.external = Some(rel.target.clone());
            } else {
                image.media = Some(rel.target.clone());
            }
        }
        image.rel_id = Some(rel_id);
    }

    fn finish(self, position: usize) -> Result<Vec<Container>, ParseError> {
        if let Some(open) = self.stack.iter().rev().find_map(Frame::kind) {
            return Err(ParseError::Malformed {
                message: format!("unexpected end of input inside <{}>", open.tag()),
                position,
            });
        }
        if !self.stack.is_empty() {
            return Err(ParseError::Malformed {
                message: "unexpected end of input".to_string(),
                position,
            });
        }
        Ok(self.finished)
    }
}

fn expect(
    local: &[u8],
    context: Option<FrameKind>,
    allowed: &[FrameKind],
    position: usize,
) -> Result<(), ParseError> {
    match context {
        Some(kind) if allowed.contains(&kind) => Ok(()),
        other => Err(ParseError::StructuralMismatch {
            element: xml::name_of(local),
            parent: other.map_or("document root", FrameKind::tag).to_string(),
            position,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relationships::Relationship;

    fn doc(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body>{body}<w:sectPr><w:pgSz w:w="12240"/></w:sectPr></w:body></w:document>"#
        )
    }

    fn rels() -> RelationshipTable {
        let mut table = RelationshipTable::new();
        table.insert(Relationship {
            id: "rId5".to_string(),
            rel_type: "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink"
                .to_string(),
            target: "https://example.com".to_string(),
            external: true,
        });
        table.insert(Relationship {
            id: "rId6".to_string(),
            rel_type: "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image"
                .to_string(),
            target: "word/media/image1.png".to_string(),
            external: false,
        });
        table
    }

    fn parse_body(body: &str) -> Result<Vec<DocumentNode>, ParseError> {
        parse_document(doc(body).as_bytes(), &rels()).map(|t| t.body)
    }

    #[test]
    fn test_plain_paragraph() {
        let body = parse_body(r#"<w:p><w:r><w:t xml:space="preserve">Hello </w:t></w:r><w:r><w:t>world</w:t></w:r></w:p>"#).unwrap();
        assert_eq!(body.len(), 1);
        let DocumentNode::Paragraph(p) = &body[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(p.children.len(), 2);
        assert_eq!(body[0].plain_text(), "Hello world");
    }

    #[test]
    fn test_paragraph_and_run_properties() {
        let body = parse_body(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading2"/><w:numPr><w:ilvl w:val="1"/><w:numId w:val="3"/></w:numPr><w:rPr><w:b/></w:rPr></w:pPr><w:r><w:rPr><w:b/><w:i w:val="0"/><w:rStyle w:val="Emph"/></w:rPr><w:t>x</w:t></w:r></w:p>"#,
        )
        .unwrap();
        let DocumentNode::Paragraph(p) = &body[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(p.properties.style_id.as_deref(), Some("Heading2"));
        let numbering = p.properties.numbering.unwrap();
        assert_eq!((numbering.num_id, numbering.level), (Some(3), Some(1)));
        let DocumentNode::Run(run) = &p.children[0] else {
            panic!("expected run");
        };
        assert_eq!(run.properties.bold, Some(true));
        assert_eq!(run.properties.italic, Some(false));
        assert_eq!(run.properties.style_id.as_deref(), Some("Emph"));
    }

    #[test]
    fn test_breaks_and_tabs_split_runs() {
        let body = parse_body(
            r#"<w:p><w:r><w:t>a</w:t><w:tab/><w:t>b</w:t><w:br/><w:t>c</w:t><w:br w:type="page"/></w:r></w:p>"#,
        )
        .unwrap();
        let kinds: Vec<&str> = body[0].children().iter().map(|n| n.kind_name()).collect();
        assert_eq!(kinds, vec!["run", "line break", "run"]);
        assert_eq!(body[0].plain_text(), "a\tb\nc");
    }

    #[test]
    fn test_table_nesting_preserved() {
        let body = parse_body(
            r#"<w:tbl><w:tblPr><w:tblStyle w:val="Grid"/></w:tblPr><w:tblGrid><w:gridCol/></w:tblGrid>
               <w:tr><w:tc><w:tcPr><w:gridSpan w:val="2"/></w:tcPr><w:p><w:r><w:t>A</w:t></w:r></w:p></w:tc><w:tc><w:p/></w:tc></w:tr>
               <w:tr><w:tc><w:p><w:r><w:t>B</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
        )
        .unwrap();
        let DocumentNode::Table(table) = &body[0] else {
            panic!("expected table");
        };
        assert_eq!(table.style_id.as_deref(), Some("Grid"));
        assert_eq!(table.children.len(), 2);
        assert_eq!(table.children[0].children().len(), 2);
        assert_eq!(table.children[1].children().len(), 1);
        let DocumentNode::TableCell(cell) = &table.children[0].children()[0] else {
            panic!("expected cell");
        };
        assert_eq!(cell.span, 2);
    }

    #[test]
    fn test_grid_span_clamped() {
        let body = parse_body(
            r#"<w:tbl><w:tr><w:tc><w:tcPr><w:gridSpan w:val="30000000"/></w:tcPr><w:p/></w:tc></w:tr></w:tbl>"#,
        )
        .unwrap();
        let DocumentNode::TableCell(cell) = &body[0].children()[0].children()[0] else {
            panic!("expected cell");
        };
        assert_eq!(cell.span, MAX_GRID_COLUMNS);
    }

    #[test]
    fn test_cell_directly_in_table_is_mismatch() {
        let err = parse_body(r#"<w:tbl><w:tc><w:p/></w:tc></w:tbl>"#).unwrap_err();
        assert!(
            matches!(err, ParseError::StructuralMismatch { ref element, ref parent, .. } if element == "tc" && parent == "tbl"),
            "{err:?}"
        );
    }

    #[test]
    fn test_paragraph_in_row_is_mismatch() {
        let err = parse_body(r#"<w:tbl><w:tr><w:p/></w:tr></w:tbl>"#).unwrap_err();
        assert!(matches!(err, ParseError::StructuralMismatch { .. }));
    }

    #[test]
    fn test_run_outside_paragraph_is_mismatch() {
        let err = parse_body(r#"<w:r><w:t>loose</w:t></w:r>"#).unwrap_err();
        assert!(matches!(err, ParseError::StructuralMismatch { ref element, .. } if element == "r"));
    }

    #[test]
    fn test_unknown_wrappers_are_transparent() {
        let body = parse_body(
            r#"<w:sdt><w:sdtPr/><w:sdtContent><w:p><w:ins w:id="1"><w:r><w:t>kept</w:t></w:r></w:ins><w:del w:id="2"><w:r><w:delText>gone</w:delText></w:r></w:del><x:vendor xmlns:x="urn:x"><w:r><w:t>!</w:t></w:r></x:vendor></w:p></w:sdtContent></w:sdt>"#,
        )
        .unwrap();
        assert_eq!(body.len(), 1);
        assert_eq!(body[0].plain_text(), "kept!");
    }

    #[test]
    fn test_hyperlinks() {
        let body = parse_body(
            r##"<w:p><w:hyperlink r:id="rId5"><w:r><w:t>site</w:t></w:r></w:hyperlink><w:hyperlink w:anchor="intro"><w:r><w:t>up</w:t></w:r></w:hyperlink><w:hyperlink r:id="rId99"><w:r><w:t>lost</w:t></w:r></w:hyperlink></w:p>"##,
        )
        .unwrap();
        let targets: Vec<&LinkTarget> = body[0]
            .children()
            .iter()
            .map(|n| match n {
                DocumentNode::Hyperlink(h) => &h.target,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(
            targets,
            vec![
                &LinkTarget::External("https://example.com".to_string()),
                &LinkTarget::Anchor("intro".to_string()),
                &LinkTarget::Unresolved("rId99".to_string()),
            ]
        );
    }

    #[test]
    fn test_drawing_image() {
        let body = parse_body(
            r#"<w:p><w:r><w:t>see</w:t><w:drawing><wp:inline xmlns:wp="urn:wp"><wp:docPr id="1" name="Picture 1" descr="A cat"/><a:graphic xmlns:a="urn:a"><a:graphicData><pic:pic xmlns:pic="urn:pic"><pic:blipFill><a:blip r:embed="rId6"/></pic:blipFill></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#,
        )
        .unwrap();
        let children = body[0].children();
        assert_eq!(children.len(), 2);
        let DocumentNode::Image(image) = &children[1] else {
            panic!("expected image");
        };
        assert_eq!(image.media.as_deref(), Some("word/media/image1.png"));
        assert_eq!(image.alt_text, "A cat");
        assert_eq!(image.rel_id.as_deref(), Some("rId6"));
    }

    #[test]
    fn test_vml_image_title() {
        let body = parse_body(
            r#"<w:p><w:r><w:pict><v:shape xmlns:v="urn:v"><v:imagedata r:id="rId6" o:title="Logo" xmlns:o="urn:o"/></v:shape></w:pict></w:r></w:p>"#,
        )
        .unwrap();
        let DocumentNode::Image(image) = &body[0].children()[0] else {
            panic!("expected image");
        };
        assert_eq!(image.alt_text, "Logo");
        assert_eq!(image.media.as_deref(), Some("word/media/image1.png"));
    }

    #[test]
    fn test_note_reference() {
        let body =
            parse_body(r#"<w:p><w:r><w:t>claim</w:t></w:r><w:r><w:footnoteReference w:id="2"/></w:r></w:p>"#)
                .unwrap();
        assert_eq!(
            body[0].children()[1],
            DocumentNode::NoteReference(NoteReference {
                kind: NoteKind::Footnote,
                id: "2".to_string()
            })
        );
    }

    #[test]
    fn test_ruby_keeps_base_text() {
        let body = parse_body(
            r#"<w:p><w:r><w:t>before </w:t><w:ruby><w:rubyPr><w:hps w:val="10"/></w:rubyPr><w:rt><w:r><w:t>かんじ</w:t></w:r></w:rt><w:rubyBase><w:r><w:rPr><w:b/></w:rPr><w:t>漢字</w:t></w:r></w:rubyBase></w:ruby><w:t xml:space="preserve"> after</w:t></w:r></w:p>"#,
        )
        .unwrap();
        assert_eq!(body[0].plain_text(), "before 漢字 after");
        let DocumentNode::Run(base) = &body[0].children()[1] else {
            panic!("expected run");
        };
        assert_eq!(base.properties.bold, Some(true));
    }

    #[test]
    fn test_run_inside_run_outside_ruby_is_mismatch() {
        let err = parse_body(r#"<w:p><w:r><w:r><w:t>x</w:t></w:r></w:r></w:p>"#).unwrap_err();
        assert!(matches!(err, ParseError::StructuralMismatch { ref parent, .. } if parent == "r"));
    }

    #[test]
    fn test_comment_reference() {
        let body = parse_body(
            r#"<w:p><w:commentRangeStart w:id="4"/><w:r><w:t>text</w:t></w:r><w:commentRangeEnd w:id="4"/><w:r><w:commentReference w:id="4"/></w:r></w:p>"#,
        )
        .unwrap();
        assert_eq!(
            body[0].children()[1],
            DocumentNode::NoteReference(NoteReference {
                kind: NoteKind::Comment,
                id: "4".to_string()
            })
        );
    }

    #[test]
    fn test_bookmarks() {
        let body = parse_body(
            r#"<w:bookmarkStart w:id="0" w:name="top"/><w:p><w:bookmarkStart w:id="1" w:name="intro"/><w:bookmarkStart w:id="2" w:name="_GoBack"/><w:r><w:t>Intro</w:t></w:r><w:bookmarkEnd w:id="1"/><w:bookmarkEnd w:id="2"/></w:p><w:bookmarkEnd w:id="0"/>"#,
        )
        .unwrap();
        assert_eq!(body[0], DocumentNode::Bookmark("top".to_string()));
        let kinds: Vec<&str> = body[1].children().iter().map(|n| n.kind_name()).collect();
        assert_eq!(kinds, vec!["bookmark", "run"]);
        assert_eq!(body[1].children()[0], DocumentNode::Bookmark("intro".to_string()));
    }

    #[test]
    fn test_entities_unescaped() {
        let body = parse_body(r#"<w:p><w:r><w:t>a &amp; b &lt;c&gt;</w:t></w:r></w:p>"#).unwrap();
        assert_eq!(body[0].plain_text(), "a & b <c>");
    }

    #[test]
    fn test_mismatched_end_tag_is_malformed() {
        let err = parse_document(b"<w:document><w:body><w:p></w:r></w:body></w:document>", &rels())
            .unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }));
    }

    #[test]
    fn test_truncated_document_is_malformed() {
        let err = parse_document(b"<w:document><w:body><w:p><w:r><w:t>cut", &rels()).unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }), "{err:?}");
    }

    #[test]
    fn test_missing_body_is_malformed() {
        let err = parse_document(b"<w:document/>", &rels()).unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }));
    }
}
