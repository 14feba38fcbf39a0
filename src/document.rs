//! Structural node tree produced by the parser and annotated by the resolver.

use crate::error::ResolveError;
use crate::formatting::{ParagraphProperties, RunProperties};
use crate::metadata::Metadata;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Ordered,
    Unordered,
}

/// List membership of a resolved paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFormat {
    pub kind: ListKind,
    /// Zero-based nesting level
    pub level: u8,
    /// Numbering instance the counters belong to
    pub num_id: u32,
    /// First ordinal of this level
    pub start: u32,
}

/// Final formatting of a paragraph or run once every style reference is flattened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedFormat {
    pub bold: bool,
    pub italic: bool,
    pub strike: bool,
    pub underline: bool,
    pub hidden: bool,
    pub code: bool,
    pub font_size: Option<u32>,
    /// Markdown heading depth, 1..=6
    pub heading: Option<u8>,
    pub list: Option<ListFormat>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    External(String),
    /// Bookmark inside the document
    Anchor(String),
    /// Relationship ID with no entry in the relationship table
    Unresolved(String),
    None,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    pub properties: ParagraphProperties,
    pub format: ResolvedFormat,
    pub children: Vec<DocumentNode>,
}

/// A stretch of text sharing one set of run properties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Run {
    pub properties: RunProperties,
    pub format: ResolvedFormat,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub style_id: Option<String>,
    pub children: Vec<DocumentNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    pub children: Vec<DocumentNode>,
}

/// Widest table grid Word produces; larger `gridSpan` values are clamped.
pub const MAX_GRID_COLUMNS: u32 = 63;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCell {
    /// Number of grid columns the cell covers
    pub span: u32,
    pub children: Vec<DocumentNode>,
}

impl Default for TableCell {
    fn default() -> Self {
        Self {
            span: 1,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hyperlink {
    pub target: LinkTarget,
    pub children: Vec<DocumentNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Image {
    pub rel_id: Option<String>,
    /// Package path of the media entry, e.g. `word/media/image1.png`
    pub media: Option<String>,
    /// URI of a linked (not embedded) picture
    pub external: Option<String>,
    pub alt_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteKind {
    Footnote,
    Endnote,
    /// Reviewer comment from `word/comments.xml`
    Comment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteReference {
    pub kind: NoteKind,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentNode {
    Paragraph(Paragraph),
    Run(Run),
    Table(Table),
    TableRow(TableRow),
    TableCell(TableCell),
    Hyperlink(Hyperlink),
    Image(Image),
    LineBreak,
    NoteReference(NoteReference),
    /// `w:bookmarkStart` name; the target of [`LinkTarget::Anchor`] links
    Bookmark(String),
}

impl DocumentNode {
    pub fn children(&self) -> &[DocumentNode] {
        match self {
            DocumentNode::Paragraph(p) => &p.children,
            DocumentNode::Table(t) => &t.children,
            DocumentNode::TableRow(r) => &r.children,
            DocumentNode::TableCell(c) => &c.children,
            DocumentNode::Hyperlink(h) => &h.children,
            DocumentNode::Run(_)
            | DocumentNode::Image(_)
            | DocumentNode::LineBreak
            | DocumentNode::NoteReference(_)
            | DocumentNode::Bookmark(_) => &[],
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            DocumentNode::Paragraph(_) => "paragraph",
            DocumentNode::Run(_) => "run",
            DocumentNode::Table(_) => "table",
            DocumentNode::TableRow(_) => "table row",
            DocumentNode::TableCell(_) => "table cell",
            DocumentNode::Hyperlink(_) => "hyperlink",
            DocumentNode::Image(_) => "image",
            DocumentNode::LineBreak => "line break",
            DocumentNode::NoteReference(_) => "note reference",
            DocumentNode::Bookmark(_) => "bookmark",
        }
    }

    /// Concatenated run text of this node and its descendants.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }
}

fn collect_text(node: &DocumentNode, out: &mut String) {
    match node {
        DocumentNode::Run(run) => out.push_str(&run.text),
        DocumentNode::LineBreak => out.push('\n'),
        other => {
            for child in other.children() {
                collect_text(child, out);
            }
        }
    }
}

/// Output of the parser for one document: body blocks plus notes and metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentTree {
    pub body: Vec<DocumentNode>,
    /// Footnote bodies keyed by `w:id`
    pub footnotes: BTreeMap<String, Vec<DocumentNode>>,
    pub endnotes: BTreeMap<String, Vec<DocumentNode>>,
    /// Comment bodies keyed by `w:id`
    pub comments: BTreeMap<String, Vec<DocumentNode>>,
    pub metadata: Option<Metadata>,
}

impl DocumentTree {
    pub fn new(body: Vec<DocumentNode>) -> Self {
        Self {
            body,
            ..Default::default()
        }
    }
}

/// A tree in which every paragraph and run carries its final [`ResolvedFormat`].
/// Only [`crate::resolver::resolve`] builds one.
#[derive(Debug, Clone)]
pub struct ResolvedTree {
    pub(crate) tree: DocumentTree,
    pub(crate) diagnostics: Vec<ResolveError>,
}

impl ResolvedTree {
    pub fn body(&self) -> &[DocumentNode] {
        &self.tree.body
    }

    pub fn footnotes(&self) -> &BTreeMap<String, Vec<DocumentNode>> {
        &self.tree.footnotes
    }

    pub fn endnotes(&self) -> &BTreeMap<String, Vec<DocumentNode>> {
        &self.tree.endnotes
    }

    pub fn comments(&self) -> &BTreeMap<String, Vec<DocumentNode>> {
        &self.tree.comments
    }

    /// Note or comment bodies of one kind.
    pub fn notes(&self, kind: NoteKind) -> &BTreeMap<String, Vec<DocumentNode>> {
        match kind {
            NoteKind::Footnote => &self.tree.footnotes,
            NoteKind::Endnote => &self.tree.endnotes,
            NoteKind::Comment => &self.tree.comments,
        }
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.tree.metadata.as_ref()
    }

    /// References that had no definition and were rendered unformatted.
    pub fn diagnostics(&self) -> &[ResolveError] {
        &self.diagnostics
    }
}
