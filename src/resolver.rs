//! Flattens style inheritance and numbering references into a
//! [`ResolvedFormat`] on every paragraph and run.
//!
//! Run formatting is layered lowest to highest:
//! document defaults, the paragraph style chain, the character style chain,
//! then the run's direct formatting.

use crate::document::{
    DocumentNode, DocumentTree, Image, LinkTarget, ListFormat, ListKind, NoteKind, Paragraph,
    ResolvedFormat, ResolvedTree, Run,
};
use crate::error::{ReferenceKind, ResolveError};
use crate::formatting::{NumberingRef, ParagraphProperties, RunProperties};
use crate::numbering::NumberingTable;
use crate::styles::{StyleDefinition, StyleKind, StyleTable};
use log::{debug, warn};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;

/// Deepest heading produced; deeper outline levels are clamped.
const MAX_HEADING: u8 = 6;

/// Outline level Word uses for body text.
const BODY_TEXT_LEVEL: u8 = 9;

/// Resolve every style and numbering reference in `tree`.
///
/// A cycle anywhere in the style table fails the whole call. References to
/// styles, numbering instances, relationships or notes that do not exist are
/// recorded in [`ResolvedTree::diagnostics`] and the affected node falls back
/// to unformatted output.
pub fn resolve(
    tree: DocumentTree,
    styles: &StyleTable,
    numbering: &NumberingTable,
) -> Result<ResolvedTree, ResolveError> {
    let mut resolver = Resolver::new(styles, numbering, &tree);
    resolver.check_cycles()?;

    let mut tree = tree;
    for node in tree.body.iter_mut() {
        resolver.block(node)?;
    }
    for nodes in tree
        .footnotes
        .values_mut()
        .chain(tree.endnotes.values_mut())
        .chain(tree.comments.values_mut())
    {
        for node in nodes.iter_mut() {
            resolver.block(node)?;
        }
    }

    debug!(
        "resolved {} blocks with {} diagnostics",
        tree.body.len(),
        resolver.diagnostics.len()
    );
    Ok(ResolvedTree {
        tree,
        diagnostics: resolver.diagnostics,
    })
}

/// Flattened properties of one paragraph style and its ancestors.
#[derive(Debug, Default)]
struct ParagraphStyle {
    run: RunProperties,
    paragraph: ParagraphProperties,
    heading: Option<u8>,
}

struct Resolver<'a> {
    styles: &'a StyleTable,
    numbering: &'a NumberingTable,
    footnote_ids: HashSet<String>,
    endnote_ids: HashSet<String>,
    comment_ids: HashSet<String>,
    paragraph_styles: HashMap<String, Rc<ParagraphStyle>>,
    character_styles: HashMap<String, Rc<RunProperties>>,
    reported: HashSet<(ReferenceKind, String)>,
    diagnostics: Vec<ResolveError>,
}

impl<'a> Resolver<'a> {
    fn new(styles: &'a StyleTable, numbering: &'a NumberingTable, tree: &DocumentTree) -> Self {
        Self {
            styles,
            numbering,
            footnote_ids: tree.footnotes.keys().cloned().collect(),
            endnote_ids: tree.endnotes.keys().cloned().collect(),
            comment_ids: tree.comments.keys().cloned().collect(),
            paragraph_styles: HashMap::new(),
            character_styles: HashMap::new(),
            reported: HashSet::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Walk every style's ancestry once so a cycle is reported even when no
    /// paragraph uses the styles involved.
    fn check_cycles(&self) -> Result<(), ResolveError> {
        let ids: BTreeSet<&str> = self.styles.iter().map(|s| s.id.as_str()).collect();
        for id in ids {
            self.chain(id)?;
        }
        Ok(())
    }

    /// `id` followed by its `basedOn` ancestors, child first. Empty when `id`
    /// itself is undefined.
    fn chain(&self, id: &str) -> Result<Vec<&'a StyleDefinition>, ResolveError> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut chain: Vec<&'a StyleDefinition> = Vec::new();
        let mut next = Some(id.to_string());

        while let Some(current) = next {
            if !visited.insert(current.clone()) {
                return Err(ResolveError::CyclicStyle(current));
            }
            let Some(style) = self.styles.get(&current) else {
                if let Some(child) = chain.last() {
                    warn!("style '{}' is based on missing style '{current}'", child.id);
                }
                break;
            };
            chain.push(style);
            next = style.parent.clone();
        }
        Ok(chain)
    }

    fn missing(&mut self, kind: ReferenceKind, id: &str) {
        if self.reported.insert((kind, id.to_string())) {
            warn!("missing {kind} definition '{id}'");
            self.diagnostics.push(ResolveError::MissingReference {
                kind,
                id: id.to_string(),
            });
        }
    }

    fn paragraph_style(&mut self, id: &str) -> Result<Option<Rc<ParagraphStyle>>, ResolveError> {
        if let Some(cached) = self.paragraph_styles.get(id) {
            return Ok(Some(Rc::clone(cached)));
        }
        let chain = self.chain(id)?;
        if chain.is_empty() {
            return Ok(None);
        }

        let mut merged = ParagraphStyle {
            heading: heading_of_chain(&chain),
            ..Default::default()
        };
        for style in chain.iter().rev() {
            merged.run.overlay(&style.run);
            merged.paragraph.overlay(&style.paragraph);
        }
        let merged = Rc::new(merged);
        self.paragraph_styles
            .insert(id.to_string(), Rc::clone(&merged));
        Ok(Some(merged))
    }

    fn character_style(&mut self, id: &str) -> Result<Option<Rc<RunProperties>>, ResolveError> {
        if let Some(cached) = self.character_styles.get(id) {
            return Ok(Some(Rc::clone(cached)));
        }
        let chain = self.chain(id)?;
        if chain.is_empty() {
            return Ok(None);
        }

        let mut merged = RunProperties::default();
        for style in chain.iter().rev() {
            merged.overlay(&style.run);
        }
        let merged = Rc::new(merged);
        self.character_styles
            .insert(id.to_string(), Rc::clone(&merged));
        Ok(Some(merged))
    }

    fn default_paragraph_style(&mut self) -> Result<Option<Rc<ParagraphStyle>>, ResolveError> {
        let styles = self.styles;
        match styles.default_style(StyleKind::Paragraph) {
            Some(style) => self.paragraph_style(&style.id),
            None => Ok(None),
        }
    }

    fn block(&mut self, node: &mut DocumentNode) -> Result<(), ResolveError> {
        match node {
            DocumentNode::Paragraph(paragraph) => self.paragraph(paragraph),
            DocumentNode::Table(table) => {
                for child in table.children.iter_mut() {
                    self.block(child)?;
                }
                Ok(())
            }
            DocumentNode::TableRow(row) => {
                for child in row.children.iter_mut() {
                    self.block(child)?;
                }
                Ok(())
            }
            DocumentNode::TableCell(cell) => {
                for child in cell.children.iter_mut() {
                    self.block(child)?;
                }
                Ok(())
            }
            other => {
                let base = self.styles.default_run().clone();
                self.inline(other, &base)
            }
        }
    }

    fn paragraph(&mut self, paragraph: &mut Paragraph) -> Result<(), ResolveError> {
        let style = match paragraph.properties.style_id.clone() {
            Some(id) => match self.paragraph_style(&id)? {
                Some(style) => Some(style),
                None => {
                    self.missing(ReferenceKind::Style, &id);
                    self.default_paragraph_style()?
                }
            },
            None => self.default_paragraph_style()?,
        };
        let style = style.unwrap_or_default();

        let mut properties = self.styles.default_paragraph().clone();
        properties.overlay(&style.paragraph);
        properties.overlay(&paragraph.properties);

        let heading = match paragraph.properties.outline_level {
            Some(level) => heading_of_outline(level),
            None => style.heading,
        };
        let list = match heading {
            Some(_) => None,
            None => self.list_format(properties.numbering),
        };

        let mut base = self.styles.default_run().clone();
        base.overlay(&style.run);

        paragraph.format = ResolvedFormat {
            heading,
            list,
            ..format_of(&base)
        };
        for child in paragraph.children.iter_mut() {
            self.inline(child, &base)?;
        }
        Ok(())
    }

    fn list_format(&mut self, numbering: Option<NumberingRef>) -> Option<ListFormat> {
        let num_id = numbering?.num_id?;
        // numId 0 explicitly removes numbering inherited from a style
        if num_id == 0 {
            return None;
        }
        let level = numbering.and_then(|n| n.level).unwrap_or(0);
        // A list-style-backed definition carries no levels; the numbering
        // style's own numPr points at the instance that does.
        let styled = self
            .numbering
            .unlinked_style(num_id)
            .and_then(|style_id| self.styles.get(style_id))
            .and_then(|style| style.paragraph.numbering)
            .and_then(|n| n.num_id)
            .filter(|&id| id != num_id && id != 0)
            .and_then(|id| self.numbering.resolve(id, level));
        match styled.or_else(|| self.numbering.resolve(num_id, level)) {
            Some(resolved) => Some(ListFormat {
                kind: if resolved.format.is_ordered() {
                    ListKind::Ordered
                } else {
                    ListKind::Unordered
                },
                level,
                num_id,
                start: resolved.start,
            }),
            None => {
                self.missing(ReferenceKind::Numbering, &num_id.to_string());
                None
            }
        }
    }

    fn inline(&mut self, node: &mut DocumentNode, base: &RunProperties) -> Result<(), ResolveError> {
        match node {
            DocumentNode::Run(run) => self.run(run, base)?,
            DocumentNode::Hyperlink(link) => {
                if let LinkTarget::Unresolved(id) = &link.target {
                    let id = id.clone();
                    self.missing(ReferenceKind::Relationship, &id);
                }
                for child in link.children.iter_mut() {
                    self.inline(child, base)?;
                }
            }
            DocumentNode::Image(image) => self.image(image),
            DocumentNode::NoteReference(note) => {
                let known = match note.kind {
                    NoteKind::Footnote => self.footnote_ids.contains(&note.id),
                    NoteKind::Endnote => self.endnote_ids.contains(&note.id),
                    NoteKind::Comment => self.comment_ids.contains(&note.id),
                };
                if !known {
                    let id = note.id.clone();
                    self.missing(ReferenceKind::Note, &id);
                }
            }
            DocumentNode::LineBreak | DocumentNode::Bookmark(_) => {}
            // Blocks never nest inside inline content; treat them as blocks
            // if a hand-built tree puts them there.
            other => self.block(other)?,
        }
        Ok(())
    }

    fn run(&mut self, run: &mut Run, base: &RunProperties) -> Result<(), ResolveError> {
        let mut properties = base.clone();
        if let Some(id) = run.properties.style_id.clone() {
            match self.character_style(&id)? {
                Some(style) => properties.overlay(&style),
                None => self.missing(ReferenceKind::Style, &id),
            }
        }
        properties.overlay(&run.properties);
        run.format = format_of(&properties);
        Ok(())
    }

    fn image(&mut self, image: &Image) {
        if image.media.is_some() || image.external.is_some() {
            return;
        }
        if let Some(id) = image.rel_id.clone() {
            self.missing(ReferenceKind::Relationship, &id);
        }
    }
}

fn format_of(props: &RunProperties) -> ResolvedFormat {
    ResolvedFormat {
        bold: props.bold.unwrap_or(false),
        italic: props.italic.unwrap_or(false),
        strike: props.strike.unwrap_or(false),
        underline: props.underline.unwrap_or(false),
        hidden: props.hidden.unwrap_or(false),
        code: props.monospace.unwrap_or(false),
        font_size: props.font_size,
        ..Default::default()
    }
}

fn heading_of_outline(level: u8) -> Option<u8> {
    if level >= BODY_TEXT_LEVEL {
        None
    } else {
        Some((level + 1).min(MAX_HEADING))
    }
}

/// Heading depth from the nearest style in the chain that names one.
fn heading_of_chain(chain: &[&StyleDefinition]) -> Option<u8> {
    for style in chain {
        if let Some(level) = style.heading_from_name() {
            return Some(level.clamp(1, MAX_HEADING));
        }
        if let Some(level) = style.paragraph.outline_level {
            return heading_of_outline(level);
        }
    }
    None
}
