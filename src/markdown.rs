//! Serializes a [`ResolvedTree`] to Markdown.

use crate::document::{
    DocumentNode, Hyperlink, Image, LinkTarget, ListFormat, ListKind, NoteKind, NoteReference,
    Paragraph, ResolvedFormat, ResolvedTree, Table, MAX_GRID_COLUMNS,
};
use crate::metadata::format_metadata;
use crate::options::{ConvertOptions, Dialect, ImageHandling};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::HashMap;

/// Access to embedded media for [`ImageHandling::Inline`].
pub trait MediaSource {
    /// Bytes of the package entry `name` (e.g. `word/media/image1.png`).
    fn media_bytes(&self, name: &str) -> Option<&[u8]>;
}

/// A media source with nothing in it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMedia;

impl MediaSource for NoMedia {
    fn media_bytes(&self, _name: &str) -> Option<&[u8]> {
        None
    }
}

/// Render `tree` as Markdown. Never fails: anything the resolver accepted has
/// a rendering, at worst as plain paragraph text.
pub fn emit(tree: &ResolvedTree, options: &ConvertOptions, media: &dyn MediaSource) -> String {
    let mut ctx = EmitContext {
        tree,
        options,
        media,
        list_counters: HashMap::new(),
        notes: Vec::new(),
        note_counts: HashMap::new(),
    };
    let mut blocks = Vec::new();

    if options.include_metadata {
        if let Some(header) = tree
            .metadata()
            .map(|m| format_metadata(m, &options.dialect))
        {
            if !header.is_empty() {
                blocks.push(Block::plain(header));
            }
        }
    }

    for node in tree.body() {
        ctx.block(node, &mut blocks);
    }

    let definitions = ctx.note_definitions();
    if !definitions.is_empty() {
        blocks.push(Block::plain("---".to_string()));
        blocks.extend(definitions);
    }

    clean_markdown(&join_blocks(&blocks))
}

struct Block {
    text: String,
    list_item: bool,
}

impl Block {
    fn plain(text: String) -> Self {
        Self {
            text,
            list_item: false,
        }
    }
}

/// Inline formatting that survives into the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Emphasis {
    bold: bool,
    italic: bool,
    strike: bool,
    underline: bool,
    code: bool,
}

impl Emphasis {
    fn of(format: &ResolvedFormat, dialect: &Dialect) -> Self {
        Self {
            bold: format.bold,
            italic: format.italic,
            strike: format.strike && dialect.strikethrough,
            underline: format.underline && dialect.html_underline,
            code: format.code,
        }
    }
}

enum Piece {
    /// Literal document text, escaped at render time
    Text(Emphasis, String),
    /// Already-rendered Markdown
    Markup(String),
    Break,
}

struct EmitContext<'a> {
    tree: &'a ResolvedTree,
    options: &'a ConvertOptions,
    media: &'a dyn MediaSource,
    /// (num_id, level) -> last ordinal emitted
    list_counters: HashMap<(u32, u8), u32>,
    /// Referenced notes in order of first reference, with their labels
    notes: Vec<(NoteKind, String, String)>,
    note_counts: HashMap<NoteKind, usize>,
}

impl<'a> EmitContext<'a> {
    fn dialect(&self) -> &'a Dialect {
        &self.options.dialect
    }

    fn block(&mut self, node: &DocumentNode, out: &mut Vec<Block>) {
        match node {
            DocumentNode::Paragraph(para) => self.paragraph(para, out),
            DocumentNode::Table(table) => self.table(table, out),
            DocumentNode::TableRow(_) | DocumentNode::TableCell(_) => {
                for child in node.children() {
                    self.block(child, out);
                }
            }
            inline => {
                let mut pieces = Vec::new();
                self.inline_pieces(std::slice::from_ref(inline), false, &mut pieces);
                let lines = self.render_lines(pieces);
                if !lines.is_empty() {
                    out.push(Block::plain(paragraph_text(&lines)));
                }
            }
        }
    }

    fn paragraph(&mut self, para: &Paragraph, out: &mut Vec<Block>) {
        let heading = para.format.heading;
        let mut pieces = Vec::new();
        self.inline_pieces(&para.children, heading.is_some(), &mut pieces);
        let lines = self.render_lines(pieces);

        // Empty paragraphs are spacing in Word, not content
        if lines.is_empty() {
            return;
        }

        if let Some(level) = heading {
            let depth = self.dialect().heading_depth(level);
            let text = escape_closing_hashes(lines.join(" "));
            out.push(Block::plain(format!(
                "{} {}",
                "#".repeat(depth as usize),
                text
            )));
            return;
        }

        if let Some(list) = &para.format.list {
            let indent = " ".repeat(list.level as usize * self.dialect().list_indent);
            let marker = match list.kind {
                ListKind::Ordered => format!("{}.", self.next_ordinal(list)),
                ListKind::Unordered => {
                    self.reset_deeper_levels(list);
                    self.dialect().bullet.to_string()
                }
            };
            let continuation = " ".repeat(indent.len() + marker.len() + 1);
            let lines: Vec<String> = lines.iter().map(|l| escape_line_start(l)).collect();
            out.push(Block {
                text: format!(
                    "{indent}{marker} {}",
                    lines.join(&format!("\\\n{continuation}"))
                ),
                list_item: true,
            });
            return;
        }

        out.push(Block::plain(paragraph_text(&lines)));
    }

    fn reset_deeper_levels(&mut self, list: &ListFormat) {
        self.list_counters
            .retain(|&(num_id, level), _| num_id != list.num_id || level <= list.level);
    }

    fn next_ordinal(&mut self, list: &ListFormat) -> u32 {
        self.reset_deeper_levels(list);
        match self.list_counters.get_mut(&(list.num_id, list.level)) {
            Some(counter) => {
                *counter += 1;
                *counter
            }
            None => {
                self.list_counters
                    .insert((list.num_id, list.level), list.start);
                list.start
            }
        }
    }

    fn table(&mut self, table: &Table, out: &mut Vec<Block>) {
        let mut rows: Vec<Vec<String>> = Vec::new();

        for row in &table.children {
            let DocumentNode::TableRow(row) = row else {
                continue;
            };
            let mut cells: Vec<String> = Vec::new();
            for cell in &row.children {
                if let DocumentNode::TableCell(cell) = cell {
                    let mut parts = Vec::new();
                    self.cell_parts(&cell.children, &mut parts);
                    cells.push(parts.join("<br>").replace('|', "\\|"));
                    // Merged cells keep the grid aligned
                    for _ in 1..cell.span.min(MAX_GRID_COLUMNS) {
                        cells.push(String::new());
                    }
                }
            }
            if !cells.is_empty() {
                rows.push(cells);
            }
        }

        if rows.is_empty() {
            return;
        }

        let col_count = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut lines = Vec::with_capacity(rows.len() + 1);

        for (i, row) in rows.iter().enumerate() {
            let mut line = String::from("|");
            for j in 0..col_count {
                let cell = row.get(j).map(String::as_str).unwrap_or("");
                line.push(' ');
                line.push_str(cell);
                line.push_str(" |");
            }
            lines.push(line);

            // Header separator after the first row
            if i == 0 {
                lines.push(format!("|{}", " --- |".repeat(col_count)));
            }
        }

        out.push(Block::plain(lines.join("\n")));
    }

    /// Text of each paragraph inside a cell; nested tables are flattened.
    fn cell_parts(&mut self, nodes: &[DocumentNode], parts: &mut Vec<String>) {
        for node in nodes {
            let mut pieces = Vec::new();
            match node {
                DocumentNode::Paragraph(para) => {
                    self.inline_pieces(&para.children, para.format.heading.is_some(), &mut pieces)
                }
                DocumentNode::Table(_) | DocumentNode::TableRow(_) | DocumentNode::TableCell(_) => {
                    self.cell_parts(node.children(), parts);
                    continue;
                }
                inline => self.inline_pieces(std::slice::from_ref(inline), false, &mut pieces),
            }
            let text = self.render_lines(pieces).join("<br>");
            if !text.is_empty() {
                parts.push(text);
            }
        }
    }

    fn inline_pieces(&mut self, nodes: &[DocumentNode], plain: bool, pieces: &mut Vec<Piece>) {
        for node in nodes {
            match node {
                DocumentNode::Run(run) => {
                    if run.format.hidden || run.text.is_empty() {
                        continue;
                    }
                    let emphasis = if plain {
                        Emphasis::default()
                    } else {
                        Emphasis::of(&run.format, self.dialect())
                    };
                    pieces.push(Piece::Text(emphasis, run.text.clone()));
                }
                DocumentNode::LineBreak => pieces.push(Piece::Break),
                DocumentNode::Hyperlink(link) => self.hyperlink(link, plain, pieces),
                DocumentNode::Image(image) => self.image(image, pieces),
                DocumentNode::NoteReference(note) => {
                    if let Some(label) = self.note_label(note) {
                        pieces.push(Piece::Markup(format!("[^{label}]")));
                    }
                }
                DocumentNode::Bookmark(name) => pieces.push(Piece::Markup(format!(
                    "<a id=\"{}\"></a>",
                    escape_html_attr(name)
                ))),
                DocumentNode::Paragraph(_)
                | DocumentNode::Table(_)
                | DocumentNode::TableRow(_)
                | DocumentNode::TableCell(_) => self.inline_pieces(node.children(), plain, pieces),
            }
        }
    }

    fn hyperlink(&mut self, link: &Hyperlink, plain: bool, pieces: &mut Vec<Piece>) {
        let mut inner = Vec::new();
        self.inline_pieces(&link.children, plain, &mut inner);

        let text = match &link.target {
            LinkTarget::External(_) | LinkTarget::Anchor(_) => self.render_lines(inner).join(" "),
            // Nothing to point at; keep the text and its formatting
            LinkTarget::Unresolved(_) | LinkTarget::None => {
                pieces.extend(inner);
                return;
            }
        };

        let markup = match &link.target {
            LinkTarget::External(url) if text.is_empty() => {
                if url.contains(':') && !url.contains(char::is_whitespace) && !url.contains(['<', '>']) {
                    format!("<{url}>")
                } else {
                    format!("[{}]({})", escape_text(url, self.dialect()), link_destination(url))
                }
            }
            LinkTarget::External(url) => format!("[{text}]({})", link_destination(url)),
            LinkTarget::Anchor(anchor) => {
                let text = if text.is_empty() {
                    escape_text(anchor, self.dialect())
                } else {
                    text
                };
                format!("[{text}](#{})", link_destination(anchor))
            }
            LinkTarget::Unresolved(_) | LinkTarget::None => text,
        };
        pieces.push(Piece::Markup(markup));
    }

    fn image(&self, image: &Image, pieces: &mut Vec<Piece>) {
        let prefix = match &self.options.image_handling {
            ImageHandling::Skip => return,
            ImageHandling::Reference { prefix } => Some(prefix.trim_end_matches('/')),
            ImageHandling::Inline => None,
        };
        let alt = escape_alt(&image.alt_text);

        if let Some(url) = &image.external {
            pieces.push(Piece::Markup(format!("![{alt}]({})", link_destination(url))));
            return;
        }

        let Some(path) = &image.media else {
            // Dangling relationship: the alt text is all that is left
            if !image.alt_text.is_empty() {
                pieces.push(Piece::Text(Emphasis::default(), image.alt_text.clone()));
            }
            return;
        };

        let file_name = path.rsplit('/').next().unwrap_or(path);
        let destination = match prefix {
            Some("") => file_name.to_string(),
            Some(prefix) => format!("{prefix}/{file_name}"),
            None => match self.media.media_bytes(path) {
                Some(bytes) => format!("data:{};base64,{}", mime_type(path), STANDARD.encode(bytes)),
                None => {
                    log::warn!("media entry '{path}' not found; using alt text");
                    if !image.alt_text.is_empty() {
                        pieces.push(Piece::Text(Emphasis::default(), image.alt_text.clone()));
                    }
                    return;
                }
            },
        };
        pieces.push(Piece::Markup(format!(
            "![{alt}]({})",
            link_destination(&destination)
        )));
    }

    fn note_label(&mut self, note: &NoteReference) -> Option<String> {
        let enabled = match note.kind {
            NoteKind::Footnote | NoteKind::Endnote => self.options.include_notes,
            NoteKind::Comment => self.options.include_comments,
        };
        if !enabled || !self.dialect().footnotes {
            return None;
        }
        if let Some((_, _, label)) = self
            .notes
            .iter()
            .find(|(kind, id, _)| *kind == note.kind && *id == note.id)
        {
            return Some(label.clone());
        }
        if !self.tree.notes(note.kind).contains_key(&note.id) {
            return None;
        }

        let count = self.note_counts.entry(note.kind).or_insert(0);
        *count += 1;
        let label = match note.kind {
            NoteKind::Footnote => count.to_string(),
            NoteKind::Endnote => format!("en{count}"),
            NoteKind::Comment => format!("c{count}"),
        };
        self.notes
            .push((note.kind, note.id.clone(), label.clone()));
        Some(label)
    }

    /// `[^label]: …` blocks for every referenced note. Notes may reference
    /// further notes, so the list can grow while it is walked.
    fn note_definitions(&mut self) -> Vec<Block> {
        let tree = self.tree;
        let mut definitions = Vec::new();
        let mut index = 0;

        while index < self.notes.len() {
            let (kind, id, label) = self.notes[index].clone();
            index += 1;
            let Some(body) = tree.notes(kind).get(&id) else {
                continue;
            };

            let mut blocks = Vec::new();
            for node in body {
                self.block(node, &mut blocks);
            }
            let body_text = join_blocks(&blocks);

            let mut text = format!("[^{label}]:");
            for (i, line) in body_text.lines().enumerate() {
                if i == 0 {
                    text.push(' ');
                } else {
                    text.push('\n');
                    if !line.is_empty() {
                        text.push_str("    ");
                    }
                }
                text.push_str(line);
            }
            definitions.push(Block::plain(text));
        }

        definitions
    }

    /// Render pieces split at line breaks; blank lines are dropped.
    fn render_lines(&self, pieces: Vec<Piece>) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current = Vec::new();
        for piece in pieces {
            match piece {
                Piece::Break => lines.push(self.render_line(std::mem::take(&mut current))),
                other => current.push(other),
            }
        }
        lines.push(self.render_line(current));

        lines
            .into_iter()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect()
    }

    fn render_line(&self, pieces: Vec<Piece>) -> String {
        // Coalesce adjacent text with identical formatting so markers are not
        // closed and immediately reopened.
        let mut merged: Vec<Piece> = Vec::new();
        for piece in pieces {
            if let Piece::Text(emphasis, more) = &piece {
                if let Some(Piece::Text(prev, text)) = merged.last_mut() {
                    if *prev == *emphasis {
                        text.push_str(more);
                        continue;
                    }
                }
            }
            merged.push(piece);
        }

        let mut line = String::new();
        for piece in merged {
            match piece {
                Piece::Text(emphasis, text) => {
                    line.push_str(&format_text(&text, emphasis, self.dialect()))
                }
                Piece::Markup(markup) => line.push_str(&markup),
                Piece::Break => {}
            }
        }
        line
    }
}

/// Paragraph lines joined with hard breaks.
fn paragraph_text(lines: &[String]) -> String {
    lines
        .iter()
        .map(|line| escape_line_start(line))
        .collect::<Vec<_>>()
        .join("\\\n")
}

/// Wrap text in Markdown markers for its formatting. Markers never enclose
/// leading or trailing whitespace.
fn format_text(text: &str, emphasis: Emphasis, dialect: &Dialect) -> String {
    let text = text.replace(['\n', '\r'], " ");
    let core = text.trim();
    if core.is_empty() {
        return text;
    }
    let start = text.len() - text.trim_start().len();
    let lead = &text[..start];
    let trail = &text[start + core.len()..];

    let mut result = if emphasis.code {
        code_span(core)
    } else {
        escape_text(core, dialect)
    };

    if emphasis.bold && emphasis.italic {
        result = format!("***{}***", result);
    } else if emphasis.bold {
        result = format!("**{}**", result);
    } else if emphasis.italic {
        result = format!("*{}*", result);
    }
    if emphasis.strike {
        result = format!("~~{}~~", result);
    }
    if emphasis.underline {
        result = format!("<u>{}</u>", result);
    }

    format!("{lead}{result}{trail}")
}

fn code_span(text: &str) -> String {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    let fence = "`".repeat(longest + 1);
    if text.starts_with('`') || text.ends_with('`') {
        format!("{fence} {text} {fence}")
    } else {
        format!("{fence}{text}{fence}")
    }
}

/// Backslash-escape characters that would otherwise start inline markup.
pub(crate) fn escape_text(text: &str, dialect: &Dialect) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        match c {
            '\\' | '`' | '*' | '_' | '[' | ']' | '<' => {
                out.push('\\');
                out.push(c);
            }
            '~' if dialect.strikethrough => out.push_str("\\~"),
            '&' if starts_entity(&text[i + 1..]) => out.push_str("\\&"),
            _ => out.push(c),
        }
    }
    out
}

/// Whether the text after an `&` would be read as `&name;` or `&#123;`.
fn starts_entity(rest: &str) -> bool {
    let body = rest.strip_prefix('#').unwrap_or(rest);
    let len = body.bytes().take_while(u8::is_ascii_alphanumeric).count();
    len > 0 && body[len..].starts_with(';')
}

fn escape_alt(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '[' | ']' => {
                out.push('\\');
                out.push(c);
            }
            '\n' | '\r' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a line whose first characters would be read as a block construct
/// (ATX heading, quote, list item, setext underline).
fn escape_line_start(line: &str) -> String {
    let Some(first) = line.chars().next() else {
        return String::new();
    };
    match first {
        '#' | '>' => format!("\\{line}"),
        '-' | '+' | '=' => {
            let rest = &line[1..];
            let marker_like = rest.is_empty()
                || rest.starts_with([' ', '\t'])
                || line.chars().all(|c| c == first || c == ' ');
            if marker_like {
                format!("\\{line}")
            } else {
                line.to_string()
            }
        }
        '0'..='9' => {
            let digits = line.bytes().take_while(u8::is_ascii_digit).count();
            let rest = &line[digits..];
            let marker_like = digits <= 9
                && (rest.starts_with(". ")
                    || rest.starts_with(") ")
                    || rest == "."
                    || rest == ")");
            if marker_like {
                format!("{}\\{}", &line[..digits], rest)
            } else {
                line.to_string()
            }
        }
        _ => line.to_string(),
    }
}

/// A trailing `#` run would be read as an ATX closing sequence.
pub(crate) fn escape_closing_hashes(text: String) -> String {
    match text.strip_suffix('#') {
        Some(head) => format!("{head}\\#"),
        None => text,
    }
}

fn escape_html_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn link_destination(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for c in url.chars() {
        match c {
            ' ' => out.push_str("%20"),
            '(' => out.push_str("%28"),
            ')' => out.push_str("%29"),
            '<' => out.push_str("%3C"),
            '>' => out.push_str("%3E"),
            _ => out.push(c),
        }
    }
    out
}

fn mime_type(path: &str) -> &'static str {
    let ext = path
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "emf" => "image/emf",
        "wmf" => "image/wmf",
        _ => "application/octet-stream",
    }
}

/// One blank line between blocks; consecutive list items stay tight.
fn join_blocks(blocks: &[Block]) -> String {
    let mut out = String::new();
    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            if block.list_item && blocks[i - 1].list_item {
                out.push('\n');
            } else {
                out.push_str("\n\n");
            }
        }
        out.push_str(&block.text);
    }
    out
}

fn clean_markdown(md: &str) -> String {
    // Trim trailing whitespace per line
    let mut result = md
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n");

    // Collapse 3+ consecutive newlines to 2
    while result.contains("\n\n\n") {
        result = result.replace("\n\n\n", "\n\n");
    }

    // Leading newlines only; an indented first list item keeps its spaces
    let trimmed = result.trim_start_matches('\n').trim_end();
    if trimmed.trim().is_empty() {
        String::new()
    } else {
        format!("{trimmed}\n")
    }
}
