//! Direct formatting records read from `w:pPr` / `w:rPr`, shared by the
//! body parser and the styles parser.

use crate::xml;
use quick_xml::events::BytesStart;

const MONOSPACE_FONTS: &[&str] = &[
    "courier",
    "courier new",
    "consolas",
    "menlo",
    "monaco",
    "lucida console",
    "source code pro",
    "dejavu sans mono",
    "liberation mono",
    "cascadia code",
    "cascadia mono",
];

/// Run-level properties; `None` means "not specified at this layer".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunProperties {
    /// Character style (`w:rStyle`); only meaningful on direct formatting
    pub style_id: Option<String>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub strike: Option<bool>,
    pub underline: Option<bool>,
    pub hidden: Option<bool>,
    pub monospace: Option<bool>,
    /// Size in half-points
    pub font_size: Option<u32>,
}

impl RunProperties {
    /// Apply every attribute `top` specifies over `self`.
    pub fn overlay(&mut self, top: &RunProperties) {
        fn take<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }
        take(&mut self.bold, &top.bold);
        take(&mut self.italic, &top.italic);
        take(&mut self.strike, &top.strike);
        take(&mut self.underline, &top.underline);
        take(&mut self.hidden, &top.hidden);
        take(&mut self.monospace, &top.monospace);
        take(&mut self.font_size, &top.font_size);
    }
}

/// `w:numPr`; either half may be inherited from a style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NumberingRef {
    pub num_id: Option<u32>,
    pub level: Option<u8>,
}

impl NumberingRef {
    pub fn overlay(&mut self, top: &NumberingRef) {
        if top.num_id.is_some() {
            self.num_id = top.num_id;
        }
        if top.level.is_some() {
            self.level = top.level;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParagraphProperties {
    pub style_id: Option<String>,
    /// Zero-based outline level; 9 marks body text
    pub outline_level: Option<u8>,
    pub numbering: Option<NumberingRef>,
}

impl ParagraphProperties {
    pub fn overlay(&mut self, top: &ParagraphProperties) {
        if top.outline_level.is_some() {
            self.outline_level = top.outline_level;
        }
        if let Some(numbering) = &top.numbering {
            self.numbering
                .get_or_insert_with(NumberingRef::default)
                .overlay(numbering);
        }
    }
}

/// Update `props` from one child element of `w:rPr`.
pub(crate) fn apply_run_property(props: &mut RunProperties, local: &[u8], e: &BytesStart) {
    match local {
        b"rStyle" => props.style_id = xml::val(e),
        b"b" => props.bold = Some(xml::toggle(e)),
        b"i" => props.italic = Some(xml::toggle(e)),
        b"strike" => props.strike = Some(xml::toggle(e)),
        b"dstrike" => {
            let on = xml::toggle(e);
            if on || props.strike.is_none() {
                props.strike = Some(on);
            }
        }
        b"u" => props.underline = Some(xml::toggle(e)),
        b"vanish" => props.hidden = Some(xml::toggle(e)),
        b"rFonts" => {
            if let Some(font) = xml::attr(e, b"ascii").or_else(|| xml::attr(e, b"hAnsi")) {
                props.monospace = Some(is_monospace(&font));
            }
        }
        b"sz" => {
            if let Some(size) = xml::val_u32(e) {
                props.font_size = Some(size);
            }
        }
        _ => {}
    }
}

/// Update `props` from one element inside `w:pPr` (including `w:numPr` children).
pub(crate) fn apply_paragraph_property(
    props: &mut ParagraphProperties,
    local: &[u8],
    e: &BytesStart,
) {
    match local {
        b"pStyle" => props.style_id = xml::val(e),
        b"outlineLvl" => {
            if let Some(level) = xml::val_u32(e) {
                props.outline_level = Some(level.min(9) as u8);
            }
        }
        b"ilvl" => {
            if let Some(level) = xml::val_u32(e) {
                props
                    .numbering
                    .get_or_insert_with(NumberingRef::default)
                    .level = Some(level.min(8) as u8);
            }
        }
        b"numId" => {
            if let Some(num_id) = xml::val_u32(e) {
                props
                    .numbering
                    .get_or_insert_with(NumberingRef::default)
                    .num_id = Some(num_id);
            }
        }
        _ => {}
    }
}

/// Children of `w:pPr` whose subtrees must not leak into the paragraph.
pub(crate) fn is_skipped_in_paragraph_props(local: &[u8]) -> bool {
    matches!(local, b"rPr" | b"pPrChange" | b"sectPr" | b"tabs")
}

pub(crate) fn is_monospace(font: &str) -> bool {
    let font = font.trim().to_ascii_lowercase();
    MONOSPACE_FONTS.contains(&font.as_str()) || font.ends_with(" mono")
}
