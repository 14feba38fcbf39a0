/// How images are referenced in the Markdown output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageHandling {
    /// `![alt](<prefix>/<media file name>)`; the caller extracts the media files.
    Reference { prefix: String },
    /// Embed the media bytes as a base64 `data:` URI.
    Inline,
    /// Drop images entirely.
    Skip,
}

impl Default for ImageHandling {
    fn default() -> Self {
        ImageHandling::Reference {
            prefix: "images".to_string(),
        }
    }
}

/// Markdown flavour knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialect {
    /// `~~text~~` for struck-through runs
    pub strikethrough: bool,
    /// `<u>text</u>` for underlined runs
    pub html_underline: bool,
    /// `[^1]` references with definitions after the body
    pub footnotes: bool,
    /// Deepest heading the target renders; deeper headings are clamped
    pub max_heading_depth: u8,
    /// Marker for unordered list items
    pub bullet: char,
    /// Spaces per list nesting level
    pub list_indent: usize,
}

impl Dialect {
    /// GitHub Flavored Markdown.
    pub fn gfm() -> Self {
        Self {
            strikethrough: true,
            html_underline: false,
            footnotes: true,
            max_heading_depth: 6,
            bullet: '-',
            list_indent: 4,
        }
    }

    /// Plain CommonMark: no strikethrough and no footnotes.
    pub fn commonmark() -> Self {
        Self {
            strikethrough: false,
            footnotes: false,
            ..Self::gfm()
        }
    }

    pub(crate) fn heading_depth(&self, level: u8) -> u8 {
        level.clamp(1, self.max_heading_depth.clamp(1, 6))
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Self::gfm()
    }
}

/// Options for DOCX to Markdown conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    pub image_handling: ImageHandling,
    pub dialect: Dialect,
    /// Prepend a header built from the core document properties
    pub include_metadata: bool,
    /// Render footnotes and endnotes
    pub include_notes: bool,
    /// Render reviewer comments as `[^cN]` notes
    pub include_comments: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            image_handling: ImageHandling::default(),
            dialect: Dialect::default(),
            include_metadata: false,
            include_notes: true,
            include_comments: true,
        }
    }
}
