use crate::error::ParseError;
use crate::markdown::{escape_closing_hashes, escape_text};
use crate::options::Dialect;
use crate::xml;
use quick_xml::events::Event;

/// Core document properties from `docProps/core.xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub subject: Option<String>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
}

impl Metadata {
    pub fn parse(xml_bytes: &[u8]) -> Result<Self, ParseError> {
        let mut reader = xml::reader(xml_bytes);
        let mut metadata = Metadata::default();
        let mut field: Option<Vec<u8>> = None;
        let mut text = String::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    field = Some(e.local_name().as_ref().to_vec());
                    text.clear();
                }
                Ok(Event::Text(t)) if field.is_some() => {
                    text.push_str(&t.unescape().map_err(|e| xml::malformed(e, &reader))?);
                }
                Ok(Event::End(_)) => {
                    if let Some(name) = field.take() {
                        metadata.set(&name, text.trim());
                    }
                    text.clear();
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml::malformed(e, &reader)),
                _ => {}
            }
        }

        Ok(metadata)
    }

    fn set(&mut self, field: &[u8], value: &str) {
        if value.is_empty() {
            return;
        }
        let value = value.to_string();
        match field {
            b"title" => self.title = Some(value),
            b"creator" => self.authors.push(value),
            b"subject" => self.subject = Some(value),
            b"language" => self.language = Some(value),
            b"description" => self.description = Some(value),
            b"keywords" => self.keywords = Some(value),
            _ => {}
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Metadata::default()
    }
}

/// Markdown header block for the document properties, or an empty string.
pub fn format_metadata(metadata: &Metadata, dialect: &Dialect) -> String {
    let escape = |value: &str| escape_text(value, dialect);
    let mut lines = Vec::new();

    if let Some(title) = &metadata.title {
        lines.push(format!("# {}", escape_closing_hashes(escape(title))));
        lines.push(String::new());
    }

    if !metadata.authors.is_empty() {
        lines.push(format!("**Author:** {}", escape(&metadata.authors.join(", "))));
    }

    if let Some(subject) = &metadata.subject {
        lines.push(format!("**Subject:** {}", escape(subject)));
    }

    if let Some(keywords) = &metadata.keywords {
        lines.push(format!("**Keywords:** {}", escape(keywords)));
    }

    if let Some(language) = &metadata.language {
        lines.push(format!("**Language:** {}", escape(language)));
    }

    if let Some(description) = &metadata.description {
        lines.push(String::new());
        lines.push(format!("> {}", escape(description)));
    }

    if !lines.is_empty() {
        lines.push(String::new());
        lines.push("---".to_string());
    }

    lines.join("\n")
}
