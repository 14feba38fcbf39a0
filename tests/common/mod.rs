//! In-memory `.docx` packages for the integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;

const W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

pub struct DocxBuilder {
    body: String,
    styles: Option<String>,
    numbering: Option<String>,
    footnotes: Option<String>,
    comments: Option<String>,
    title: Option<String>,
    /// (id, type suffix, target, external)
    relationships: Vec<(String, String, String, bool)>,
    media: Vec<(String, Vec<u8>)>,
}

impl DocxBuilder {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            styles: None,
            numbering: None,
            footnotes: None,
            comments: None,
            title: None,
            relationships: Vec::new(),
            media: Vec::new(),
        }
    }

    /// Children of `<w:styles>`.
    pub fn styles(mut self, xml: &str) -> Self {
        self.styles = Some(xml.to_string());
        self
    }

    /// Children of `<w:numbering>`.
    pub fn numbering(mut self, xml: &str) -> Self {
        self.numbering = Some(xml.to_string());
        self
    }

    /// Children of `<w:footnotes>`.
    pub fn footnotes(mut self, xml: &str) -> Self {
        self.footnotes = Some(xml.to_string());
        self
    }

    /// Children of `<w:comments>`.
    pub fn comments(mut self, xml: &str) -> Self {
        self.comments = Some(xml.to_string());
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn hyperlink(mut self, id: &str, url: &str) -> Self {
        self.relationships
            .push((id.to_string(), "hyperlink".to_string(), url.to_string(), true));
        self
    }

    /// Embedded image stored at `word/media/<file_name>`.
    pub fn image(mut self, id: &str, file_name: &str, data: &[u8]) -> Self {
        self.relationships.push((
            id.to_string(),
            "image".to_string(),
            format!("media/{file_name}"),
            false,
        ));
        self.media.push((format!("word/media/{file_name}"), data.to_vec()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut files: Vec<(String, Vec<u8>)> = Vec::new();

        let mut overrides = String::from(
            r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
        );
        let mut doc_rels = String::new();
        let mut root_rels = format!(
            r#"<Relationship Id="rId1" Type="{REL}/officeDocument" Target="word/document.xml"/>"#
        );

        if let Some(styles) = &self.styles {
            files.push((
                "word/styles.xml".to_string(),
                format!(r#"<w:styles xmlns:w="{W}">{styles}</w:styles>"#).into_bytes(),
            ));
            doc_rels.push_str(&format!(
                r#"<Relationship Id="rIdStyles" Type="{REL}/styles" Target="styles.xml"/>"#
            ));
        }
        if let Some(numbering) = &self.numbering {
            files.push((
                "word/numbering.xml".to_string(),
                format!(r#"<w:numbering xmlns:w="{W}">{numbering}</w:numbering>"#).into_bytes(),
            ));
            doc_rels.push_str(&format!(
                r#"<Relationship Id="rIdNumbering" Type="{REL}/numbering" Target="numbering.xml"/>"#
            ));
        }
        if let Some(footnotes) = &self.footnotes {
            files.push((
                "word/footnotes.xml".to_string(),
                format!(r#"<w:footnotes xmlns:w="{W}">{footnotes}</w:footnotes>"#).into_bytes(),
            ));
            doc_rels.push_str(&format!(
                r#"<Relationship Id="rIdFootnotes" Type="{REL}/footnotes" Target="footnotes.xml"/>"#
            ));
        }
        if let Some(comments) = &self.comments {
            files.push((
                "word/comments.xml".to_string(),
                format!(r#"<w:comments xmlns:w="{W}">{comments}</w:comments>"#).into_bytes(),
            ));
            doc_rels.push_str(&format!(
                r#"<Relationship Id="rIdComments" Type="{REL}/comments" Target="comments.xml"/>"#
            ));
        }
        if let Some(title) = &self.title {
            files.push((
                "docProps/core.xml".to_string(),
                format!(
                    r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>{title}</dc:title></cp:coreProperties>"#
                )
                .into_bytes(),
            ));
            overrides.push_str(r#"<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>"#);
            root_rels.push_str(r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>"#);
        }

        for (id, kind, target, external) in &self.relationships {
            let mode = if *external {
                r#" TargetMode="External""#
            } else {
                ""
            };
            doc_rels.push_str(&format!(
                r#"<Relationship Id="{id}" Type="{REL}/{kind}" Target="{target}"{mode}/>"#
            ));
        }
        files.extend(self.media.iter().cloned());

        files.push((
            "[Content_Types].xml".to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/>{overrides}</Types>"#
            )
            .into_bytes(),
        ));
        files.push((
            "_rels/.rels".to_string(),
            rels_part(&root_rels).into_bytes(),
        ));
        files.push((
            "word/_rels/document.xml.rels".to_string(),
            rels_part(&doc_rels).into_bytes(),
        ));
        files.push((
            "word/document.xml".to_string(),
            document(&self.body).into_bytes(),
        ));

        zip_bytes(&files)
    }
}

fn rels_part(inner: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{inner}</Relationships>"#
    )
}

/// Wrap body children in a complete `w:document`.
pub fn document(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{W}" xmlns:r="{REL}" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture"><w:body>{body}<w:sectPr/></w:body></w:document>"#
    )
}

pub fn zip_bytes(files: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in files {
        zip.start_file(name.as_str(), SimpleFileOptions::default())
            .unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn paragraph(text: &str) -> String {
    format!(r#"<w:p><w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#)
}

pub fn styled_paragraph(style: &str, text: &str) -> String {
    format!(
        r#"<w:p><w:pPr><w:pStyle w:val="{style}"/></w:pPr><w:r><w:t>{text}</w:t></w:r></w:p>"#
    )
}

pub fn list_item(num_id: u32, level: u8, text: &str) -> String {
    format!(
        r#"<w:p><w:pPr><w:numPr><w:ilvl w:val="{level}"/><w:numId w:val="{num_id}"/></w:numPr></w:pPr><w:r><w:t>{text}</w:t></w:r></w:p>"#
    )
}

pub fn table(rows: &[&[&str]]) -> String {
    let mut xml = String::from("<w:tbl><w:tblPr/>");
    for row in rows {
        xml.push_str("<w:tr>");
        for cell in row.iter() {
            xml.push_str("<w:tc>");
            xml.push_str(&paragraph(cell));
            xml.push_str("</w:tc>");
        }
        xml.push_str("</w:tr>");
    }
    xml.push_str("</w:tbl>");
    xml
}

pub const DECIMAL_NUMBERING: &str = r#"<w:abstractNum w:abstractNumId="0"><w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="decimal"/><w:lvlText w:val="%1."/></w:lvl></w:abstractNum><w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num>"#;

pub const HEADING_STYLES: &str = r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style><w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Normal"/><w:pPr><w:outlineLvl w:val="1"/></w:pPr><w:rPr><w:b/></w:rPr></w:style>"#;
