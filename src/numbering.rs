//! Numbering definitions from `word/numbering.xml`.
//!
//! ```xml
//! <w:numbering>
//!   <w:abstractNum w:abstractNumId="0">
//!     <w:lvl w:ilvl="0">
//!       <w:start w:val="1"/>
//!       <w:numFmt w:val="decimal"/>
//!       <w:lvlText w:val="%1."/>
//!     </w:lvl>
//!   </w:abstractNum>
//!   <w:num w:numId="1">
//!     <w:abstractNumId w:val="0"/>
//!   </w:num>
//! </w:numbering>
//! ```

use crate::error::ParseError;
use crate::xml;
use quick_xml::events::Event;
use std::collections::{BTreeMap, HashMap};

/// `<w:numFmt w:val="..."/>`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NumberFormat {
    #[default]
    Bullet,
    Decimal,
    LowerLetter,
    UpperLetter,
    LowerRoman,
    UpperRoman,
    None,
    Other(String),
}

impl NumberFormat {
    pub fn from_xml(value: &str) -> Self {
        match value {
            "bullet" => NumberFormat::Bullet,
            "decimal" | "decimalZero" => NumberFormat::Decimal,
            "lowerLetter" => NumberFormat::LowerLetter,
            "upperLetter" => NumberFormat::UpperLetter,
            "lowerRoman" => NumberFormat::LowerRoman,
            "upperRoman" => NumberFormat::UpperRoman,
            "none" => NumberFormat::None,
            other => NumberFormat::Other(other.to_string()),
        }
    }

    /// Whether items carry an ordinal rather than a glyph.
    pub fn is_ordered(&self) -> bool {
        !matches!(self, NumberFormat::Bullet | NumberFormat::None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelDefinition {
    pub level: u8,
    pub format: NumberFormat,
    /// `lvlText`, e.g. `%1.` or a bullet glyph
    pub text: String,
    pub start: u32,
    /// Left indentation in twips
    pub indent: Option<i32>,
}

impl LevelDefinition {
    pub fn new(level: u8, format: NumberFormat) -> Self {
        Self {
            level,
            format,
            text: String::new(),
            start: 1,
            indent: None,
        }
    }
}

/// `<w:abstractNum>`: the per-level formats shared by numbering instances.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NumberingDefinition {
    pub id: u32,
    pub levels: BTreeMap<u8, LevelDefinition>,
    /// `w:styleLink`: this definition backs the named numbering style
    pub style_link: Option<String>,
    /// `w:numStyleLink`: levels come from the definition backing this style
    pub num_style_link: Option<String>,
}

/// `<w:num>`: what paragraphs reference through `w:numId`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NumberingInstance {
    pub num_id: u32,
    pub abstract_id: u32,
    pub start_overrides: HashMap<u8, u32>,
}

/// Effective format of one level of one numbering instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLevel {
    pub format: NumberFormat,
    pub start: u32,
}

#[derive(Debug, Clone, Default)]
pub struct NumberingTable {
    definitions: HashMap<u32, NumberingDefinition>,
    instances: HashMap<u32, NumberingInstance>,
    /// numbering style id -> abstract definition carrying its `styleLink`
    style_links: HashMap<String, u32>,
}

impl NumberingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(xml_bytes: &[u8]) -> Result<Self, ParseError> {
        let mut reader = xml::reader(xml_bytes);
        let mut table = Self::new();

        let mut definition: Option<NumberingDefinition> = None;
        let mut level: Option<LevelDefinition> = None;
        let mut instance: Option<NumberingInstance> = None;
        let mut override_level: Option<u8> = None;
        let mut skip_depth = 0usize;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    if skip_depth > 0 {
                        skip_depth += 1;
                        continue;
                    }
                    match e.local_name().as_ref() {
                        b"abstractNum" => {
                            definition = xml::attr(&e, b"abstractNumId")
                                .and_then(|id| id.parse().ok())
                                .map(|id| NumberingDefinition {
                                    id,
                                    ..Default::default()
                                });
                        }
                        // A full level redefinition inside an override is rare; the
                        // start override alone is honoured.
                        b"lvl" if instance.is_some() => skip_depth = 1,
                        b"lvl" if definition.is_some() => {
                            let ilvl = xml::attr(&e, b"ilvl")
                                .and_then(|v| v.parse::<u8>().ok())
                                .unwrap_or(0);
                            level = Some(LevelDefinition::new(ilvl, NumberFormat::Bullet));
                        }
                        b"styleLink" if level.is_none() => {
                            if let Some(def) = definition.as_mut() {
                                def.style_link = xml::val(&e);
                            }
                        }
                        b"numStyleLink" if level.is_none() => {
                            if let Some(def) = definition.as_mut() {
                                def.num_style_link = xml::val(&e);
                            }
                        }
                        b"start" => {
                            if let (Some(lvl), Some(start)) = (level.as_mut(), xml::val_u32(&e)) {
                                lvl.start = start;
                            }
                        }
                        b"numFmt" => {
                            if let (Some(lvl), Some(fmt)) = (level.as_mut(), xml::val(&e)) {
                                lvl.format = NumberFormat::from_xml(&fmt);
                            }
                        }
                        b"lvlText" => {
                            if let (Some(lvl), Some(text)) = (level.as_mut(), xml::val(&e)) {
                                lvl.text = text;
                            }
                        }
                        b"ind" => {
                            let indent = xml::attr(&e, b"left")
                                .or_else(|| xml::attr(&e, b"start"))
                                .and_then(|v| v.parse().ok());
                            if let (Some(lvl), Some(indent)) = (level.as_mut(), indent) {
                                lvl.indent = Some(indent);
                            }
                        }
                        b"num" => {
                            instance = xml::attr(&e, b"numId")
                                .and_then(|id| id.parse().ok())
                                .map(|num_id| NumberingInstance {
                                    num_id,
                                    ..Default::default()
                                });
                        }
                        b"abstractNumId" => {
                            if let (Some(num), Some(id)) = (instance.as_mut(), xml::val_u32(&e)) {
                                num.abstract_id = id;
                            }
                        }
                        b"lvlOverride" => {
                            override_level = xml::attr(&e, b"ilvl").and_then(|v| v.parse().ok());
                        }
                        b"startOverride" => {
                            if let (Some(num), Some(lvl), Some(start)) =
                                (instance.as_mut(), override_level, xml::val_u32(&e))
                            {
                                num.start_overrides.insert(lvl, start);
                            }
                        }
                        _ => {}
                    }
                }
                Ok(Event::End(e)) => {
                    if skip_depth > 0 {
                        skip_depth -= 1;
                        continue;
                    }
                    match e.local_name().as_ref() {
                        b"lvl" => {
                            if let (Some(def), Some(lvl)) = (definition.as_mut(), level.take()) {
                                def.levels.insert(lvl.level, lvl);
                            }
                        }
                        b"abstractNum" => {
                            if let Some(def) = definition.take() {
                                table.insert_definition(def);
                            }
                        }
                        b"lvlOverride" => override_level = None,
                        b"num" => {
                            if let Some(num) = instance.take() {
                                table.instances.insert(num.num_id, num);
                            }
                        }
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml::malformed(e, &reader)),
                _ => {}
            }
        }

        log::debug!(
            "parsed {} numbering definitions, {} instances",
            table.definitions.len(),
            table.instances.len()
        );
        Ok(table)
    }

    pub fn insert_definition(&mut self, definition: NumberingDefinition) {
        if let Some(style) = &definition.style_link {
            self.style_links.insert(style.clone(), definition.id);
        }
        self.definitions.insert(definition.id, definition);
    }

    pub fn insert_instance(&mut self, instance: NumberingInstance) {
        self.instances.insert(instance.num_id, instance);
    }

    pub fn definition(&self, abstract_id: u32) -> Option<&NumberingDefinition> {
        self.definitions.get(&abstract_id)
    }

    pub fn instance(&self, num_id: u32) -> Option<&NumberingInstance> {
        self.instances.get(&num_id)
    }

    /// Effective format for `level` of instance `num_id`. `None` when the
    /// instance or its abstract definition does not exist.
    pub fn resolve(&self, num_id: u32, level: u8) -> Option<ResolvedLevel> {
        let instance = self.instances.get(&num_id)?;
        let definition = self.linked(self.definitions.get(&instance.abstract_id)?);
        let (format, start) = match definition.levels.get(&level) {
            Some(lvl) => (lvl.format.clone(), lvl.start),
            None => {
                log::debug!("numbering {num_id} has no level {level}; using a bullet");
                (NumberFormat::Bullet, 1)
            }
        };
        let start = instance
            .start_overrides
            .get(&level)
            .copied()
            .unwrap_or(start);
        Some(ResolvedLevel { format, start })
    }

    /// Numbering style an instance defers to when its definition has no
    /// levels of its own and no `styleLink` partner in this part. The
    /// style's `numPr` names the instance that carries the levels.
    pub fn unlinked_style(&self, num_id: u32) -> Option<&str> {
        let instance = self.instances.get(&num_id)?;
        let definition = self.linked(self.definitions.get(&instance.abstract_id)?);
        if definition.levels.is_empty() {
            definition.num_style_link.as_deref()
        } else {
            None
        }
    }

    /// Follow `numStyleLink` to the definition whose `styleLink` names the
    /// same style. Only one hop is taken.
    fn linked<'a>(&'a self, definition: &'a NumberingDefinition) -> &'a NumberingDefinition {
        if !definition.levels.is_empty() {
            return definition;
        }
        definition
            .num_style_link
            .as_ref()
            .and_then(|style| self.style_links.get(style))
            .filter(|&&id| id != definition.id)
            .and_then(|id| self.definitions.get(id))
            .unwrap_or(definition)
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
