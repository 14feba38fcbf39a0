use crate::error::ParseError;
use crate::xml;
use quick_xml::events::Event;
use std::collections::HashMap;

/// One `<Relationship>` entry of a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    /// Full relationship type URI
    pub rel_type: String,
    /// Package path for internal targets, the verbatim URI for external ones
    pub target: String,
    pub external: bool,
}

impl Relationship {
    /// Last path segment of the type URI, e.g. `styles` or `hyperlink`.
    pub fn type_name(&self) -> &str {
        self.rel_type.rsplit('/').next().unwrap_or(&self.rel_type)
    }
}

/// Maps relationship IDs (`rId7`) to their targets for one source part.
#[derive(Debug, Clone, Default)]
pub struct RelationshipTable {
    by_id: HashMap<String, Relationship>,
}

impl RelationshipTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `.rels` part. Internal targets are resolved against the
    /// directory of `source_part` (use `""` for the package root).
    pub fn parse(xml_bytes: &[u8], source_part: &str) -> Result<Self, ParseError> {
        let base_dir = parent_dir(source_part);
        let mut reader = xml::reader(xml_bytes);
        let mut table = Self::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) if e.local_name().as_ref() == b"Relationship" => {
                    let (Some(id), Some(target)) = (xml::attr(&e, b"Id"), xml::attr(&e, b"Target"))
                    else {
                        log::debug!("skipping relationship without Id or Target");
                        continue;
                    };
                    let rel_type = xml::attr(&e, b"Type").unwrap_or_default();
                    let external = xml::attr(&e, b"TargetMode")
                        .is_some_and(|m| m.eq_ignore_ascii_case("External"));
                    let target = if external {
                        target
                    } else {
                        resolve_target(base_dir, &target)
                    };
                    table.insert(Relationship {
                        id,
                        rel_type,
                        target,
                        external,
                    });
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml::malformed(e, &reader)),
                _ => {}
            }
        }

        Ok(table)
    }

    pub fn insert(&mut self, rel: Relationship) {
        self.by_id.insert(rel.id.clone(), rel);
    }

    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.by_id.get(id)
    }

    pub fn target(&self, id: &str) -> Option<&str> {
        self.get(id).map(|r| r.target.as_str())
    }

    /// First relationship whose type URI ends with `/type_name`.
    pub fn find_by_type(&self, type_name: &str) -> Option<&Relationship> {
        let mut matches: Vec<&Relationship> = self
            .by_id
            .values()
            .filter(|r| r.type_name() == type_name)
            .collect();
        // HashMap order is unstable; keep the choice deterministic.
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        matches.into_iter().next()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// `word/document.xml` → `word/_rels/document.xml.rels`, `""` → `_rels/.rels`.
pub fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None if part.is_empty() => "_rels/.rels".to_string(),
        None => format!("_rels/{}.rels", part),
    }
}

pub(crate) fn parent_dir(part: &str) -> &str {
    part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Resolve a relative target against `base_dir`, collapsing `.` and `..`.
pub fn resolve_target(base_dir: &str, target: &str) -> String {
    let target = target.replace('\\', "/");
    let joined = if let Some(absolute) = target.strip_prefix('/') {
        absolute.to_string()
    } else if base_dir.is_empty() {
        target
    } else {
        format!("{}/{}", base_dir, target)
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}
