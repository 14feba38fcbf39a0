//! Small helpers around quick-xml shared by every part parser.

use crate::error::ParseError;
use quick_xml::events::BytesStart;
use quick_xml::Reader;

/// Reader over an in-memory part. Empty elements are expanded into a
/// start/end pair so every parser can track nesting with a single stack.
pub(crate) fn reader(xml: &[u8]) -> Reader<&[u8]> {
    let mut reader = Reader::from_reader(xml);
    reader.expand_empty_elements(true);
    reader.trim_text(false);
    reader
}

pub(crate) fn malformed(err: quick_xml::Error, reader: &Reader<&[u8]>) -> ParseError {
    ParseError::Malformed {
        message: err.to_string(),
        position: reader.buffer_position(),
    }
}

/// Attribute value by local name, ignoring the namespace prefix.
#[inline]
pub(crate) fn attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

#[inline]
pub(crate) fn val(e: &BytesStart) -> Option<String> {
    attr(e, b"val")
}

#[inline]
pub(crate) fn val_u32(e: &BytesStart) -> Option<u32> {
    val(e).and_then(|v| v.trim().parse().ok())
}

/// On/off property such as `<w:b/>` or `<w:b w:val="0"/>`.
#[inline]
pub(crate) fn toggle(e: &BytesStart) -> bool {
    !matches!(
        val(e).as_deref(),
        Some("0") | Some("false") | Some("off") | Some("none")
    )
}

pub(crate) fn name_of(local: &[u8]) -> String {
    String::from_utf8_lossy(local).into_owned()
}
