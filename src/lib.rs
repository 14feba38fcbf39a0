//! DOCX to Markdown conversion.
//!
//! The pipeline runs in four stages, each usable on its own:
//!
//! 1. [`container::open`] unpacks the ZIP package and locates its parts.
//! 2. [`parser::parse`] turns the document body into a [`document::DocumentTree`].
//! 3. [`resolver::resolve`] flattens style and numbering references.
//! 4. [`markdown::emit`] serializes the resolved tree.
//!
//! [`convert`] runs all of them:
//!
//! ```no_run
//! let bytes = std::fs::read("report.docx").unwrap();
//! let markdown = docx2md::convert(&bytes).unwrap();
//! println!("{markdown}");
//! ```

pub mod container;
pub mod converter;
pub mod document;
pub mod error;
pub mod formatting;
pub mod markdown;
pub mod metadata;
pub mod notes;
pub mod numbering;
pub mod options;
pub mod parser;
pub mod relationships;
pub mod resolver;
pub mod styles;
mod xml;

pub use converter::{convert, convert_package, convert_with_options};
pub use error::{
    ContainerError, ConversionError, ErrorKind, ParseError, ReferenceKind, ResolveError, Stage,
};
pub use options::{ConvertOptions, Dialect, ImageHandling};
