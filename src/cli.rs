use crate::image;
use anyhow::{Context, Result};
use clap::Parser;
use docx2md::{container, ConvertOptions, Dialect, ImageHandling};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Convert DOCX documents to clean Markdown
#[derive(Parser, Debug)]
#[command(name = "docx2md", version, about)]
pub struct Cli {
    /// Path to the input DOCX file
    pub input: PathBuf,

    /// Output Markdown file. Defaults to stdout.
    pub output: Option<PathBuf>,

    /// Directory for extracted images, relative to the output file
    #[arg(long, default_value = "images")]
    pub images_dir: String,

    /// Embed images as base64 data URIs instead of extracting them
    #[arg(long, default_value_t = false, conflicts_with = "no_images")]
    pub inline_images: bool,

    /// Do not extract or reference images
    #[arg(long, default_value_t = false)]
    pub no_images: bool,

    /// Prepend a header built from the document properties
    #[arg(long, default_value_t = false)]
    pub metadata: bool,

    /// Leave out footnotes and endnotes
    #[arg(long, default_value_t = false)]
    pub no_notes: bool,

    /// Leave out reviewer comments
    #[arg(long, default_value_t = false)]
    pub no_comments: bool,

    /// Emit plain CommonMark (no strikethrough or footnote syntax)
    #[arg(long, default_value_t = false)]
    pub commonmark: bool,

    /// Log each conversion stage
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Cli {
    pub fn options(&self) -> ConvertOptions {
        let image_handling = if self.no_images {
            ImageHandling::Skip
        } else if self.inline_images {
            ImageHandling::Inline
        } else {
            ImageHandling::Reference {
                prefix: self.images_dir.clone(),
            }
        };

        ConvertOptions {
            image_handling,
            dialect: if self.commonmark {
                Dialect::commonmark()
            } else {
                Dialect::gfm()
            },
            include_metadata: self.metadata,
            include_notes: !self.no_notes,
            include_comments: !self.no_comments,
        }
    }
}

pub fn run(cli: &Cli) -> Result<()> {
    let bytes = fs::read(&cli.input)
        .with_context(|| format!("Failed to read input file: {}", cli.input.display()))?;
    let package = container::open(&bytes)
        .with_context(|| format!("Failed to open {}", cli.input.display()))?;

    let options = cli.options();
    let markdown = docx2md::convert_package(&package, &options)
        .with_context(|| format!("Failed to convert {}", cli.input.display()))?;

    // Images land next to the output file, or in the working directory
    // when writing to stdout.
    let image_count = match options.image_handling {
        ImageHandling::Reference { ref prefix } => {
            let base = match &cli.output {
                Some(path) => output_parent(path),
                None => PathBuf::from("."),
            };
            image::extract_images(&package, &base.join(prefix))?
        }
        ImageHandling::Inline | ImageHandling::Skip => 0,
    };

    match &cli.output {
        Some(path) => write_output(path, &markdown)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(markdown.as_bytes())
                .context("Failed to write to stdout")?;
        }
    }

    let destination = cli
        .output
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "stdout".to_string());
    eprintln!(
        "Converted {}{} to {}",
        cli.input.display(),
        if image_count > 0 {
            format!(" and {} images", image_count)
        } else {
            String::new()
        },
        destination
    );

    Ok(())
}

fn output_parent(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn write_output(output_path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    fs::write(output_path, content)
        .with_context(|| format!("Failed to write output file: {}", output_path.display()))?;

    Ok(())
}
