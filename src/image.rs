use anyhow::{Context, Result};
use docx2md::container::Package;
use std::fs;
use std::path::Path;

/// Write every media entry of the package into `images_dir`, returning how
/// many were written. The directory is only created when there is media.
pub fn extract_images(package: &Package, images_dir: &Path) -> Result<usize> {
    let images: Vec<_> = package.media().collect();

    if images.is_empty() {
        return Ok(0);
    }

    fs::create_dir_all(images_dir)
        .with_context(|| format!("Failed to create {}", images_dir.display()))?;

    for img in &images {
        let dest = images_dir.join(clean_filename(img.name()));
        fs::write(&dest, img.data())
            .with_context(|| format!("Failed to write image: {}", dest.display()))?;
    }

    log::debug!("extracted {} images to {}", images.len(), images_dir.display());
    Ok(images.len())
}

fn clean_filename(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_else(|| "image.bin".to_string())
}
