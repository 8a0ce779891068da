use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

/// File name offered by the save dialog.
pub const DEFAULT_FILE_NAME: &str = "generated.png";

/// Scales `image` down so neither side exceeds `max_side`, keeping the aspect
/// ratio. Images that already fit are returned unchanged; nothing is enlarged.
pub fn fit_within(image: &DynamicImage, max_side: u32) -> DynamicImage {
    if image.width() <= max_side && image.height() <= max_side {
        return image.clone();
    }
    image.resize(max_side, max_side, FilterType::Lanczos3)
}

/// Picks the output format from the extension, appending `.png` when the path
/// has none. Only PNG and JPEG are written.
pub fn resolve_save_path(path: &Path) -> Result<(PathBuf, ImageFormat)> {
    let path = match path.extension() {
        Some(ext) if !ext.is_empty() => path.to_path_buf(),
        _ => path.with_extension("png"),
    };
    let format = ImageFormat::from_path(&path)
        .with_context(|| format!("unrecognized image extension in {}", path.display()))?;
    match format {
        ImageFormat::Png | ImageFormat::Jpeg => Ok((path, format)),
        other => bail!(
            "cannot save as {:?}; use a .png or .jpg file name",
            other
        ),
    }
}

/// Writes `image` to `path` and returns the path actually written.
pub fn save_image(image: &DynamicImage, path: &Path) -> Result<PathBuf> {
    let (path, format) = resolve_save_path(path)?;
    let result = match format {
        // JPEG has no alpha channel.
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()).save_with_format(&path, format),
        _ => image.save_with_format(&path, format),
    };
    result.with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}
