use image::imageops::{self, FilterType};
use image::ImageFormat;
use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::buffer::PixelBuffer;
use crate::error::SourceError;

/// Edge length of the square previews shown next to each other
pub const PREVIEW_SIZE: u32 = 200;

/// Extensions accepted when picking an input image
pub const INPUT_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

pub fn is_supported_input<P: AsRef<Path>>(path: P) -> bool {
    extension_of(path.as_ref())
        .map(|e| INPUT_EXTENSIONS.contains(&e.as_str()))
        .unwrap_or(false)
}

/// Decodes an image file into an RGB8 buffer, whatever its colour type on
/// disk.
pub fn load<P: AsRef<Path>>(path: P) -> Result<PixelBuffer, SourceError> {
    let path = path.as_ref();
    debug!("Loading image {:?}", path);

    let image = image::open(path).map_err(|why| SourceError::Decode {
        path: path.to_owned(),
        reason: why.to_string(),
    })?;

    let buffer = PixelBuffer::from(image.into_rgb8());
    info!(
        "Loaded {:?} ({}x{})",
        path,
        buffer.width(),
        buffer.height()
    );
    Ok(buffer)
}

/// Output format picked from the extension: `.png`, `.jpg` or `.jpeg`.
/// A path with no extension is saved as PNG with `.png` appended.
pub fn resolve_output(path: &Path) -> Result<(PathBuf, ImageFormat), SourceError> {
    match extension_of(path).as_deref() {
        None => Ok((path.with_extension("png"), ImageFormat::Png)),
        Some("png") => Ok((path.to_owned(), ImageFormat::Png)),
        Some("jpg") | Some("jpeg") => Ok((path.to_owned(), ImageFormat::Jpeg)),
        Some(other) => Err(SourceError::Encode {
            path: path.to_owned(),
            reason: format!("unsupported output format '.{}' (use .png or .jpg)", other),
        }),
    }
}

/// Encodes the buffer to disk. Returns the path actually written.
pub fn save<P: AsRef<Path>>(buffer: &PixelBuffer, path: P) -> Result<PathBuf, SourceError> {
    let (path, format) = resolve_output(path.as_ref())?;

    let encode_err = |reason: String| SourceError::Encode {
        path: path.clone(),
        reason,
    };

    if buffer.is_empty() {
        return Err(encode_err("cannot encode an empty image".to_owned()));
    }

    let image = buffer
        .to_rgb_image()
        .map_err(|why| encode_err(why.to_string()))?;
    image
        .save_with_format(&path, format)
        .map_err(|why| encode_err(why.to_string()))?;

    info!("Saved {:?} as {:?}", path, format);
    Ok(path)
}

/// Resized copy for on-screen preview. Always `PREVIEW_SIZE` square,
/// aspect ratio is not preserved.
pub fn thumbnail(buffer: &PixelBuffer) -> Result<PixelBuffer, SourceError> {
    if buffer.is_empty() {
        return Ok(PixelBuffer::new_black(
            PREVIEW_SIZE as usize,
            PREVIEW_SIZE as usize,
        ));
    }
    let image = buffer.to_rgb_image().map_err(|why| SourceError::Decode {
        path: PathBuf::new(),
        reason: why.to_string(),
    })?;
    let resized = imageops::resize(&image, PREVIEW_SIZE, PREVIEW_SIZE, FilterType::Triangle);
    Ok(PixelBuffer::from(resized))
}
