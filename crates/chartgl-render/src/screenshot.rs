//! Saving and encoding captured frames.

use std::path::Path;

use image::RgbaImage;

/// Error type for screenshot operations.
#[derive(Debug, thiserror::Error)]
pub enum ScreenshotError {
    #[error("Failed to save image: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image encoding error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid image data")]
    InvalidImageData,

    #[error("GPU buffer mapping failed")]
    BufferMapFailed,
}

/// Builds an image from tightly packed RGBA rows.
pub fn image_from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<RgbaImage, ScreenshotError> {
    RgbaImage::from_raw(width, height, data).ok_or(ScreenshotError::InvalidImageData)
}

/// Saves a captured frame; the format follows the extension (`png`, `jpg`, `jpeg`).
pub fn save_image(path: impl AsRef<Path>, image: &RgbaImage) -> Result<(), ScreenshotError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "png" => {
            image.save_with_format(path, image::ImageFormat::Png)?;
        }
        "jpg" | "jpeg" => {
            // JPEG has no alpha channel
            let rgb = image::DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            rgb.save_with_format(path, image::ImageFormat::Jpeg)?;
        }
        _ => {
            return Err(ScreenshotError::UnsupportedFormat(extension));
        }
    }

    log::info!("saved {}x{} frame to {}", image.width(), image.height(), path.display());
    Ok(())
}

/// Encodes a frame as PNG in memory.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ScreenshotError> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    image.write_to(&mut buffer, image::ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_png_signature() {
        let img = RgbaImage::from_pixel(4, 3, image::Rgba([255, 0, 0, 255]));
        let png = encode_png(&img).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_image_from_rgba_checks_size() {
        assert!(image_from_rgba(2, 2, vec![0; 16]).is_ok());
        assert!(matches!(
            image_from_rgba(2, 2, vec![0; 15]),
            Err(ScreenshotError::InvalidImageData)
        ));
    }

    #[test]
    fn test_unsupported_extension() {
        let img = RgbaImage::new(1, 1);
        let dir = std::env::temp_dir().join("chartgl_screenshot_test.bmpx");
        assert!(matches!(
            save_image(&dir, &img),
            Err(ScreenshotError::UnsupportedFormat(ext)) if ext == "bmpx"
        ));
    }
}
