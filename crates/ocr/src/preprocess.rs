use image::{DynamicImage, GrayImage, ImageBuffer, ImageFormat, Luma};
use std::io::Cursor;
use thiserror::Error;

/// Longest edge handed to the OCR engine.
pub const MAX_DIMENSION: u32 = 2800;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Upload is not a supported image: {0}")]
    Load(#[from] image::ImageError),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// An upload after normalization, ready for recognition.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Format the upload arrived in, when recognizable.
    pub source_format: Option<ImageFormat>,
}

/// Decode an uploaded certificate scan (JPEG / PNG / WEBP / ...) and return
/// a grayscale, contrast-stretched PNG.
pub fn prepare_for_ocr(data: &[u8]) -> Result<PreparedImage, PreprocessError> {
    let source_format = image::guess_format(data).ok();
    let img = normalize(image::load_from_memory(data)?);
    let (width, height) = (img.width(), img.height());
    Ok(PreparedImage { png: encode_as_png(img)?, width, height, source_format })
}

fn normalize(img: DynamicImage) -> DynamicImage {
    let img = if img.width() > MAX_DIMENSION || img.height() > MAX_DIMENSION {
        img.resize(MAX_DIMENSION, MAX_DIMENSION, image::imageops::FilterType::Lanczos3)
    } else {
        img
    };

    let gray: GrayImage = img.to_luma8();

    let (min_px, max_px) = gray
        .pixels()
        .fold((255u8, 0u8), |(mn, mx), p| (mn.min(p[0]), mx.max(p[0])));

    if max_px <= min_px {
        return DynamicImage::ImageLuma8(gray);
    }

    let range = (max_px - min_px) as u32;
    let stretched: GrayImage = ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        let p = gray.get_pixel(x, y)[0];
        Luma([((p - min_px) as u32 * 255 / range) as u8])
    });

    DynamicImage::ImageLuma8(stretched)
}

fn encode_as_png(img: DynamicImage) -> Result<Vec<u8>, PreprocessError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(buf)
}
