//! Photo optimisation policy: crop to 4:5, resize to 800x1000, re-encode
//! as JPEG quality 85, cap at ~500KB. Images smaller than 600x750 are
//! rejected outright rather than upscaled.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

const TARGET_WIDTH: u32 = 800;
const TARGET_HEIGHT: u32 = 1000;
const MIN_WIDTH: u32 = 600;
const MIN_HEIGHT: u32 = 750;
const MAX_BYTES: usize = 500_000;
const QUALITY_STEPS: &[u8] = &[85, 75, 65, 55, 45];

/// Known gap: HEIC uploads are accepted by the HTTP layer (`image/heic` is
/// advertised as a supported MIME type) but are not actually transcoded —
/// the `image` crate carries no HEIC decoder in this dependency stack, so
/// HEIC photos are rejected here with a message asking for a JPEG/PNG/WEBP
/// re-upload instead of being silently forwarded to storage (which would
/// reject them anyway, see `reg_adapters::storage`). A HEIC-capable decoder
/// still needs to be added before this format is genuinely supported.
pub fn optimize(bytes: &[u8], content_type: &str) -> Result<Vec<u8>, String> {
    if content_type == "image/heic" {
        return Err(
            "HEIC photos can't be processed automatically yet — please upload a JPEG, PNG, or WEBP image instead."
                .to_string(),
        );
    }

    let image = image::load_from_memory(bytes).map_err(|e| format!("could not decode image: {e}"))?;
    let (width, height) = image.dimensions();
    if width < MIN_WIDTH || height < MIN_HEIGHT {
        return Err(format!(
            "photo is too small ({width}x{height}); please upload at least {MIN_WIDTH}x{MIN_HEIGHT}"
        ));
    }

    let cropped = crop_to_aspect(image, TARGET_WIDTH, TARGET_HEIGHT);
    let resized = cropped.resize_exact(TARGET_WIDTH, TARGET_HEIGHT, FilterType::Lanczos3);

    for &quality in QUALITY_STEPS {
        let encoded = encode_jpeg(&resized, quality)?;
        if encoded.len() <= MAX_BYTES {
            return Ok(encoded);
        }
    }
    encode_jpeg(&resized, *QUALITY_STEPS.last().unwrap())
}

/// Centre-crop to the given aspect ratio without upscaling.
fn crop_to_aspect(image: DynamicImage, target_width: u32, target_height: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    let target_ratio = target_width as f64 / target_height as f64;
    let current_ratio = width as f64 / height as f64;

    if current_ratio > target_ratio {
        let new_width = (height as f64 * target_ratio).round() as u32;
        let x = (width - new_width) / 2;
        image.crop_imm(x, 0, new_width, height)
    } else {
        let new_height = (width as f64 / target_ratio).round() as u32;
        let y = (height - new_height) / 2;
        image.crop_imm(0, y, width, new_height)
    }
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, String> {
    let mut buffer = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
    image
        .write_with_encoder(encoder)
        .map_err(|e| format!("could not encode photo: {e}"))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn sample_jpeg(width: u32, height: u32) -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let dynamic = DynamicImage::ImageRgb8(img);
        encode_jpeg(&dynamic, 90).unwrap()
    }

    #[test]
    fn rejects_heic_outright() {
        let err = optimize(&[], "image/heic").unwrap_err();
        assert!(err.contains("HEIC"));
    }

    #[test]
    fn rejects_images_smaller_than_minimum() {
        let bytes = sample_jpeg(500, 600);
        let err = optimize(&bytes, "image/jpeg").unwrap_err();
        assert!(err.contains("too small"));
    }

    #[test]
    fn accepts_and_resizes_a_valid_photo() {
        let bytes = sample_jpeg(1200, 1500);
        let result = optimize(&bytes, "image/jpeg").unwrap();
        let decoded = image::load_from_memory(&result).unwrap();
        assert_eq!(decoded.dimensions(), (TARGET_WIDTH, TARGET_HEIGHT));
        assert!(result.len() <= MAX_BYTES);
    }

    #[test]
    fn crop_to_aspect_preserves_target_ratio() {
        let wide = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(2000, 1000, Rgb([0, 0, 0])));
        let cropped = crop_to_aspect(wide, 4, 5);
        let (w, h) = cropped.dimensions();
        assert!((w as f64 / h as f64 - 0.8).abs() < 0.01);
    }
}
