use crate::error::IconError;
use crate::types::IconFormat;
use image::codecs::bmp::BmpEncoder;
use image::codecs::ico::{IcoEncoder, IcoFrame};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage};

/// Byte value the off-screen surface is cleared to before an icon is drawn.
pub const BACKGROUND: u8 = 0xFF;

/// Largest edge the ICO container can store.
pub const ICO_MAX_EDGE: u32 = 256;

/// Reinterprets a top-down 32-bit BGRX surface as RGBA. The X byte is
/// ignored and alpha is forced opaque since the icon was flattened onto the
/// background.
pub fn bgrx_to_rgba(bits: &[u8], width: u32, height: u32) -> Result<RgbaImage, IconError> {
    let expected = width as usize * height as usize * 4;
    if width == 0 || height == 0 || bits.len() != expected {
        return Err(IconError::ConversionFailure(format!(
            "surface holds {} bytes, expected {expected} for {width}x{height}",
            bits.len()
        )));
    }

    let mut pixels = Vec::with_capacity(expected);
    for bgrx in bits.chunks_exact(4) {
        pixels.extend_from_slice(&[bgrx[2], bgrx[1], bgrx[0], 0xFF]);
    }

    RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| IconError::ConversionFailure("pixel buffer size mismatch".into()))
}

/// Scales an arbitrary image to fit a `size` square, keeping its aspect
/// ratio, and centers it on a transparent canvas.
pub fn fit_square(image: &DynamicImage, size: u32) -> RgbaImage {
    let scaled = image.resize(size, size, FilterType::Lanczos3).to_rgba8();
    let mut canvas = RgbaImage::new(size, size);
    let x = (size - scaled.width()) / 2;
    let y = (size - scaled.height()) / 2;
    image::imageops::overlay(&mut canvas, &scaled, x as i64, y as i64);
    canvas
}

pub fn encode(image: &RgbaImage, format: IconFormat, quality: u8) -> Result<Vec<u8>, IconError> {
    let (w, h) = image.dimensions();
    let mut bytes: Vec<u8> = Vec::new();
    match format {
        IconFormat::Png => {
            PngEncoder::new(&mut bytes).write_image(image, w, h, ExtendedColorType::Rgba8)?
        }
        IconFormat::Bmp => {
            BmpEncoder::new(&mut bytes).write_image(image, w, h, ExtendedColorType::Rgba8)?
        }
        IconFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100)).write_image(
                &rgb,
                w,
                h,
                ExtendedColorType::Rgb8,
            )?
        }
        IconFormat::Ico => {
            if w > ICO_MAX_EDGE || h > ICO_MAX_EDGE {
                return Err(IconError::ConversionFailure(format!(
                    "{w}x{h} exceeds the ICO limit of {ICO_MAX_EDGE}px"
                )));
            }
            IcoEncoder::new(&mut bytes).write_image(image, w, h, ExtendedColorType::Rgba8)?
        }
    }
    Ok(bytes)
}

/// Packs several images into one multi-resolution ICO. Frames above the
/// format's size limit are skipped.
pub fn encode_ico_frames<'a>(
    images: impl IntoIterator<Item = &'a RgbaImage>,
) -> Result<Vec<u8>, IconError> {
    let mut frames = Vec::new();
    for image in images {
        let (w, h) = image.dimensions();
        if w > ICO_MAX_EDGE || h > ICO_MAX_EDGE {
            continue;
        }
        frames.push(IcoFrame::as_png(image, w, h, ExtendedColorType::Rgba8)?);
    }
    if frames.is_empty() {
        return Err(IconError::ConversionFailure("no frames to write".into()));
    }

    let mut bytes: Vec<u8> = Vec::new();
    IcoEncoder::new(&mut bytes).encode_images(&frames)?;
    Ok(bytes)
}

pub fn decoded_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::load_from_memory(bytes).ok().map(|img| (img.width(), img.height()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid_bgrx(n: u32, bgr: [u8; 3]) -> Vec<u8> {
        (0..n * n)
            .flat_map(|_| [bgr[0], bgr[1], bgr[2], 0])
            .collect()
    }

    #[test]
    fn solid_surface_becomes_n_by_n_reference_color() {
        let n = 24;
        let bits = solid_bgrx(n, [0x30, 0x80, 0xE0]);
        let image = bgrx_to_rgba(&bits, n, n).unwrap();

        assert_eq!(image.pixels().count(), (n * n) as usize);
        assert_eq!(*image.get_pixel(n / 2, n / 3), Rgba([0xE0, 0x80, 0x30, 0xFF]));
    }

    #[test]
    fn short_surface_is_a_conversion_failure() {
        let err = bgrx_to_rgba(&[0; 12], 2, 2).unwrap_err();
        assert_eq!(err.kind(), crate::error::IconErrorKind::ConversionFailure);
    }

    #[test]
    fn png_output_keeps_dimensions() {
        let image = RgbaImage::from_pixel(20, 12, Rgba([1, 2, 3, 255]));
        let bytes = encode(&image, IconFormat::Png, 95).unwrap();
        assert_eq!(decoded_dimensions(&bytes), Some((20, 12)));
    }

    #[test]
    fn jpeg_drops_alpha_but_keeps_dimensions() {
        let image = RgbaImage::from_pixel(16, 16, Rgba([200, 10, 10, 128]));
        let bytes = encode(&image, IconFormat::Jpeg, 80).unwrap();
        assert_eq!(decoded_dimensions(&bytes), Some((16, 16)));
    }

    #[test]
    fn ico_rejects_oversized_images() {
        let image = RgbaImage::new(300, 300);
        assert!(encode(&image, IconFormat::Ico, 95).is_err());
    }

    #[test]
    fn fit_square_centers_wide_images() {
        let wide = DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 20, Rgba([9, 9, 9, 255])));
        let square = fit_square(&wide, 20);
        assert_eq!(square.dimensions(), (20, 20));
        assert_eq!(square.get_pixel(10, 0).0[3], 0);
        assert_eq!(*square.get_pixel(10, 10), Rgba([9, 9, 9, 255]));
    }

    #[test]
    fn multi_frame_ico_skips_large_frames() {
        let small = RgbaImage::from_pixel(16, 16, Rgba([0, 0, 255, 255]));
        let large = RgbaImage::new(512, 512);
        let bytes = encode_ico_frames([&small, &large]).unwrap();
        assert_eq!(decoded_dimensions(&bytes), Some((16, 16)));
    }
}
