//! Convenience helpers for loading and saving images via the `image` crate.
//!
//! Available when the `image-io` feature is enabled. Images are converted to
//! a single grayscale band; samples keep the source bit depth scale (8-bit,
//! 16-bit or float). Registration outputs are written as multi-page float
//! TIFF through the `tiff` encoder.

use crate::field::RegistrationOutput;
use crate::image::Image;
use crate::util::{FineRegError, FineRegResult};
use image::{ColorType, DynamicImage, GrayImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tiff::encoder::{colortype::Gray32Float, TiffEncoder};

/// Converts a decoded image into a single-band `f32` image with unit geometry.
pub fn image_from_dynamic(img: &DynamicImage) -> FineRegResult<Image> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    let data: Vec<f32> = match img.color() {
        ColorType::L16 | ColorType::La16 | ColorType::Rgb16 | ColorType::Rgba16 => img
            .to_luma16()
            .into_raw()
            .into_iter()
            .map(f32::from)
            .collect(),
        ColorType::Rgb32F | ColorType::Rgba32F => img.to_luma32f().into_raw(),
        _ => img.to_luma8().into_raw().into_iter().map(f32::from).collect(),
    };
    Image::new(data, width, height)
}

/// Loads an image from disk and converts it to a grayscale `f32` image.
pub fn load_gray_image<P: AsRef<Path>>(path: P) -> FineRegResult<Image> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|err| FineRegError::ImageIo {
        reason: format!("{}: {err}", path.display()),
    })?;
    image_from_dynamic(&img)
}

/// Saves an image as 8-bit grayscale, rounding and clamping to `[0, 255]`.
///
/// Non-finite samples are written as zero.
pub fn save_gray_u8<P: AsRef<Path>>(image: &Image, path: P) -> FineRegResult<()> {
    let path = path.as_ref();
    let bytes: Vec<u8> = image
        .data()
        .iter()
        .map(|&v| {
            if v.is_finite() {
                v.round().clamp(0.0, 255.0) as u8
            } else {
                0
            }
        })
        .collect();
    let buffer = GrayImage::from_raw(image.width() as u32, image.height() as u32, bytes).ok_or(
        FineRegError::BufferTooSmall {
            needed: image.width() * image.height(),
            got: image.data().len(),
        },
    )?;
    buffer.save(path).map_err(|err| FineRegError::ImageIo {
        reason: format!("{}: {err}", path.display()),
    })
}

/// Writes the output bands (dx, dy, score and, if present, the mask) as
/// consecutive `f32` pages of one TIFF file.
///
/// Invalid cells keep their `NaN` samples.
pub fn save_bands_tiff<P: AsRef<Path>>(
    output: &RegistrationOutput,
    path: P,
) -> FineRegResult<()> {
    let path = path.as_ref();
    let io_err = |err: &dyn std::fmt::Display| FineRegError::ImageIo {
        reason: format!("{}: {err}", path.display()),
    };
    let file = File::create(path).map_err(|e| io_err(&e))?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file)).map_err(|e| io_err(&e))?;
    let (width, height) = (output.width() as u32, output.height() as u32);
    for band in output.to_bands() {
        let page: Vec<f32> = band.data().iter().map(|&v| v as f32).collect();
        encoder
            .write_image::<Gray32Float>(width, height, &page)
            .map_err(|e| io_err(&e))?;
    }
    Ok(())
}
