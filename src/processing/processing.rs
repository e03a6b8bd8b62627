//! # Photo Preprocessing
//!
//! Normalises a captured photo before it is sent for grading. Steps run in a
//! fixed order:
//!
//! 1. **Decode** the photo with the `image` crate
//! 2. **Orient** it upright from the EXIF orientation tag (no-op when absent)
//! 3. **Downscale** so the longest side is at most `max_long_side`, keeping
//!    the aspect ratio, via `grade_scale`
//! 4. **Encode** to JPEG at `jpeg_quality`
//!
//! The only expected failure is a decode error on a corrupt or unsupported
//! file. Preprocessing is CPU bound; the workflow runs it on a blocking thread.

use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose};
use fast_image_resize::Resizer;
use grade_scale::cpu::scale_rgb8_to_vec;
use grade_scale::presets::{ScaleTarget, Size, build_plan};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use tracing::debug;

use super::orientation::read_exif_orientation;
use crate::config::GradeConfig;
use crate::error::{GradeError, GradeResult};

/// A photo ready for transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// Encoded bytes
    pub bytes: Vec<u8>,
    /// Dimensions of the encoded image
    pub size: Size,
    /// MIME type of `bytes`
    pub mime: &'static str,
}

impl EncodedImage {
    /// Standard base64 without line breaks.
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.bytes)
    }

    /// `data:<mime>;base64,<payload>` for embedding in a chat message.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.to_base64())
    }
}

/// Decode → orient → downscale → JPEG encode.
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    max_long_side: u32,
    jpeg_quality: u8,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(1024, 70)
    }
}

impl Preprocessor {
    pub fn new(max_long_side: u32, jpeg_quality: u8) -> Self {
        Self {
            max_long_side: max_long_side.max(1),
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    pub fn from_config(config: &GradeConfig) -> Self {
        Self::new(config.max_long_side, config.jpeg_quality)
    }

    pub fn max_long_side(&self) -> u32 {
        self.max_long_side
    }

    /// Run the full pipeline on encoded photo bytes.
    pub fn preprocess(&self, raw: &[u8]) -> GradeResult<EncodedImage> {
        let decoded = image::load_from_memory(raw).map_err(|e| {
            GradeError::preprocessing_from("decode", e)
                .with_context(format!("decoding {} byte photo", raw.len()))
        })?;

        let orientation = read_exif_orientation(raw);
        let upright = orientation.apply(decoded);
        let rgb = upright.to_rgb8();
        let input = Size {
            w: rgb.width(),
            h: rgb.height(),
        };
        if input.w == 0 || input.h == 0 {
            return Err(GradeError::preprocessing("decode", "photo has no pixels"));
        }

        let plan = build_plan(input, ScaleTarget::MaxLongSide(self.max_long_side));
        let scaled = if plan.needs_resize() {
            let mut resizer = Resizer::new();
            let out = scale_rgb8_to_vec(&mut resizer, rgb.as_raw(), &plan)?;
            RgbImage::from_raw(plan.out.w, plan.out.h, out).ok_or_else(|| {
                GradeError::preprocessing("resize", "scaled buffer does not match plan")
            })?
        } else {
            rgb
        };

        let bytes = encode_jpeg(&scaled, self.jpeg_quality)?;
        debug!(
            ?orientation,
            swapped = orientation.swaps_dimensions(),
            input_w = input.w,
            input_h = input.h,
            out_w = plan.out.w,
            out_h = plan.out.h,
            bytes = bytes.len(),
            "photo preprocessed"
        );

        Ok(EncodedImage {
            bytes,
            size: plan.out,
            mime: "image/jpeg",
        })
    }
}

fn encode_jpeg(img: &RgbImage, quality: u8) -> GradeResult<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut cursor, quality)
        .encode_image(img)
        .map_err(|e| GradeError::preprocessing_from("encode", e))?;
    Ok(cursor.into_inner())
}
