// SPDX-License-Identifier: MIT
// CPU scaler built on fast_image_resize (SIMD-accelerated).
// RGB8 in → RGB8 out, direct write into caller-provided dst buffer.

use fast_image_resize as fir;
use fir::images::{TypedImage, TypedImageRef};
use fir::pixels::U8x3;
use fir::{FilterType, ResizeAlg, ResizeOptions, Resizer};

use crate::presets::ScalePlan;

#[derive(Debug)]
pub enum ScaleError {
    BufferTooSmall { needed: usize, got: usize },
    SourceSizeMismatch { needed: usize, got: usize },
    Fir(fir::ResizeError),
    ImageBuf(fir::ImageBufferError),
}

impl From<fir::ResizeError> for ScaleError { fn from(e: fir::ResizeError) -> Self { Self::Fir(e) } }
impl From<fir::ImageBufferError> for ScaleError { fn from(e: fir::ImageBufferError) -> Self { Self::ImageBuf(e) } }

impl std::fmt::Display for ScaleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaleError::BufferTooSmall { needed, got } => {
                write!(f, "Output buffer too small: need {} bytes, got {}", needed, got)
            }
            ScaleError::SourceSizeMismatch { needed, got } => {
                write!(f, "Source buffer does not match plan: need {} bytes, got {}", needed, got)
            }
            ScaleError::Fir(e) => write!(f, "Fast image resize error: {}", e),
            ScaleError::ImageBuf(e) => write!(f, "Image buffer error: {}", e),
        }
    }
}

impl std::error::Error for ScaleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScaleError::Fir(e) => Some(e),
            ScaleError::ImageBuf(e) => Some(e),
            _ => None,
        }
    }
}

/// Main scaling entry point.
/// `src_rgb` must be a tightly packed `plan.input.w * plan.input.h * 3` buffer.
/// `dst` must hold at least `plan.output_len()` bytes.
pub fn scale_rgb8_cpu(
    resizer: &mut Resizer,
    src_rgb: &[u8],
    plan: &ScalePlan,
    dst: &mut [u8],
) -> Result<(), ScaleError> {
    let src_len = (plan.input.w as usize) * (plan.input.h as usize) * 3;
    if src_rgb.len() != src_len {
        return Err(ScaleError::SourceSizeMismatch { needed: src_len, got: src_rgb.len() });
    }
    let dst_len = plan.output_len();
    if dst.len() < dst_len {
        return Err(ScaleError::BufferTooSmall { needed: dst_len, got: dst.len() });
    }

    let src_view = TypedImageRef::<U8x3>::from_buffer(plan.input.w, plan.input.h, src_rgb)?;
    let mut dst_image = TypedImage::<U8x3>::from_buffer(plan.out.w, plan.out.h, &mut dst[..dst_len])?;

    let opts = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3));
    resizer.resize_typed::<U8x3>(&src_view, &mut dst_image, &opts)?;

    Ok(())
}

/// Allocate the output buffer and scale in one step.
pub fn scale_rgb8_to_vec(
    resizer: &mut Resizer,
    src_rgb: &[u8],
    plan: &ScalePlan,
) -> Result<Vec<u8>, ScaleError> {
    let mut dst = vec![0u8; plan.output_len()];
    scale_rgb8_cpu(resizer, src_rgb, plan, &mut dst)?;
    Ok(dst)
}
