// SPDX-License-Identifier: MIT
//! # Scale Plans and Long-Side Presets
//!
//! A [`ScalePlan`] is computed once per image from its decoded dimensions and
//! a [`ScaleTarget`]. Plans always preserve aspect ratio:
//!
//! - The longest side is clamped to the target, the other side follows
//!   proportionally and is rounded to the nearest pixel
//! - No upscaling: images already within the target are left unchanged
//! - Each side is clamped to a minimum of 1px

/// Represents a 2D size with width and height in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    /// Length of the longer side.
    pub fn long_side(&self) -> u32 {
        self.w.max(self.h)
    }
}

/// Defines the target size constraint for scaling operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScaleTarget {
    /// Clamp the longest side to a maximum value, derive the other side proportionally.
    MaxLongSide(u32),
}

/// Complete scaling plan computed from input parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScalePlan {
    /// Original input dimensions
    pub input: Size,
    /// Target size constraint used for planning
    pub target: ScaleTarget,
    /// Final computed output dimensions
    pub out: Size,
}

impl ScalePlan {
    /// True when the plan changes the image dimensions.
    pub fn needs_resize(&self) -> bool {
        self.input != self.out
    }

    /// Number of bytes an RGB8 output buffer must hold.
    pub fn output_len(&self) -> usize {
        (self.out.w as usize) * (self.out.h as usize) * 3
    }
}

/// Compute a scaling plan for `input` under `target`.
pub fn build_plan(input: Size, target: ScaleTarget) -> ScalePlan {
    match target {
        ScaleTarget::MaxLongSide(max_side) => {
            let (w, h) = fit_preserve(input, max_side);
            ScalePlan {
                input,
                target,
                out: Size { w, h },
            }
        }
    }
}

/// Fit image within max_long on its longest dimension while preserving aspect ratio.
/// Never upscales.
fn fit_preserve(input: Size, max_long: u32) -> (u32, u32) {
    let (w, h) = (input.w as f64, input.h as f64);
    let long = w.max(h).max(1.0);
    let s = (max_long.max(1) as f64 / long).min(1.0);
    (
        ((w * s).round() as u32).max(1),
        ((h * s).round() as u32).max(1),
    )
}

/// Named long-side presets for the grading request.
///
/// `Standard` matches what the hosted model is prompted with by default.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LongSidePreset {
    /// 768px longest side, for slow or metered connections
    Compact,
    /// 1024px longest side
    #[default]
    Standard,
    /// 1536px longest side, keeps more surface detail at roughly twice the upload size
    Detail,
}

impl LongSidePreset {
    /// Longest side in pixels for this preset.
    pub fn max_long_side(self) -> u32 {
        match self {
            LongSidePreset::Compact => 768,
            LongSidePreset::Standard => 1024,
            LongSidePreset::Detail => 1536,
        }
    }

    /// Convert preset to the corresponding ScaleTarget for plan computation.
    pub fn to_target(self) -> ScaleTarget {
        ScaleTarget::MaxLongSide(self.max_long_side())
    }
}
