// SPDX-License-Identifier: MIT
//! # grade-scale: Longest-Side Downscaling for Vision Model Input
//!
//! Photos straight off a phone camera are far larger than a hosted vision model
//! needs to judge centering, corners, edges and surface. This crate computes a
//! scale plan that clamps the longest side while preserving aspect ratio, and
//! executes it on tightly packed RGB8 buffers with `fast_image_resize`.
//!
//! ## Key Components
//!
//! - [`presets`]: Scale plan computation and the named long-side presets
//! - [`cpu`]: CPU scaling via SIMD-accelerated `fast_image_resize`
//!
//! ## Usage Example
//!
//! ```rust
//! use grade_scale::cpu::scale_rgb8_cpu;
//! use grade_scale::presets::{build_plan, ScaleTarget, Size};
//!
//! let input = Size { w: 4032, h: 3024 };
//! let plan = build_plan(input, ScaleTarget::MaxLongSide(1024));
//! assert_eq!((plan.out.w, plan.out.h), (1024, 768));
//!
//! let src = vec![0u8; (input.w * input.h * 3) as usize];
//! let mut dst = vec![0u8; plan.output_len()];
//! let mut resizer = fast_image_resize::Resizer::new();
//! scale_rgb8_cpu(&mut resizer, &src, &plan, &mut dst)?;
//! # Ok::<(), grade_scale::cpu::ScaleError>(())
//! ```

pub mod cpu;
pub mod presets;
