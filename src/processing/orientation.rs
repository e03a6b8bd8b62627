//! EXIF orientation handling for phone photos.
//!
//! Phones store the sensor image as-is and record how to rotate it in EXIF tag
//! 0x0112. Without honouring the tag a portrait card arrives at the grading
//! service lying on its side.

use std::io::Cursor;

use image::DynamicImage;

/// EXIF orientation values 1-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// 1: already upright
    #[default]
    Normal,
    /// 2: mirrored left-right
    MirrorHorizontal,
    /// 3: upside down
    Rotate180,
    /// 4: mirrored top-bottom
    MirrorVertical,
    /// 5: mirrored along the main diagonal
    Transpose,
    /// 6: needs a 90° clockwise turn
    Rotate90,
    /// 7: mirrored along the anti-diagonal
    Transverse,
    /// 8: needs a 270° clockwise turn
    Rotate270,
}

impl Orientation {
    /// Map a raw tag value; anything outside 1-8 is treated as upright.
    pub fn from_exif(value: u32) -> Self {
        match value {
            2 => Self::MirrorHorizontal,
            3 => Self::Rotate180,
            4 => Self::MirrorVertical,
            5 => Self::Transpose,
            6 => Self::Rotate90,
            7 => Self::Transverse,
            8 => Self::Rotate270,
            _ => Self::Normal,
        }
    }

    /// True when applying the orientation swaps width and height.
    pub fn swaps_dimensions(self) -> bool {
        matches!(
            self,
            Self::Transpose | Self::Rotate90 | Self::Transverse | Self::Rotate270
        )
    }

    /// Rotate/flip `img` so its visual top is up.
    pub fn apply(self, img: DynamicImage) -> DynamicImage {
        match self {
            Self::Normal => img,
            Self::MirrorHorizontal => img.fliph(),
            Self::Rotate180 => img.rotate180(),
            Self::MirrorVertical => img.flipv(),
            Self::Transpose => img.rotate90().fliph(),
            Self::Rotate90 => img.rotate90(),
            Self::Transverse => img.rotate270().fliph(),
            Self::Rotate270 => img.rotate270(),
        }
    }
}

/// Read the orientation tag from encoded image bytes.
/// Returns [`Orientation::Normal`] if there is no EXIF block or no tag.
pub fn read_exif_orientation(bytes: &[u8]) -> Orientation {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return Orientation::Normal,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .map(Orientation::from_exif)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};

    fn marked(w: u32, h: u32) -> DynamicImage {
        // red marker in the top-left corner
        let mut img = RgbImage::from_pixel(w, h, Rgb([0, 0, 0]));
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        DynamicImage::ImageRgb8(img)
    }

    fn red_at(img: &DynamicImage) -> (u32, u32) {
        let (w, h) = img.dimensions();
        for y in 0..h {
            for x in 0..w {
                if img.get_pixel(x, y).0[0] == 255 {
                    return (x, y);
                }
            }
        }
        panic!("marker lost");
    }

    #[test]
    fn no_exif_is_normal() {
        assert_eq!(read_exif_orientation(b"\x89PNG not an exif container"), Orientation::Normal);
        assert_eq!(read_exif_orientation(&[]), Orientation::Normal);
    }

    #[test]
    fn out_of_range_values_are_normal() {
        assert_eq!(Orientation::from_exif(0), Orientation::Normal);
        assert_eq!(Orientation::from_exif(9), Orientation::Normal);
        assert_eq!(Orientation::from_exif(6), Orientation::Rotate90);
    }

    #[test]
    fn rotate90_moves_top_left_to_top_right() {
        let out = Orientation::Rotate90.apply(marked(4, 2));
        assert_eq!(out.dimensions(), (2, 4));
        assert_eq!(red_at(&out), (1, 0));
    }

    #[test]
    fn rotate270_moves_top_left_to_bottom_left() {
        let out = Orientation::Rotate270.apply(marked(4, 2));
        assert_eq!(out.dimensions(), (2, 4));
        assert_eq!(red_at(&out), (0, 3));
    }

    #[test]
    fn transpose_keeps_top_left() {
        let out = Orientation::Transpose.apply(marked(4, 2));
        assert_eq!(out.dimensions(), (2, 4));
        assert_eq!(red_at(&out), (0, 0));
    }

    #[test]
    fn transverse_moves_top_left_to_bottom_right() {
        let out = Orientation::Transverse.apply(marked(4, 2));
        assert_eq!(red_at(&out), (1, 3));
    }

    #[test]
    fn mirrors_and_half_turn() {
        assert_eq!(red_at(&Orientation::MirrorHorizontal.apply(marked(4, 2))), (3, 0));
        assert_eq!(red_at(&Orientation::MirrorVertical.apply(marked(4, 2))), (0, 1));
        assert_eq!(red_at(&Orientation::Rotate180.apply(marked(4, 2))), (3, 1));
        assert!(!Orientation::Rotate180.swaps_dimensions());
        assert!(Orientation::Rotate270.swaps_dimensions());
    }
}
