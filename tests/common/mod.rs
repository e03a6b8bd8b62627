//! Common test utilities and helpers for the card_grade tests
//!
//! Synthetic photos plus scripted stand-ins for the camera, the grading
//! service and the UI.

#![allow(dead_code)]

/// Synthetic photos
pub mod test_photos {
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    /// Typical phone camera size, landscape
    pub const PHONE_W: u32 = 4032;
    pub const PHONE_H: u32 = 3024;

    /// Gradient photo, encoded as JPEG
    pub fn jpeg(w: u32, h: u32) -> Vec<u8> {
        encode(gradient(w, h), ImageFormat::Jpeg)
    }

    /// Gradient photo, encoded as PNG
    pub fn png(w: u32, h: u32) -> Vec<u8> {
        encode(gradient(w, h), ImageFormat::Png)
    }

    /// JPEG carrying an EXIF orientation tag
    pub fn jpeg_with_orientation(w: u32, h: u32, orientation: u16) -> Vec<u8> {
        let plain = jpeg(w, h);
        assert_eq!(&plain[..2], &[0xFF, 0xD8], "encoder did not produce a JPEG");

        let mut out = Vec::with_capacity(plain.len() + 36);
        out.extend_from_slice(&plain[..2]);
        out.extend_from_slice(&exif_app1(orientation));
        out.extend_from_slice(&plain[2..]);
        out
    }

    /// APP1 segment with a big-endian TIFF header and a single IFD0 entry
    fn exif_app1(orientation: u16) -> Vec<u8> {
        let [hi, lo] = orientation.to_be_bytes();
        let mut seg = vec![0xFF, 0xE1, 0x00, 0x22];
        seg.extend_from_slice(b"Exif\0\0");
        seg.extend_from_slice(&[b'M', b'M', 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08]);
        seg.extend_from_slice(&[0x00, 0x01]);
        seg.extend_from_slice(&[0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01, hi, lo, 0x00, 0x00]);
        seg.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        seg
    }

    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            Rgb([
                ((x as f32 / w as f32) * 255.0) as u8,
                ((y as f32 / h as f32) * 255.0) as u8,
                128,
            ])
        })
    }

    fn encode(img: RgbImage, format: ImageFormat) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, format).expect("encode test photo");
        out.into_inner()
    }
}

/// Scripted camera, grader and presenter
pub mod mocks {
    use async_trait::async_trait;
    use card_grade::capture::{CaptureSource, CapturedImage};
    use card_grade::grading::{Grader, Verdict};
    use card_grade::processing::EncodedImage;
    use card_grade::session::Presenter;
    use card_grade::store::UploadRecord;
    use card_grade::{GradeError, GradeResult};
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Camera that hands back fixed bytes, or fails like a denied permission
    pub struct MockCamera {
        bytes: Option<Vec<u8>>,
        path: PathBuf,
        delay: Duration,
    }

    impl MockCamera {
        pub fn with_photo(bytes: Vec<u8>) -> Self {
            Self {
                bytes: Some(bytes),
                path: PathBuf::from("/photos/IMG_1700000000000.jpg"),
                delay: Duration::ZERO,
            }
        }

        pub fn denied() -> Self {
            Self {
                bytes: None,
                path: PathBuf::new(),
                delay: Duration::ZERO,
            }
        }

        /// Wait this long before the shutter fires
        pub fn slow(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn photo_path(&self) -> &PathBuf {
            &self.path
        }
    }

    #[async_trait]
    impl CaptureSource for MockCamera {
        fn name(&self) -> &str {
            "mock camera"
        }

        async fn capture(&self) -> GradeResult<CapturedImage> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match &self.bytes {
                Some(bytes) => Ok(CapturedImage {
                    bytes: bytes.clone(),
                    path: self.path.clone(),
                }),
                None => Err(GradeError::capture("mock camera", "camera permission denied")),
            }
        }
    }

    /// How the scripted grader answers
    pub enum Script {
        Verdict(String),
        NoValidResponse,
        Unreachable,
    }

    /// Grader that answers from a script and records what it was sent
    pub struct ScriptedGrader {
        script: Script,
        delay: Duration,
        calls: AtomicUsize,
        last_size: Mutex<Option<(u32, u32)>>,
    }

    impl ScriptedGrader {
        pub fn new(script: Script) -> Self {
            Self {
                script,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
                last_size: Mutex::new(None),
            }
        }

        pub fn answering(text: &str) -> Self {
            Self::new(Script::Verdict(text.to_string()))
        }

        pub fn slow(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn last_size(&self) -> Option<(u32, u32)> {
            *self.last_size.lock().unwrap()
        }
    }

    #[async_trait]
    impl Grader for ScriptedGrader {
        async fn grade(&self, image: &EncodedImage) -> GradeResult<Verdict> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_size.lock().unwrap() = Some((image.size.w, image.size.h));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match &self.script {
                Script::Verdict(text) => Ok(Verdict::Graded(text.clone())),
                Script::NoValidResponse => Ok(Verdict::NoValidResponse),
                Script::Unreachable => Err(GradeError::network("grading request")
                    .with_address("http://127.0.0.1:9/v1/chat/completions")),
            }
        }
    }

    /// Presenter that remembers everything it was asked to show
    #[derive(Default)]
    pub struct RecordingPresenter {
        pub details: Mutex<Vec<UploadRecord>>,
        pub messages: Mutex<Vec<String>>,
    }

    impl RecordingPresenter {
        pub fn details(&self) -> Vec<UploadRecord> {
            self.details.lock().unwrap().clone()
        }

        pub fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl Presenter for RecordingPresenter {
        fn show_detail(&self, record: &UploadRecord) {
            self.details.lock().unwrap().push(record.clone());
        }

        fn show_message(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }
}

/// Custom assertions for testing
pub mod assertions {
    /// Assert that `(w, h)` has the aspect ratio of `(src_w, src_h)` within rounding
    pub fn assert_aspect_preserved(src: (u32, u32), out: (u32, u32)) {
        let expected = out.0 as f64 * src.1 as f64 / src.0 as f64;
        assert!(
            (expected - out.1 as f64).abs() <= 1.0,
            "aspect changed: {}x{} -> {}x{}",
            src.0,
            src.1,
            out.0,
            out.1
        );
    }

    /// Assert that the longest side does not exceed `max`
    pub fn assert_long_side_at_most(size: (u32, u32), max: u32) {
        assert!(
            size.0.max(size.1) <= max,
            "longest side of {}x{} exceeds {}",
            size.0,
            size.1,
            max
        );
    }
}
