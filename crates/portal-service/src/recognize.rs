use anyhow::Result;
use image::GrayImage;

/// Text-recognition capability: a preprocessed image in, zero or more raw
/// text tokens out, in recognizer order. May fail; the pipeline downgrades
/// failures to zero candidates.
pub trait TextRecognizer: Send + Sync {
    fn read_tokens(&self, image: &GrayImage) -> Result<Vec<String>>;
}

/// Recognizer returning a fixed token script regardless of input.
///
/// The default build ships this instead of a native OCR dependency, which
/// keeps the service runnable anywhere and lets the candidate pipeline be
/// exercised with raw-token fixtures.
pub struct ScriptedRecognizer {
    tokens: Vec<String>,
}

impl ScriptedRecognizer {
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }

    /// Parse a comma-separated token script, e.g. from an env variable.
    pub fn from_script(script: &str) -> Self {
        Self::new(
            script
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect(),
        )
    }
}

impl TextRecognizer for ScriptedRecognizer {
    fn read_tokens(&self, _image: &GrayImage) -> Result<Vec<String>> {
        Ok(self.tokens.clone())
    }
}

#[cfg(feature = "tesseract")]
mod tesseract {
    use super::TextRecognizer;
    use anyhow::{Context, Result};
    use image::{DynamicImage, GrayImage};
    use leptess::{LepTess, Variable};
    use std::io::Cursor;

    /// Tesseract adapter restricted to the plate charset.
    ///
    /// A fresh engine is created per call; `LepTess` is not `Sync` and the
    /// pipeline runs on the blocking worker pool anyway.
    pub struct TesseractRecognizer {
        lang: String,
        whitelist: String,
        /// Page segmentation mode: "7" for a single text line (whole frame),
        /// "8" for a single word (cropped region)
        page_seg_mode: String,
    }

    impl TesseractRecognizer {
        pub fn new(
            lang: impl Into<String>,
            whitelist: impl Into<String>,
            page_seg_mode: impl Into<String>,
        ) -> Self {
            Self {
                lang: lang.into(),
                whitelist: whitelist.into(),
                page_seg_mode: page_seg_mode.into(),
            }
        }
    }

    impl TextRecognizer for TesseractRecognizer {
        fn read_tokens(&self, image: &GrayImage) -> Result<Vec<String>> {
            let mut engine = LepTess::new(None, &self.lang)
                .context("failed to initialize tesseract engine")?;
            engine
                .set_variable(Variable::TesseditCharWhitelist, &self.whitelist)
                .context("failed to set char whitelist")?;
            engine
                .set_variable(Variable::TesseditPagesegMode, &self.page_seg_mode)
                .context("failed to set page segmentation mode")?;

            let mut png = Vec::new();
            DynamicImage::ImageLuma8(image.clone())
                .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
                .context("failed to encode image for recognition")?;
            engine
                .set_image_from_mem(&png)
                .context("failed to set recognition image")?;

            let text = engine
                .get_utf8_text()
                .context("failed to read recognized text")?;
            Ok(text.split_whitespace().map(String::from).collect())
        }
    }
}

#[cfg(feature = "tesseract")]
pub use tesseract::TesseractRecognizer;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_recognizer_returns_tokens() {
        let recognizer = ScriptedRecognizer::new(vec!["M222MM136".to_string()]);
        let img = GrayImage::new(8, 8);
        let tokens = recognizer.read_tokens(&img).expect("scripted tokens");
        assert_eq!(tokens, vec!["M222MM136".to_string()]);
    }

    #[test]
    fn test_scripted_recognizer_from_script() {
        let recognizer = ScriptedRecognizer::from_script(" A123BC77 , ,XYZ ");
        let img = GrayImage::new(8, 8);
        let tokens = recognizer.read_tokens(&img).expect("scripted tokens");
        assert_eq!(tokens, vec!["A123BC77".to_string(), "XYZ".to_string()]);
    }
}
