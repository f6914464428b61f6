use crate::candidates::CandidateNormalizer;
use crate::config::PipelineConfig;
use crate::detect::RegionDetector;
use crate::preprocess::preprocess;
use crate::recognize::TextRecognizer;
use anyhow::Result;
use image::GrayImage;
use std::time::Instant;
use tracing::warn;

/// Photograph bytes in, ordered plate candidates out.
///
/// Implementations never fail: an unreadable image or a recognition engine
/// error is downgraded to zero candidates, which the matcher treats as a
/// denial by absence of evidence.
pub trait PlateReader: Send + Sync {
    fn read_plates(&self, image_bytes: &[u8]) -> Vec<String>;
}

fn decode_gray(image_bytes: &[u8]) -> Option<GrayImage> {
    match image::load_from_memory(image_bytes) {
        Ok(img) => Some(img.to_luma8()),
        Err(e) => {
            warn!("unreadable image, treating as zero candidates: {}", e);
            None
        }
    }
}

fn observe_stage(stage: &str, started: Instant) {
    telemetry::metrics::PORTAL_PIPELINE_STAGE
        .with_label_values(&[stage])
        .observe(started.elapsed().as_secs_f64());
}

/// Whole-frame pipeline: the entire photograph is preprocessed and handed
/// to the recognizer as a single region.
pub struct FramePipeline {
    recognizer: Box<dyn TextRecognizer>,
    normalizer: CandidateNormalizer,
    config: PipelineConfig,
}

impl FramePipeline {
    pub fn new(recognizer: Box<dyn TextRecognizer>, config: PipelineConfig) -> Result<Self> {
        let normalizer = CandidateNormalizer::from_config(&config)?;
        Ok(Self {
            recognizer,
            normalizer,
            config,
        })
    }
}

impl PlateReader for FramePipeline {
    fn read_plates(&self, image_bytes: &[u8]) -> Vec<String> {
        let Some(gray) = decode_gray(image_bytes) else {
            return Vec::new();
        };

        let started = Instant::now();
        let prepared = preprocess(&gray, &self.config);
        observe_stage("preprocess", started);

        let started = Instant::now();
        let raw_tokens = match self.recognizer.read_tokens(&prepared) {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!("recognition failed, treating as zero candidates: {}", e);
                Vec::new()
            }
        };
        observe_stage("recognize", started);

        self.normalizer.extract(raw_tokens)
    }
}

/// Region pipeline: a detector proposes plate rectangles; each is padded,
/// cropped, preprocessed and recognized independently. Candidates from all
/// regions share one deduplicated, bounded list.
pub struct RegionPipeline {
    detector: Box<dyn RegionDetector>,
    recognizer: Box<dyn TextRecognizer>,
    normalizer: CandidateNormalizer,
    config: PipelineConfig,
}

impl RegionPipeline {
    pub fn new(
        detector: Box<dyn RegionDetector>,
        recognizer: Box<dyn TextRecognizer>,
        config: PipelineConfig,
    ) -> Result<Self> {
        let normalizer = CandidateNormalizer::from_config(&config)?;
        Ok(Self {
            detector,
            recognizer,
            normalizer,
            config,
        })
    }
}

impl PlateReader for RegionPipeline {
    fn read_plates(&self, image_bytes: &[u8]) -> Vec<String> {
        let Some(gray) = decode_gray(image_bytes) else {
            return Vec::new();
        };

        let started = Instant::now();
        let regions = self.detector.detect(&gray);
        observe_stage("detect", started);

        let mut raw_tokens = Vec::new();
        for region in regions {
            let padded = region.padded(self.config.region_padding, gray.width(), gray.height());
            if padded.width == 0 || padded.height == 0 {
                continue;
            }
            let crop = image::imageops::crop_imm(
                &gray,
                padded.x,
                padded.y,
                padded.width,
                padded.height,
            )
            .to_image();

            let started = Instant::now();
            let prepared = preprocess(&crop, &self.config);
            observe_stage("preprocess", started);

            let started = Instant::now();
            match self.recognizer.read_tokens(&prepared) {
                Ok(tokens) => raw_tokens.extend(tokens),
                Err(e) => {
                    warn!("recognition failed for region, skipping: {}", e);
                }
            }
            observe_stage("recognize", started);
        }

        self.normalizer.extract(raw_tokens)
    }
}
