use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Plates authorized to open the gate when no PORTAL_ALLOW_LIST is provided.
pub const DEFAULT_ALLOW_LIST: &[&str] = &[
    "М222ММ136",
    "А123ВС77",
    "К456ЕК99",
    "Р789ТУ66",
    "С321АД50",
    "Т224ЕМ71",
];

const DEFAULT_HALL_SENSOR_PHRASE: &str = "Прием. Холл сработал!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineVariant {
    /// Recognize over the whole preprocessed frame
    Frame,
    /// Detect plate regions first, recognize each region independently
    Region,
}

#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// Address to bind the HTTP server to
    pub bind_addr: String,

    /// Directory where uploaded payloads are persisted
    pub upload_dir: String,

    /// Authorized plate identifiers, exact strings
    pub allow_list: Vec<String>,

    /// Which recognition pipeline to run
    pub variant: PipelineVariant,

    /// Minimum similarity for the fuzzy fallback to report a match.
    /// 0.0 reproduces the original closest-of-all policy.
    pub fuzzy_min_similarity: f64,

    /// Advisory phrase the edge device sends when the hall sensor trips
    pub hall_sensor_phrase: String,

    pub pipeline: PipelineConfig,
}

impl PortalConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = env::var("PORTAL_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".to_string());
        let upload_dir = env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string());

        let allow_list = match env::var("PORTAL_ALLOW_LIST") {
            Ok(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            Err(_) => DEFAULT_ALLOW_LIST.iter().map(|s| s.to_string()).collect(),
        };

        let variant = match env::var("PIPELINE_VARIANT")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "region" => PipelineVariant::Region,
            _ => PipelineVariant::Frame,
        };

        let fuzzy_min_similarity = env::var("FUZZY_MIN_SIMILARITY")
            .ok()
            .map(|v| v.parse::<f64>().context("Invalid FUZZY_MIN_SIMILARITY"))
            .transpose()?
            .unwrap_or(0.0);

        let hall_sensor_phrase = env::var("HALL_SENSOR_PHRASE")
            .unwrap_or_else(|_| DEFAULT_HALL_SENSOR_PHRASE.to_string());

        let pipeline = match env::var("PIPELINE_CONFIG") {
            Ok(raw) => serde_json::from_str(&raw).context("Invalid PIPELINE_CONFIG")?,
            Err(_) => PipelineConfig::for_variant(variant),
        };

        Ok(Self {
            bind_addr,
            upload_dir,
            allow_list,
            variant,
            fuzzy_min_similarity,
            hall_sensor_phrase,
            pipeline,
        })
    }
}

/// Smoothing pass applied after binarization to suppress speckle noise
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum Smoothing {
    Median { radius: u32 },
    Gaussian { sigma: f32 },
}

impl Default for Smoothing {
    fn default() -> Self {
        Self::Median { radius: 1 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Characters the recognizer is allowed to emit; everything else is stripped
    #[serde(default = "default_charset")]
    pub charset: String,

    /// Visually-confusable character corrections applied before the charset filter
    #[serde(default = "default_confusion_map")]
    pub confusion_map: Vec<(char, char)>,

    /// Fixed upscale factor applied before recognition
    #[serde(default = "default_scale_factor")]
    pub scale_factor: u32,

    /// Clip limit for tiled histogram equalization
    #[serde(default = "default_clahe_clip_limit")]
    pub clahe_clip_limit: f32,

    /// Tile grid dimension for tiled histogram equalization (grid x grid tiles)
    #[serde(default = "default_clahe_grid")]
    pub clahe_grid: u32,

    #[serde(default)]
    pub smoothing: Smoothing,

    /// Upper bound on candidates returned per decision
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    /// Full-match plate grammar; candidates failing it are dropped. None disables the check.
    #[serde(default)]
    pub plate_grammar: Option<String>,

    /// Padding added around each detected region before cropping
    #[serde(default = "default_region_padding")]
    pub region_padding: u32,

    /// Smallest region a conforming detector may report (width, height)
    #[serde(default = "default_min_region_size")]
    pub min_region_size: (u32, u32),
}

fn default_charset() -> String {
    "АВЕКМНОРСТУХ0123456789".to_string()
}

fn default_confusion_map() -> Vec<(char, char)> {
    // Latin homoglyphs the recognizer emits for Cyrillic plate glyphs
    vec![
        ('A', 'А'),
        ('B', 'В'),
        ('C', 'С'),
        ('E', 'Е'),
        ('H', 'Н'),
        ('K', 'К'),
        ('M', 'М'),
        ('P', 'Р'),
        ('T', 'Т'),
        ('X', 'Х'),
        ('Y', 'У'),
        ('N', 'М'),
        ('I', '1'),
        ('O', '0'),
    ]
}

fn default_scale_factor() -> u32 {
    3
}

fn default_clahe_clip_limit() -> f32 {
    2.0
}

fn default_clahe_grid() -> u32 {
    8
}

fn default_max_candidates() -> usize {
    5
}

fn default_region_padding() -> u32 {
    15
}

fn default_min_region_size() -> (u32, u32) {
    (80, 25)
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            charset: default_charset(),
            confusion_map: default_confusion_map(),
            scale_factor: default_scale_factor(),
            clahe_clip_limit: default_clahe_clip_limit(),
            clahe_grid: default_clahe_grid(),
            smoothing: Smoothing::default(),
            max_candidates: default_max_candidates(),
            plate_grammar: None,
            region_padding: default_region_padding(),
            min_region_size: default_min_region_size(),
        }
    }
}

impl PipelineConfig {
    /// Defaults for the whole-frame pipeline: Cyrillic charset, no grammar,
    /// median smoothing.
    pub fn frame_defaults() -> Self {
        Self::default()
    }

    /// Defaults for the region pipeline: Latin charset matching the
    /// single-alphabet recognizer, digit-shape corrections, plate grammar
    /// enforced, Gaussian smoothing.
    pub fn region_defaults() -> Self {
        Self {
            charset: "ABEKMHOPCTYX0123456789".to_string(),
            confusion_map: vec![('O', '0'), ('Q', '0'), ('I', '1'), ('Z', '2'), ('B', '8')],
            smoothing: Smoothing::Gaussian { sigma: 0.8 },
            plate_grammar: Some(r"^[ABEKMHOPCTYX]\d{3}[ABEKMHOPCTYX]{2}\d{2,3}$".to_string()),
            ..Self::default()
        }
    }

    pub fn for_variant(variant: PipelineVariant) -> Self {
        match variant {
            PipelineVariant::Frame => Self::frame_defaults(),
            PipelineVariant::Region => Self::region_defaults(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_defaults() {
        let config = PipelineConfig::frame_defaults();
        assert_eq!(config.scale_factor, 3);
        assert_eq!(config.max_candidates, 5);
        assert!(config.plate_grammar.is_none());
        assert!(config.charset.contains('М'));
        assert!(config.charset.contains("0123456789"));
        assert_eq!(config.smoothing, Smoothing::Median { radius: 1 });
    }

    #[test]
    fn test_region_defaults() {
        let config = PipelineConfig::region_defaults();
        assert!(config.plate_grammar.is_some());
        assert!(config.charset.contains('B'));
        assert_eq!(config.region_padding, 15);
        assert_eq!(config.min_region_size, (80, 25));
        assert!(matches!(config.smoothing, Smoothing::Gaussian { .. }));
    }

    #[test]
    fn test_pipeline_config_from_json_fills_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"scale_factor": 2}"#).expect("valid config json");
        assert_eq!(config.scale_factor, 2);
        assert_eq!(config.clahe_grid, 8);
        assert_eq!(config.max_candidates, 5);
    }
}
