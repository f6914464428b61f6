use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::distance_transform::Norm;
use imageproc::morphology::dilate;

/// Axis-aligned rectangle likely to contain a plate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlateRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PlateRegion {
    /// Expand by a fixed padding margin and clamp to image bounds, so edge
    /// glyphs are not clipped out of the crop.
    pub fn padded(&self, pad: u32, image_width: u32, image_height: u32) -> PlateRegion {
        let x0 = self.x.saturating_sub(pad);
        let y0 = self.y.saturating_sub(pad);
        let x1 = (self.x + self.width + pad).min(image_width);
        let y1 = (self.y + self.height + pad).min(image_height);
        PlateRegion {
            x: x0,
            y: y0,
            width: x1.saturating_sub(x0),
            height: y1.saturating_sub(y0),
        }
    }
}

/// Region-detection capability: zero or more plate-like rectangles per frame.
pub trait RegionDetector: Send + Sync {
    fn detect(&self, gray: &GrayImage) -> Vec<PlateRegion>;
}

/// Contour-based plate detector.
///
/// Binarizes the frame, dilates to merge glyph blobs into one connected
/// component per plate, then keeps outer contours whose bounding box has a
/// plate-like aspect ratio and meets the minimum size.
pub struct ContourPlateDetector {
    pub min_width: u32,
    pub min_height: u32,
    pub min_aspect: f32,
    pub max_aspect: f32,
}

impl ContourPlateDetector {
    pub fn new(min_size: (u32, u32)) -> Self {
        Self {
            min_width: min_size.0,
            min_height: min_size.1,
            min_aspect: 2.0,
            max_aspect: 6.5,
        }
    }
}

impl RegionDetector for ContourPlateDetector {
    fn detect(&self, gray: &GrayImage) -> Vec<PlateRegion> {
        if gray.width() == 0 || gray.height() == 0 {
            return Vec::new();
        }

        let level = otsu_level(gray);
        let binary = threshold(gray, level, ThresholdType::Binary);
        let merged = dilate(&binary, Norm::LInf, 2);

        let mut regions = Vec::new();
        for contour in find_contours::<i32>(&merged) {
            if contour.border_type != BorderType::Outer || contour.points.is_empty() {
                continue;
            }
            let min_x = contour.points.iter().map(|p| p.x).min().unwrap_or(0);
            let max_x = contour.points.iter().map(|p| p.x).max().unwrap_or(0);
            let min_y = contour.points.iter().map(|p| p.y).min().unwrap_or(0);
            let max_y = contour.points.iter().map(|p| p.y).max().unwrap_or(0);

            let width = (max_x - min_x + 1).max(0) as u32;
            let height = (max_y - min_y + 1).max(0) as u32;
            if width < self.min_width || height < self.min_height {
                continue;
            }
            let aspect = width as f32 / height as f32;
            if aspect < self.min_aspect || aspect > self.max_aspect {
                continue;
            }

            regions.push(PlateRegion {
                x: min_x.max(0) as u32,
                y: min_y.max(0) as u32,
                width,
                height,
            });
        }

        regions
    }
}

/// Detector returning a fixed set of regions. Used in tests and for
/// deployments where the camera geometry pins the plate location.
pub struct FixedRegionDetector {
    regions: Vec<PlateRegion>,
}

impl FixedRegionDetector {
    pub fn new(regions: Vec<PlateRegion>) -> Self {
        Self { regions }
    }
}

impl RegionDetector for FixedRegionDetector {
    fn detect(&self, _gray: &GrayImage) -> Vec<PlateRegion> {
        self.regions.clone()
    }
}
