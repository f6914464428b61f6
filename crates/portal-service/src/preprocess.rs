use crate::config::{PipelineConfig, Smoothing};
use image::imageops::{self, FilterType};
use image::GrayImage;
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::filter::{gaussian_blur_f32, median_filter};

/// Normalize a grayscale frame or region for character recognition.
///
/// The pipeline is fixed and deterministic: cubic upscale, tiled histogram
/// equalization, Otsu binarization, then a small smoothing pass. It never
/// fails for a valid image; an unreadable frame simply yields garbage that
/// downstream matching tolerance absorbs.
pub fn preprocess(gray: &GrayImage, config: &PipelineConfig) -> GrayImage {
    let scale = config.scale_factor.max(1);
    let scaled = imageops::resize(
        gray,
        gray.width() * scale,
        gray.height() * scale,
        FilterType::CatmullRom,
    );

    let equalized = equalize_tiled(&scaled, config.clahe_grid, config.clahe_clip_limit);

    // Ambient lighting is unknown per-request, so the threshold must be
    // derived from the image itself rather than fixed.
    let level = otsu_level(&equalized);
    let binary = threshold(&equalized, level, ThresholdType::Binary);

    match config.smoothing {
        Smoothing::Median { radius } => median_filter(&binary, radius, radius),
        Smoothing::Gaussian { sigma } => gaussian_blur_f32(&binary, sigma),
    }
}

/// Tiled (local) histogram equalization with clip-limit redistribution.
///
/// The image is split into a `grid` x `grid` layout and each tile is
/// equalized independently, which compensates for uneven illumination
/// across the frame better than a single global equalization.
pub fn equalize_tiled(image: &GrayImage, grid: u32, clip_limit: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    let grid = grid.max(1);
    let tile_w = width.div_ceil(grid);
    let tile_h = height.div_ceil(grid);
    let mut out = GrayImage::new(width, height);

    for ty in 0..grid {
        for tx in 0..grid {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            if x0 >= width || y0 >= height {
                continue;
            }
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);
            equalize_tile(image, &mut out, x0, y0, x1, y1, clip_limit);
        }
    }

    out
}

fn equalize_tile(
    image: &GrayImage,
    out: &mut GrayImage,
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
    clip_limit: f32,
) {
    let total = u64::from(x1 - x0) * u64::from(y1 - y0);
    let mut hist = [0u64; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[image.get_pixel(x, y)[0] as usize] += 1;
        }
    }

    // Clip the histogram and spread the excess uniformly so near-flat tiles
    // are not amplified into pure noise.
    let limit = ((clip_limit * total as f32 / 256.0).ceil() as u64).max(1);
    let mut excess = 0u64;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }
    let spread = excess / 256;
    for bin in hist.iter_mut() {
        *bin += spread;
    }

    let mut cdf = [0u64; 256];
    let mut running = 0u64;
    for (value, bin) in hist.iter().enumerate() {
        running += bin;
        cdf[value] = running;
    }
    let cdf_total = running;
    let cdf_min = cdf.iter().copied().find(|&c| c > 0).unwrap_or(0);
    let denom = cdf_total.saturating_sub(cdf_min);

    for y in y0..y1 {
        for x in x0..x1 {
            let value = image.get_pixel(x, y)[0] as usize;
            let mapped = if denom == 0 {
                // Flat tile, nothing to stretch
                value as u8
            } else {
                ((cdf[value].saturating_sub(cdf_min)) * 255 / denom) as u8
            };
            out.put_pixel(x, y, image::Luma([mapped]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;

    fn gradient_image(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, _| {
            image::Luma([(100 + (x % 40)) as u8])
        })
    }

    #[test]
    fn test_preprocess_scales_dimensions() {
        let config = PipelineConfig::frame_defaults();
        let input = gradient_image(64, 32);
        let output = preprocess(&input, &config);
        assert_eq!(output.dimensions(), (64 * 3, 32 * 3));
    }

    #[test]
    fn test_preprocess_median_output_is_binary() {
        let config = PipelineConfig::frame_defaults();
        let input = gradient_image(40, 20);
        let output = preprocess(&input, &config);
        assert!(output.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn test_equalize_tiled_preserves_dimensions() {
        let input = gradient_image(50, 30);
        let output = equalize_tiled(&input, 8, 2.0);
        assert_eq!(output.dimensions(), input.dimensions());
    }

    #[test]
    fn test_equalize_tiled_flat_image_unchanged() {
        let input = GrayImage::from_pixel(32, 32, image::Luma([128]));
        let output = equalize_tiled(&input, 8, 2.0);
        assert!(output.pixels().all(|p| p[0] == 128));
    }

    #[test]
    fn test_equalize_tiled_stretches_low_contrast() {
        // A narrow band of values should spread out after equalization
        let input = gradient_image(64, 64);
        let output = equalize_tiled(&input, 4, 4.0);
        let in_max = input.pixels().map(|p| p[0]).max().unwrap_or(0);
        let in_min = input.pixels().map(|p| p[0]).min().unwrap_or(0);
        let out_max = output.pixels().map(|p| p[0]).max().unwrap_or(0);
        let out_min = output.pixels().map(|p| p[0]).min().unwrap_or(0);
        assert!(out_max - out_min > in_max - in_min);
    }

    #[test]
    fn test_preprocess_deterministic() {
        let config = PipelineConfig::region_defaults();
        let input = gradient_image(48, 24);
        let a = preprocess(&input, &config);
        let b = preprocess(&input, &config);
        assert_eq!(a.as_raw(), b.as_raw());
    }
}
