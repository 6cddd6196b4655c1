// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan enhancement pipeline — luminance conversion, noise suppression, local
// contrast equalization, and global binarization for camera-captured pages.

use std::panic::{AssertUnwindSafe, catch_unwind};

use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;
use tracing::{debug, info, instrument, warn};

/// Gaussian sigma for the denoise pass. Matches a 3x3 kernel at automatic
/// sigma (0.3 * ((3 - 1) * 0.5 - 1) + 0.8).
const DENOISE_SIGMA: f32 = 0.8;

/// Contrast limit for the tiled equalization, relative to a flat histogram.
const CLAHE_CLIP_LIMIT: f32 = 2.0;

/// Tiles per axis for the tiled equalization.
const CLAHE_GRID: u32 = 8;

/// Number of grey levels in an 8-bit image.
const LEVELS: usize = 256;

/// Enhances camera-captured document images for text recognition.
///
/// Each step consumes `self` and returns the transformed enhancer, so the
/// fixed pipeline reads top to bottom:
///
/// ```ignore
/// let binary = ScanEnhancer::from_dynamic(frame)
///     .grayscale()
///     .denoise()
///     .equalize_local_contrast()
///     .binarize_otsu()
///     .into_dynamic();
/// ```
///
/// The step order is fixed: denoise before equalizing, equalize before
/// thresholding.
pub struct ScanEnhancer {
    /// The working image.
    image: DynamicImage,
}

impl ScanEnhancer {
    // -- Construction ---------------------------------------------------------

    /// Create an enhancer wrapping an existing `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    /// Borrow the current working image.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Consume the enhancer and return the underlying image.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Pipeline steps -------------------------------------------------------

    /// Reduce to single-channel luminance. No-op for 8-bit grayscale input.
    pub fn grayscale(self) -> Self {
        match self.image {
            DynamicImage::ImageLuma8(_) => self,
            other => Self {
                image: DynamicImage::ImageLuma8(other.to_luma8()),
            },
        }
    }

    /// Small-kernel Gaussian smoothing to suppress sensor noise.
    pub fn denoise(self) -> Self {
        let gray = self.luma();
        if is_degenerate(&gray) {
            return Self::from_gray(gray);
        }
        let blurred = gaussian_blur_f32(&gray, DENOISE_SIGMA);
        debug!(sigma = DENOISE_SIGMA, "Applied Gaussian denoise");
        Self::from_gray(blurred)
    }

    /// Contrast-limited adaptive histogram equalization over an 8x8 tile
    /// grid, flattening uneven lighting across the page.
    pub fn equalize_local_contrast(self) -> Self {
        let gray = self.luma();
        if is_degenerate(&gray) {
            return Self::from_gray(gray);
        }
        let equalized = clahe(&gray, CLAHE_CLIP_LIMIT, CLAHE_GRID);
        debug!(
            clip_limit = CLAHE_CLIP_LIMIT,
            grid = CLAHE_GRID,
            "Applied local contrast equalization"
        );
        Self::from_gray(equalized)
    }

    /// Global binarization at the Otsu threshold.
    ///
    /// Pixels above the threshold become white (255), the rest black (0).
    pub fn binarize_otsu(self) -> Self {
        let gray = self.luma();
        let threshold = otsu_threshold(&gray);
        debug!(threshold, "Otsu threshold computed");

        let mut output = gray;
        for pixel in output.pixels_mut() {
            pixel.0[0] = if pixel.0[0] > threshold { 255 } else { 0 };
        }
        Self::from_gray(output)
    }

    /// Run the full fixed pipeline:
    ///
    /// 1. Convert to grayscale
    /// 2. Gaussian denoise
    /// 3. Tiled contrast-limited equalization
    /// 4. Otsu binarization
    pub fn enhance_for_ocr(self) -> Self {
        self.grayscale()
            .denoise()
            .equalize_local_contrast()
            .binarize_otsu()
    }

    // -- Internals ------------------------------------------------------------

    fn luma(self) -> GrayImage {
        match self.image {
            DynamicImage::ImageLuma8(gray) => gray,
            other => other.to_luma8(),
        }
    }

    fn from_gray(gray: GrayImage) -> Self {
        Self {
            image: DynamicImage::ImageLuma8(gray),
        }
    }
}

/// Enhance a captured frame for recognition.
///
/// Deterministic and infallible: if any step panics, the unmodified frame is
/// returned instead and the fallback is logged.
#[instrument(skip_all, fields(width = frame.width(), height = frame.height()))]
pub fn enhance(frame: &DynamicImage) -> DynamicImage {
    let working = frame.clone();
    match catch_unwind(AssertUnwindSafe(move || {
        ScanEnhancer::from_dynamic(working).enhance_for_ocr().into_dynamic()
    })) {
        Ok(enhanced) => {
            info!("Scan enhancement complete");
            enhanced
        }
        Err(_) => {
            warn!("Image enhancement failed; using the original frame");
            frame.clone()
        }
    }
}

/// Images with no pixels pass through the filters untouched.
fn is_degenerate(gray: &GrayImage) -> bool {
    gray.width() == 0 || gray.height() == 0
}

// -- Contrast-limited adaptive histogram equalization -------------------------

/// Equalize `gray` tile by tile with a clipped histogram, then blend the four
/// nearest tile mappings bilinearly so tile seams do not show.
fn clahe(gray: &GrayImage, clip_limit: f32, grid: u32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let tiles_x = grid.min(width).max(1);
    let tiles_y = grid.min(height).max(1);
    let tile_w = width.div_ceil(tiles_x);
    let tile_h = height.div_ceil(tiles_y);
    // Rounded-up tiles can cover the image in fewer than `grid` steps.
    let tiles_x = width.div_ceil(tile_w);
    let tiles_y = height.div_ceil(tile_h);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);
            luts.push(tile_lut(gray, x0, y0, x1, y1, clip_limit));
        }
    }
    let lut_at = |tx: u32, ty: u32| &luts[(ty * tiles_x + tx) as usize];

    let inv_tw = 1.0 / tile_w as f32;
    let inv_th = 1.0 / tile_h as f32;
    let mut output = GrayImage::new(width, height);

    for y in 0..height {
        let (ty1, ty2, ya) = neighbours(y, inv_th, tiles_y);
        for x in 0..width {
            let (tx1, tx2, xa) = neighbours(x, inv_tw, tiles_x);
            let v = gray.get_pixel(x, y).0[0] as usize;

            let top = lut_at(tx1, ty1)[v] as f32 * (1.0 - xa) + lut_at(tx2, ty1)[v] as f32 * xa;
            let bottom = lut_at(tx1, ty2)[v] as f32 * (1.0 - xa) + lut_at(tx2, ty2)[v] as f32 * xa;
            let blended = top * (1.0 - ya) + bottom * ya;

            output.put_pixel(x, y, Luma([blended.round().clamp(0.0, 255.0) as u8]));
        }
    }

    output
}

/// Indices of the two tiles whose centres bracket `pos`, and the weight of
/// the second one.
fn neighbours(pos: u32, inv_tile: f32, tiles: u32) -> (u32, u32, f32) {
    let f = pos as f32 * inv_tile - 0.5;
    let lower = f.floor();
    let weight = f - lower;
    let last = (tiles - 1) as f32;
    let t1 = lower.clamp(0.0, last) as u32;
    let t2 = (lower + 1.0).clamp(0.0, last) as u32;
    (t1, t2, weight)
}

/// Clipped-histogram equalization mapping for one tile.
fn tile_lut(gray: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, clip_limit: f32) -> [u8; LEVELS] {
    let mut hist = [0u32; LEVELS];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[gray.get_pixel(x, y).0[0] as usize] += 1;
        }
    }

    let area = (x1 - x0) * (y1 - y0);
    let mut lut = [0u8; LEVELS];
    if area == 0 {
        for (i, slot) in lut.iter_mut().enumerate() {
            *slot = i as u8;
        }
        return lut;
    }

    clip_histogram(&mut hist, clip_limit, area);

    let scale = 255.0 / area as f32;
    let mut sum = 0u32;
    for (slot, &count) in lut.iter_mut().zip(hist.iter()) {
        sum += count;
        *slot = (sum as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

/// Cap every bin at `clip_limit` times the flat-histogram height and spread
/// the excess evenly, remainder one count at a time.
fn clip_histogram(hist: &mut [u32; LEVELS], clip_limit: f32, area: u32) {
    let limit = ((clip_limit * area as f32 / LEVELS as f32) as u32).max(1);

    let mut clipped = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            clipped += *bin - limit;
            *bin = limit;
        }
    }

    let batch = clipped / LEVELS as u32;
    let mut residual = clipped - batch * LEVELS as u32;
    for bin in hist.iter_mut() {
        *bin += batch;
    }
    if residual > 0 {
        let step = (LEVELS / residual as usize).max(1);
        for bin in hist.iter_mut().step_by(step) {
            if residual == 0 {
                break;
            }
            *bin += 1;
            residual -= 1;
        }
    }
}

// -- Thresholding -------------------------------------------------------------

/// Compute the Otsu threshold for a grayscale image.
///
/// Finds the threshold value that maximises the between-class variance of
/// the dark and light pixel groups.
fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; LEVELS];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total_pixels = gray.width() as u64 * gray.height() as u64;
    if total_pixels == 0 {
        return 128;
    }

    let mut sum_total: f64 = 0.0;
    for (i, &count) in histogram.iter().enumerate() {
        sum_total += i as f64 * count as f64;
    }

    let mut sum_background: f64 = 0.0;
    let mut weight_background: u64 = 0;
    let mut max_variance: f64 = 0.0;
    let mut best_threshold: u8 = 0;

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count;
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total_pixels - weight_background;
        if weight_foreground == 0 {
            break;
        }

        sum_background += t as f64 * count as f64;
        let mean_background = sum_background / weight_background as f64;
        let mean_foreground = (sum_total - sum_background) / weight_foreground as f64;

        let between_variance = weight_background as f64
            * weight_foreground as f64
            * (mean_background - mean_foreground).powi(2);

        if between_variance > max_variance {
            max_variance = between_variance;
            best_threshold = t as u8;
        }
    }

    best_threshold
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    /// A page with a left-to-right lighting gradient and dark "text" bars.
    fn unevenly_lit_page(width: u32, height: u32) -> RgbImage {
        let mut img = RgbImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                // Paper brightness falls from 230 to 150 across the page.
                let paper = 230 - (80 * x / width) as u8;
                let is_text = (y / 6) % 3 == 1 && (x / 4) % 4 != 0;
                let v = if is_text { paper - 110 } else { paper };
                img.put_pixel(x, y, Rgb([v, v, v]));
            }
        }
        img
    }

    fn is_binary(img: &DynamicImage) -> bool {
        img.as_luma8()
            .map(|g| g.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255))
            .unwrap_or(false)
    }

    #[test]
    fn enhance_is_deterministic() {
        let frame = DynamicImage::ImageRgb8(unevenly_lit_page(96, 72));
        let first = enhance(&frame);
        let second = enhance(&frame);
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn enhance_produces_two_level_single_channel_image() {
        let frame = DynamicImage::ImageRgb8(unevenly_lit_page(96, 72));
        let out = enhance(&frame);
        assert_eq!(out.width(), 96);
        assert_eq!(out.height(), 72);
        assert!(is_binary(&out), "output should contain only 0 and 255");
    }

    #[test]
    fn enhance_separates_text_from_unevenly_lit_paper() {
        let frame = DynamicImage::ImageRgb8(unevenly_lit_page(128, 96));
        let out = enhance(&frame);
        let gray = out.as_luma8().unwrap();

        // Paper on the dark right-hand side must still come out white, and
        // text on the bright left-hand side must still come out black.
        assert_eq!(gray.get_pixel(120, 2).0[0], 255, "dim paper should be white");
        assert_eq!(gray.get_pixel(10, 8).0[0], 0, "text on bright paper should be black");
    }

    #[test]
    fn enhance_accepts_single_channel_input() {
        let gray = GrayImage::from_fn(40, 30, |x, y| Luma([((x * 7 + y * 3) % 256) as u8]));
        let out = enhance(&DynamicImage::ImageLuma8(gray));
        assert!(is_binary(&out));
    }

    #[test]
    fn enhance_accepts_already_binary_input() {
        let binary = GrayImage::from_fn(32, 32, |x, _| Luma([if x < 16 { 0 } else { 255 }]));
        let out = enhance(&DynamicImage::ImageLuma8(binary));
        let gray = out.as_luma8().unwrap();
        assert_eq!(gray.get_pixel(2, 16).0[0], 0);
        assert_eq!(gray.get_pixel(30, 16).0[0], 255);
    }

    #[test]
    fn enhance_handles_uniform_and_tiny_images() {
        let flat = DynamicImage::ImageLuma8(GrayImage::from_pixel(20, 20, Luma([200])));
        assert!(is_binary(&enhance(&flat)));

        let tiny = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 2, Rgb([10, 200, 30])));
        let out = enhance(&tiny);
        assert_eq!((out.width(), out.height()), (3, 2));
    }

    #[test]
    fn enhance_is_binary_for_every_small_size() {
        let sizes = (1..=64u32).flat_map(|n| [(n, 40), (40, n), (n, n)]);
        for (w, h) in sizes {
            let page = DynamicImage::ImageRgb8(unevenly_lit_page(w, h));
            let out = enhance(&page);
            assert_eq!((out.width(), out.height()), (w, h));
            assert!(is_binary(&out), "{w}x{h} was not binarized");
        }
    }

    #[test]
    fn clahe_covers_sizes_not_divisible_by_grid() {
        for (w, h) in [(9, 40), (40, 9), (10, 13), (17, 25), (20, 20)] {
            let gray = GrayImage::from_fn(w, h, |x, y| Luma([((x * 7 + y * 3) % 256) as u8]));
            let out = clahe(&gray, CLAHE_CLIP_LIMIT, CLAHE_GRID);
            assert_eq!(out.dimensions(), (w, h));
        }
    }

    #[test]
    fn enhance_tolerates_empty_image() {
        let empty = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        let out = enhance(&empty);
        assert_eq!((out.width(), out.height()), (0, 0));
    }

    #[test]
    fn enhance_accepts_rgba_and_16_bit_input() {
        let rgba = DynamicImage::new_rgba8(16, 16);
        assert!(is_binary(&enhance(&rgba)));
        let wide = DynamicImage::new_luma16(16, 16);
        assert!(is_binary(&enhance(&wide)));
    }

    #[test]
    fn grayscale_is_noop_for_luma8() {
        let gray = GrayImage::from_pixel(4, 4, Luma([77]));
        let out = ScanEnhancer::from_dynamic(DynamicImage::ImageLuma8(gray.clone()))
            .grayscale()
            .into_dynamic();
        assert_eq!(out.as_luma8(), Some(&gray));
    }

    #[test]
    fn otsu_splits_bimodal_histogram() {
        let img = GrayImage::from_fn(10, 10, |x, _| Luma([if x < 5 { 40 } else { 210 }]));
        let t = otsu_threshold(&img);
        assert!((40..210).contains(&t), "threshold {t} should fall between the modes");
    }

    #[test]
    fn clip_histogram_preserves_total_count() {
        let mut hist = [0u32; LEVELS];
        hist[10] = 900;
        hist[200] = 124;
        let area = 1024;
        clip_histogram(&mut hist, 2.0, area);
        assert_eq!(hist.iter().sum::<u32>(), area);
        assert!(hist[10] < 900);
    }

    #[test]
    fn clahe_keeps_uniform_image_uniform() {
        let flat = GrayImage::from_pixel(64, 64, Luma([120]));
        let out = clahe(&flat, CLAHE_CLIP_LIMIT, CLAHE_GRID);
        let first = out.get_pixel(0, 0).0[0];
        assert!(out.pixels().all(|p| p.0[0] == first));
    }

    #[test]
    fn neighbours_clamp_at_edges() {
        assert_eq!(neighbours(0, 0.1, 8).0, 0);
        let (t1, t2, _) = neighbours(79, 0.1, 8);
        assert_eq!((t1, t2), (7, 7));
    }
}
