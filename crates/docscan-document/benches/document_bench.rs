// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the docscan-document crate: the full enhancement
// pipeline and its most expensive step on a synthetic page.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, Rgb, RgbImage};

use docscan_document::{ScanEnhancer, enhance};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A 640x480 colour "page": light paper darkening towards one side, crossed
/// by dark bands standing in for lines of text.
fn synthetic_page() -> DynamicImage {
    let (width, height) = (640u32, 480u32);
    let img = RgbImage::from_fn(width, height, |x, y| {
        let paper = 235 - (70 * x / width) as u8;
        let ink = (y / 12) % 3 == 1 && (x / 9) % 5 != 0;
        let v = if ink { paper / 4 } else { paper };
        Rgb([v, v, v.saturating_sub(8)])
    });
    DynamicImage::ImageRgb8(img)
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_enhance(c: &mut Criterion) {
    let page = synthetic_page();

    c.bench_function("enhance (640x480 rgb)", |b| {
        b.iter(|| black_box(enhance(black_box(&page))));
    });
}

fn bench_local_contrast(c: &mut Criterion) {
    let gray = ScanEnhancer::from_dynamic(synthetic_page())
        .grayscale()
        .into_dynamic();

    c.bench_function("equalize_local_contrast (640x480)", |b| {
        b.iter(|| {
            let enhancer = ScanEnhancer::from_dynamic(black_box(gray.clone()));
            black_box(enhancer.equalize_local_contrast().into_dynamic());
        });
    });
}

criterion_group!(benches, bench_enhance, bench_local_contrast);
criterion_main!(benches);
