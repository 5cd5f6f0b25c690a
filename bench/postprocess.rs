use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cv_crestereo::prelude::*;
use cv_crestereo::pipeline::compose_output;
use image::{Rgb, RgbImage};

fn postprocess_bench(c: &mut Criterion) {

    // Synthetic disparity at the ETH3D evaluation size
    let (w, h) = (1024, 768);
    let data = (0..w * h).map(|i| ((i % w) as f32 * 0.05).sin() * 40.0 + 60.0).collect();
    let disp = DisparityMap::from_vec(w, h, data).unwrap();

    let lut = Colormap::Inferno.lut();
    let left = RgbImage::from_pixel(w as u32, h as u32, Rgb([90, 90, 90]));
    let right = left.clone();

    c.bench_function("colourise 768x1024", |b| b.iter(|| {
        lut.apply(&black_box(&disp).to_luma_normalised())
    }));

    c.bench_function("compose 768x1024", |b| b.iter(|| {
        let vis = lut.apply(&disp.to_luma_normalised());
        compose_output(&left, &right, &vis).unwrap()
    }));

    // Back to the input resolution of a 2560x720 side-by-side video
    c.bench_function("rescale to 1280x720", |b| b.iter(|| {
        black_box(&disp).rescaled(1280, 720).unwrap()
    }));
}

criterion_group!(benches, postprocess_bench);
criterion_main!(benches);
