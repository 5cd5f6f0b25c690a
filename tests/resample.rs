//! Tensor conversion and bilinear resampling.

use cv_crestereo::tensor::{
    image_to_tensor,
    interpolate_align_corners,
    resize_linear_f32,
    resize_rgb_linear
};
use image::{Rgb, RgbImage};
use ndarray::{Array2, Array4};

#[test]
fn tensor_is_planar_raw_rgb() {
    let img = RgbImage::from_fn(3, 2, |x, y| Rgb([x as u8, y as u8, 200]));
    let t = image_to_tensor(&img);

    assert_eq!(t.dim(), (1, 3, 2, 3));
    assert_eq!(t[[0, 0, 1, 2]], 2.0);
    assert_eq!(t[[0, 1, 1, 2]], 1.0);
    assert_eq!(t[[0, 2, 0, 0]], 200.0);
}

#[test]
fn align_corners_keeps_the_corners() {
    let input = Array4::from_shape_fn((1, 2, 4, 6), |(_, c, y, x)| (c * 100 + y * 10 + x) as f32);
    let out = interpolate_align_corners(&input, 8, 12);

    assert_eq!(out.dim(), (1, 2, 8, 12));
    let close = |a: f32, b: f32| (a - b).abs() < 1e-4;
    for c in 0..2 {
        assert_eq!(out[[0, c, 0, 0]], input[[0, c, 0, 0]]);
        assert!(close(out[[0, c, 7, 11]], input[[0, c, 3, 5]]));
        assert!(close(out[[0, c, 0, 11]], input[[0, c, 0, 5]]));
    }

    // Linear inputs stay linear
    let dx = out[[0, 0, 0, 1]] - out[[0, 0, 0, 0]];
    assert!((dx - 5.0 / 11.0).abs() < 1e-5);
}

#[test]
fn half_pixel_resize_preserves_constants() {
    let input = Array2::from_elem((5, 7), 3.25f32);
    let out = resize_linear_f32(input.view(), 13, 9);

    assert_eq!(out.len(), 13 * 9);
    assert!(out.iter().all(|&v| (v - 3.25).abs() < 1e-6));
}

#[test]
fn half_pixel_resize_to_same_size_is_identity() {
    let input = Array2::from_shape_fn((4, 4), |(y, x)| (y * 4 + x) as f32);
    let out = resize_linear_f32(input.view(), 4, 4);

    assert_eq!(out, input.iter().copied().collect::<Vec<_>>());
}

#[test]
fn rgb_downscale_averages_neighbours() {
    let img = RgbImage::from_fn(4, 2, |x, _| match x % 2 {
        0 => Rgb([0, 0, 0]),
        _ => Rgb([200, 100, 50])
    });
    let out = resize_rgb_linear(&img, 2, 1);

    assert_eq!(out.dimensions(), (2, 1));
    assert_eq!(*out.get_pixel(0, 0), Rgb([100, 50, 25]));
}
