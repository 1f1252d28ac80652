use finereg::{
    BoundaryPolicy, Geometry, Image, MetricKind, Registration, RegistrationOutput, SearchConfig,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn textured(width: usize, height: usize, seed: u64) -> Image {
    let mut rng = StdRng::seed_from_u64(seed);
    let phase: f32 = rng.random_range(0.0..6.0);
    Image::from_fn(width, height, |x, y| {
        let (xf, yf) = (x as f32, y as f32);
        let jitter: f32 = rng.random_range(0.0..8.0);
        120.0 + 40.0 * (0.37 * xf + phase).sin() * (0.23 * yf).cos() + jitter
    })
    .unwrap()
}

fn bits(out: &RegistrationOutput) -> Vec<Vec<u64>> {
    out.to_bands()
        .iter()
        .map(|band| band.data().iter().map(|v| v.to_bits()).collect())
        .collect()
}

fn assert_tiling_invariant(base: SearchConfig, reference: &Image, secondary: &Image, tile: [usize; 2]) {
    let whole = Registration::new(SearchConfig {
        tile_size: [4096, 4096],
        ..base.clone()
    })
    .unwrap()
    .run(reference, secondary)
    .unwrap();
    let tiled = Registration::new(SearchConfig {
        tile_size: tile,
        ..base
    })
    .unwrap()
    .run(reference, secondary)
    .unwrap();

    assert_eq!(whole.total_tiles, 1);
    assert!(tiled.total_tiles > 1);
    assert!(tiled.is_complete());
    assert_eq!(bits(&whole), bits(&tiled));
}

#[test]
fn sixteen_pixel_tiles_match_whole_image() {
    let reference = textured(70, 52, 11);
    let secondary = textured(70, 52, 11);
    assert_tiling_invariant(SearchConfig::default(), &reference, &secondary, [16, 16]);
}

#[test]
fn tiling_is_invariant_with_offset_step_and_clipping() {
    let reference = textured(64, 48, 12);
    let secondary = textured(60, 50, 13);
    let config = SearchConfig {
        metric: MetricKind::Mrsd,
        metric_radius: [2, 3],
        search_radius: [3, 2],
        grid_step: [3, 2],
        coarse_offset: [1.5, -2.0],
        boundary: BoundaryPolicy::Clip,
        ..SearchConfig::default()
    };
    assert_tiling_invariant(config, &reference, &secondary, [5, 7]);
}

#[test]
fn tiling_is_invariant_with_physical_geometry() {
    let reference = textured(48, 48, 14)
        .with_geometry(Geometry::new([100.0, 200.0], [2.0, -2.0]))
        .unwrap();
    let secondary = textured(48, 48, 15)
        .with_geometry(Geometry::new([101.0, 199.0], [2.0, -2.0]))
        .unwrap();
    let config = SearchConfig {
        metric: MetricKind::Ccsm,
        subpixel_accuracy: 0.05,
        validity: Some(finereg::ValidityThreshold::new(
            finereg::ThresholdDirection::GreaterThan,
            0.5,
        )),
        ..SearchConfig::default()
    };
    assert_tiling_invariant(config, &reference, &secondary, [16, 16]);
}
