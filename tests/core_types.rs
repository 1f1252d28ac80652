use finereg::{
    evaluate, Direction, FineRegError, Geometry, Image, ImageView, MetricKind, MetricParams,
    Region, Registration, SearchConfig, ThresholdDirection, ValidityThreshold,
};

#[test]
fn image_view_rejects_invalid_dimensions() {
    let data = [0.0f32; 4];

    let err = ImageView::from_slice(&data, 0, 1).err().unwrap();
    assert_eq!(
        err,
        FineRegError::InvalidDimensions {
            width: 0,
            height: 1,
        }
    );

    let err = ImageView::from_slice(&data, 3, 2).err().unwrap();
    assert_eq!(err, FineRegError::BufferTooSmall { needed: 6, got: 4 });
}

#[test]
fn view_roi_keeps_stride() {
    let data: Vec<f32> = (0..20).map(|v| v as f32).collect();
    let view = ImageView::from_slice(&data, 5, 4).unwrap();
    let roi = view.roi(Region::new(1, 1, 3, 2)).unwrap();
    assert_eq!(roi.stride(), 5);
    assert_eq!(roi.get(0, 0), Some(&6.0));
    assert_eq!(roi.to_vec(), vec![6.0, 7.0, 8.0, 11.0, 12.0, 13.0]);
    assert!(matches!(
        view.roi(Region::new(3, 0, 3, 1)),
        Err(FineRegError::RoiOutOfBounds { .. })
    ));
}

#[test]
fn geometry_rejects_zero_spacing() {
    let img = Image::from_fn(3, 3, |_, _| 1.0).unwrap();
    let err = img
        .with_geometry(Geometry::new([0.0, 0.0], [0.0, 1.0]))
        .unwrap_err();
    assert!(matches!(err, FineRegError::InvalidGeometry { .. }));
}

#[test]
fn config_errors_name_the_field() {
    let cases = [
        (
            SearchConfig {
                metric_radius: [0, 2],
                ..SearchConfig::default()
            },
            "metric_radius",
        ),
        (
            SearchConfig {
                grid_step: [1, 0],
                ..SearchConfig::default()
            },
            "grid_step",
        ),
        (
            SearchConfig {
                subpixel_accuracy: 0.0,
                ..SearchConfig::default()
            },
            "subpixel_accuracy",
        ),
        (
            SearchConfig {
                mi_bins: 1,
                ..SearchConfig::default()
            },
            "mi_bins",
        ),
        (
            SearchConfig {
                validity: Some(ValidityThreshold::new(
                    ThresholdDirection::LowerThan,
                    f64::INFINITY,
                )),
                ..SearchConfig::default()
            },
            "validity",
        ),
    ];
    for (config, name) in cases {
        match Registration::new(config) {
            Err(FineRegError::InvalidConfig { field, .. }) => assert_eq!(field, name),
            other => panic!("expected InvalidConfig for {name}, got {other:?}"),
        }
    }
}

#[test]
fn metric_and_threshold_tokens_parse() {
    assert_eq!("ccsm".parse::<MetricKind>().unwrap(), MetricKind::Ccsm);
    assert_eq!("MI".parse::<MetricKind>().unwrap(), MetricKind::Mi);
    let err = "NCC".parse::<MetricKind>().unwrap_err();
    assert_eq!(
        err,
        FineRegError::UnknownMetric {
            got: "NCC".to_string()
        }
    );
    assert!(err.to_string().contains("CC, CCSM, MSD, MRSD, MI"));

    let err = "lower".parse::<ThresholdDirection>().unwrap_err();
    assert!(err.to_string().contains("lowerThan"));
}

#[test]
fn metric_directions_are_fixed() {
    assert_eq!(MetricKind::Cc.direction(), Direction::Maximize);
    assert_eq!(MetricKind::Ccsm.direction(), Direction::Maximize);
    assert_eq!(MetricKind::Msd.direction(), Direction::Minimize);
    assert_eq!(MetricKind::Mrsd.direction(), Direction::Maximize);
    assert_eq!(MetricKind::Mi.direction(), Direction::Maximize);
    assert_eq!(SearchConfig::default().direction(), Direction::Maximize);
}

#[test]
fn degenerate_correlation_is_worst_not_error() {
    let flat = [5.0; 9];
    let ramp: Vec<f64> = (0..9).map(f64::from).collect();
    let params = MetricParams::default();
    let score = evaluate(MetricKind::Ccsm, &flat, &ramp, &params);
    assert_eq!(score, Direction::Maximize.worst());
    let zeros = [0.0; 9];
    assert_eq!(
        evaluate(MetricKind::Cc, &zeros, &ramp, &params),
        f64::NEG_INFINITY
    );
}

#[test]
fn mismatched_image_sizes_are_supported() {
    let reference = Image::from_fn(30, 20, |x, y| ((x * 3 + y * 5) % 17) as f32).unwrap();
    let secondary = Image::from_fn(20, 30, |x, y| ((x * 3 + y * 5) % 17) as f32).unwrap();
    let out = Registration::new(SearchConfig::default())
        .unwrap()
        .run(&reference, &secondary)
        .unwrap();
    assert_eq!((out.width(), out.height()), (30, 20));
    assert!(out.score.get(25, 10).unwrap().is_nan());
}
