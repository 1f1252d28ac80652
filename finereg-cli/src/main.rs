use clap::Parser;
use finereg::filter::gaussian_blur;
use finereg::image::io::{load_gray_image, save_bands_tiff, save_gray_u8};
use finereg::{
    warp_image, Geometry, Image, MetricKind, Registration, RegistrationOutput, SearchConfig,
    ThresholdDirection, ValidityThreshold,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Dense fine registration between two images")]
struct Cli {
    /// Reference image.
    #[arg(long = "ref", value_name = "FILE")]
    reference: PathBuf,
    /// Secondary image.
    #[arg(long = "sec", value_name = "FILE")]
    secondary: PathBuf,
    /// Output file with the dx, dy, score and mask bands: a multi-page float
    /// TIFF for `.tif`/`.tiff`, JSON otherwise.
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,
    /// Exploration radius in pixels.
    #[arg(long, num_args = 2, value_names = ["X", "Y"], required = true)]
    er: Vec<usize>,
    /// Metric radius in pixels.
    #[arg(long, num_args = 2, value_names = ["X", "Y"], required = true)]
    mr: Vec<usize>,
    /// Coarse offset in physical units.
    #[arg(long, num_args = 2, value_names = ["X", "Y"], allow_negative_numbers = true)]
    co: Option<Vec<f64>>,
    /// Sub-sampling rate (grid step) in pixels.
    #[arg(long, num_args = 2, value_names = ["X", "Y"])]
    ssr: Option<Vec<usize>>,
    /// Gaussian smoothing of the reference (sigma in pixels).
    #[arg(long, num_args = 2, value_names = ["X", "Y"])]
    rgs: Option<Vec<f64>>,
    /// Gaussian smoothing of the secondary (sigma in pixels).
    #[arg(long, num_args = 2, value_names = ["X", "Y"])]
    sgs: Option<Vec<f64>>,
    /// Similarity metric: CC, CCSM, MSD, MRSD or MI.
    #[arg(long, default_value = "CC")]
    metric: MetricKind,
    /// Sub-pixel accuracy in physical units.
    #[arg(long, default_value_t = 0.01)]
    spa: f64,
    /// Validity mask threshold: lowerThan|greaterThan and a value.
    #[arg(long, num_args = 2, value_names = ["DIR", "VALUE"], allow_negative_numbers = true)]
    vm: Option<Vec<String>>,
    /// Image to warp with the estimated field.
    #[arg(long, value_name = "FILE", requires = "warp_out")]
    warp: Option<PathBuf>,
    /// Output path of the warped image.
    #[arg(long, value_name = "FILE")]
    warp_out: Option<PathBuf>,
    /// Tile size in output cells.
    #[arg(long, num_args = 2, value_names = ["X", "Y"])]
    tile: Option<Vec<usize>>,
    /// Process tiles in parallel.
    #[arg(long)]
    parallel: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

fn pair<T: Copy>(values: &[T]) -> [T; 2] {
    [values[0], values[1]]
}

#[derive(Debug, Serialize)]
struct GeometryRecord {
    origin: [f64; 2],
    spacing: [f64; 2],
}

impl From<Geometry> for GeometryRecord {
    fn from(value: Geometry) -> Self {
        Self {
            origin: value.origin,
            spacing: value.spacing,
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    metric: String,
    width: usize,
    height: usize,
    geometry: GeometryRecord,
    completed_tiles: usize,
    total_tiles: usize,
    /// dx, dy, score and optional mask; invalid values are `null`.
    bands: Vec<Vec<Option<f64>>>,
}

impl From<&RegistrationOutput> for Output {
    fn from(value: &RegistrationOutput) -> Self {
        let bands = value
            .to_bands()
            .iter()
            .map(|band| {
                band.data()
                    .iter()
                    .map(|&v| v.is_finite().then_some(v))
                    .collect()
            })
            .collect();
        Self {
            metric: value.metric.token().to_string(),
            width: value.width(),
            height: value.height(),
            geometry: value.geometry().into(),
            completed_tiles: value.completed_tiles,
            total_tiles: value.total_tiles,
            bands,
        }
    }
}

fn load(
    path: &Path,
    sigma: Option<&[f64]>,
    role: &str,
) -> Result<Image, Box<dyn std::error::Error>> {
    let image = load_gray_image(path).map_err(|e| format!("{role} image: {e}"))?;
    println!("{role:<18}: {}", path.display());
    match sigma {
        Some(s) => {
            println!("{role} smoothing on, sigma {:?} (pixels)", pair(s));
            Ok(gaussian_blur(&image, pair(s)).map_err(|e| format!("{role} smoothing: {e}"))?)
        }
        None => Ok(image),
    }
}

fn is_tiff(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("tif") || ext.eq_ignore_ascii_case("tiff"))
}

fn search_config(cli: &Cli) -> Result<SearchConfig, Box<dyn std::error::Error>> {
    if cli.parallel && !Registration::supports_parallel() {
        return Err("--parallel requires finereg built with the `rayon` feature".into());
    }

    let validity = match &cli.vm {
        Some(vm) => {
            let direction: ThresholdDirection = vm[0].parse()?;
            let value: f64 = vm[1]
                .parse()
                .map_err(|e| format!("validity threshold {:?}: {e}", vm[1]))?;
            Some(ValidityThreshold::new(direction, value))
        }
        None => None,
    };

    let defaults = SearchConfig::default();
    Ok(SearchConfig {
        metric: cli.metric,
        metric_radius: pair(&cli.mr),
        search_radius: pair(&cli.er),
        grid_step: cli.ssr.as_deref().map_or(defaults.grid_step, pair),
        coarse_offset: cli.co.as_deref().map_or(defaults.coarse_offset, pair),
        subpixel_accuracy: cli.spa,
        validity,
        tile_size: cli.tile.as_deref().map_or(defaults.tile_size, pair),
        parallel: cli.parallel,
        ..defaults
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("finereg=info".parse()?))
            .with_target(false)
            .init();
    }

    let registration = Registration::new(search_config(&cli)?)?;

    let reference = load(&cli.reference, cli.rgs.as_deref(), "Reference")?;
    let secondary = load(&cli.secondary, cli.sgs.as_deref(), "Secondary")?;

    let cfg = registration.config();
    println!("Exploration radius: {:?} (pixels)", cfg.search_radius);
    println!("Metric radius     : {:?} (pixels)", cfg.metric_radius);
    println!("Sub-sampling rate : {:?} (pixels)", cfg.grid_step);
    println!("Coarse offset     : {:?} (physical unit)", cfg.coarse_offset);
    println!("Accuracy          : {} (physical unit)", cfg.subpixel_accuracy);
    println!("Metric            : {}", cfg.metric.description());

    let output = registration.run(&reference, &secondary)?;
    let valid = (0..output.height())
        .flat_map(|y| (0..output.width()).map(move |x| (x, y)))
        .filter(|&(x, y)| output.is_valid(x, y))
        .count();
    tracing::info!(
        width = output.width(),
        height = output.height(),
        valid,
        parallel = cfg.parallel,
        "registration finished"
    );
    match &cli.out {
        Some(path) if is_tiff(path) => save_bands_tiff(&output, path)?,
        Some(path) => {
            let json = serde_json::to_string_pretty(&Output::from(&output))?;
            fs::write(path, json).map_err(|e| format!("writing {}: {e}", path.display()))?
        }
        None => println!("{}", serde_json::to_string_pretty(&Output::from(&output))?),
    }

    if let (Some(warp), Some(warp_out)) = (&cli.warp, &cli.warp_out) {
        let moving = load_gray_image(warp).map_err(|e| format!("image to warp: {e}"))?;
        let warped = warp_image(&output.deformation, &moving, &reference, 0.0)?;
        save_gray_u8(&warped, warp_out)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{is_tiff, search_config, Cli};
    use clap::Parser;
    use finereg::{MetricKind, Registration, ThresholdDirection};
    use std::path::Path;

    fn parse(extra: &[&str]) -> Cli {
        let mut args = vec![
            "finereg", "--ref", "a.png", "--sec", "b.png", "--er", "2", "3", "--mr", "4", "5",
        ];
        args.extend_from_slice(extra);
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn parallel_flag_reaches_a_parallel_capable_engine() {
        assert!(Registration::supports_parallel());
        let cfg = search_config(&parse(&["--parallel"])).unwrap();
        assert!(cfg.parallel);
        assert!(Registration::new(cfg).is_ok());
        assert!(!search_config(&parse(&[])).unwrap().parallel);
    }

    #[test]
    fn flags_map_onto_the_search_config() {
        let cli = parse(&[
            "--metric",
            "ccsm",
            "--co",
            "-1.5",
            "2",
            "--ssr",
            "2",
            "2",
            "--vm",
            "greaterThan",
            "0.8",
        ]);
        let cfg = search_config(&cli).unwrap();
        assert_eq!(cfg.metric, MetricKind::Ccsm);
        assert_eq!(cfg.search_radius, [2, 3]);
        assert_eq!(cfg.metric_radius, [4, 5]);
        assert_eq!(cfg.coarse_offset, [-1.5, 2.0]);
        assert_eq!(cfg.grid_step, [2, 2]);
        let vm = cfg.validity.unwrap();
        assert!(vm.is_valid(0.9));
        assert!(!vm.is_valid(0.8));
        assert_eq!(vm.direction, ThresholdDirection::GreaterThan);
    }

    #[test]
    fn tiff_output_is_chosen_by_extension() {
        assert!(is_tiff(Path::new("field.tif")));
        assert!(is_tiff(Path::new("out/field.TIFF")));
        assert!(!is_tiff(Path::new("field.json")));
        assert!(!is_tiff(Path::new("field")));
    }
}
