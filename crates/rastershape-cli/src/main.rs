//! rastershape: polygonize a single-band image from the command line.
//!
//! Decodes an image with the `image` crate, treats its gray channel as a
//! raster band, traces every contiguous same-valued region into a polygon
//! and prints conversion diagnostics. Useful for:
//!
//! - Turning classified or label images into GeoJSON
//! - Previewing region outlines as SVG
//! - Checking how connectivity, masks and nodata change region counts
//!
//! 8-bit images are converted as `u8` cells, 16-bit images as `u16`.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin rastershape -- [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use clap::{Parser, ValueEnum};
use image::DynamicImage;
use rastershape_convert::{
    Affine, Band, CellValue, Connectivity, ConvertOptions, Crs, InMemoryRaster, Mask,
    convert_with_diagnostics,
};
use rastershape_export::SvgMetadata;

/// Convert a single-band image into value-labelled polygons.
///
/// Traces contiguous same-valued regions, drops nodata regions, and
/// prints per-stage timing and count diagnostics.
#[derive(Parser)]
#[command(name = "rastershape", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP, TIFF).
    image_path: PathBuf,

    /// Affine transform `a,b,c,d,e,f` mapping (col, row) to
    /// (a*col + b*row + c, d*col + e*row + f).
    #[arg(
        long,
        value_delimiter = ',',
        allow_hyphen_values = true,
        conflicts_with = "gdal_transform"
    )]
    transform: Option<Vec<f64>>,

    /// GDAL geotransform `c,a,b,f,d,e`.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    gdal_transform: Option<Vec<f64>>,

    /// Coordinate reference system identifier (e.g. `EPSG:4326`).
    #[arg(long)]
    crs: Option<String>,

    /// Nodata value. Regions with this value are dropped.
    #[arg(long, allow_hyphen_values = true)]
    nodata: Option<String>,

    /// Area mask image. Only cells under non-zero mask pixels are traced.
    #[arg(long)]
    mask: Option<PathBuf>,

    /// Which neighbouring cells join a region.
    #[arg(long, value_enum, default_value_t = Neighbourhood::Four)]
    connectivity: Neighbourhood,

    /// Write GeoJSON output to file.
    #[arg(long)]
    geojson: Option<PathBuf>,

    /// Write SVG preview to file.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Full conversion options as a JSON string.
    ///
    /// When provided, `--connectivity` is ignored. The JSON must be a
    /// valid `ConvertOptions` serialization; missing fields take their
    /// defaults.
    #[arg(long)]
    options_json: Option<String>,
}

/// Region connectivity selection.
#[derive(Clone, Copy, ValueEnum)]
enum Neighbourhood {
    /// Cells sharing a side.
    Four,
    /// Cells sharing a side or a corner.
    Eight,
}

impl From<Neighbourhood> for Connectivity {
    fn from(neighbourhood: Neighbourhood) -> Self {
        match neighbourhood {
            Neighbourhood::Four => Self::Four,
            Neighbourhood::Eight => Self::Eight,
        }
    }
}

/// A decoded image band at its native bit depth.
enum DecodedBand {
    U8(Band<u8>),
    U16(Band<u16>),
}

/// Build [`ConvertOptions`] from CLI arguments.
///
/// If `--options-json` is provided, the JSON is parsed directly and the
/// individual flags are ignored.
fn options_from_cli(cli: &Cli) -> Result<ConvertOptions, String> {
    if let Some(ref json) = cli.options_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --options-json: {e}"));
    }

    Ok(ConvertOptions {
        connectivity: cli.connectivity.into(),
        ..ConvertOptions::default()
    })
}

/// Build the grid-to-map transform from `--transform` or
/// `--gdal-transform`, defaulting to the identity.
fn transform_from_cli(cli: &Cli) -> Result<Affine, String> {
    let coefficients = |flag: &str, values: &[f64]| -> Result<[f64; 6], String> {
        <[f64; 6]>::try_from(values).map_err(|_| {
            format!(
                "Error parsing --{flag}: expected 6 comma-separated numbers, got {}",
                values.len()
            )
        })
    };

    let transform = if let Some(ref values) = cli.transform {
        let [a, b, c, d, e, f] = coefficients("transform", values)?;
        Affine::new(a, b, c, d, e, f)
    } else if let Some(ref values) = cli.gdal_transform {
        Affine::from_gdal(coefficients("gdal-transform", values)?)
    } else {
        Affine::IDENTITY
    };

    if transform.is_degenerate() {
        return Err(format!("Error: transform {transform} is degenerate"));
    }
    Ok(transform)
}

/// Pick the cell type for a decoded image: gray images keep their depth,
/// colour images are reduced to luminance at 8 or 16 bits.
fn decode_band(image: DynamicImage) -> DecodedBand {
    match image {
        DynamicImage::ImageLuma8(buffer) => DecodedBand::U8(Band::from(&buffer)),
        DynamicImage::ImageLuma16(buffer) => DecodedBand::U16(Band::from(&buffer)),
        other => {
            let color = other.color();
            let bits_per_channel = color.bits_per_pixel() / u16::from(color.channel_count());
            log::info!("reducing {color:?} image to luminance");
            if bits_per_channel > 8 {
                DecodedBand::U16(Band::from(&other.to_luma16()))
            } else {
                DecodedBand::U8(Band::from(&other.to_luma8()))
            }
        }
    }
}

/// Load an area mask from an image file (non-zero pixels are included).
fn load_mask(path: &Path) -> Result<Mask, String> {
    let image = image::open(path).map_err(|e| format!("Error reading mask {}: {e}", path.display()))?;
    Ok(Mask::from(&image.to_luma8()))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let (options, transform) = match options_from_cli(&cli).and_then(|options| {
        transform_from_cli(&cli).map(|transform| (options, transform))
    }) {
        Ok(parsed) => parsed,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image = match image::open(&cli.image_path) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Image: {} ({}x{}, {:?})",
        cli.image_path.display(),
        image.width(),
        image.height(),
        image.color(),
    );
    eprintln!("Options: {options:?}");
    eprintln!("Transform: {transform}");
    eprintln!();

    match decode_band(image) {
        DecodedBand::U8(band) => run(&cli, band, &options, transform),
        DecodedBand::U16(band) => run(&cli, band, &options, transform),
    }
}

/// Convert `band` and write the requested outputs.
fn run<T>(cli: &Cli, band: Band<T>, options: &ConvertOptions, transform: Affine) -> ExitCode
where
    T: CellValue + FromStr,
    T::Err: Display,
{
    let mut raster = InMemoryRaster::new(band).with_transform(transform);
    if let Some(ref crs) = cli.crs {
        raster = raster.with_crs(Crs::new(crs.as_str()));
    }
    if let Some(ref nodata) = cli.nodata {
        match nodata.parse::<T>() {
            Ok(value) => raster = raster.with_nodata(value),
            Err(e) => {
                eprintln!("Error parsing --nodata {nodata:?}: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    let mask = match cli.mask.as_deref().map(load_mask).transpose() {
        Ok(mask) => mask,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let (table, diagnostics) = match convert_with_diagnostics(&raster, mask.as_ref(), options) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Conversion error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(warning) = diagnostics.warning() {
        log::warn!("{warning}");
        if !cli.json {
            println!("{warning}");
        }
    }

    if cli.json {
        match serde_json::to_string_pretty(&diagnostics) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing diagnostics: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{}", diagnostics.report());
    }

    if let Some(ref geojson_path) = cli.geojson {
        let json = match rastershape_export::to_geojson_string(&table) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("Export error: {e}");
                return ExitCode::FAILURE;
            }
        };
        if let Err(e) = std::fs::write(geojson_path, &json) {
            eprintln!("Error writing GeoJSON to {}: {e}", geojson_path.display());
            return ExitCode::FAILURE;
        }
        eprintln!(
            "GeoJSON written to {} ({} features)",
            geojson_path.display(),
            table.len(),
        );
    }

    if let Some(ref svg_path) = cli.svg {
        let title = cli
            .image_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("rastershape");
        let desc = format!("{options:?}, transform {transform}");
        let metadata = SvgMetadata {
            title: Some(title),
            description: Some(&desc),
        };
        let svg = rastershape_export::to_svg(&table, &metadata);
        if let Err(e) = std::fs::write(svg_path, &svg) {
            eprintln!("Error writing SVG to {}: {e}", svg_path.display());
            return ExitCode::FAILURE;
        }
        eprintln!("SVG written to {} ({} bytes)", svg_path.display(), svg.len());
    }

    ExitCode::SUCCESS
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("rastershape").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_use_identity_and_four_connectivity() {
        let cli = parse(&["in.png"]);
        assert_eq!(transform_from_cli(&cli).unwrap(), Affine::IDENTITY);
        assert_eq!(options_from_cli(&cli).unwrap(), ConvertOptions::default());
    }

    #[test]
    fn transform_accepts_negative_coefficients() {
        let cli = parse(&["in.png", "--transform", "30,0,600000,0,-30,5000000"]);
        let transform = transform_from_cli(&cli).unwrap();
        assert_eq!(
            transform,
            Affine::new(30.0, 0.0, 600_000.0, 0.0, -30.0, 5_000_000.0)
        );
    }

    #[test]
    fn gdal_transform_is_reordered() {
        let cli = parse(&["in.png", "--gdal-transform", "600000,30,0,5000000,0,-30"]);
        let transform = transform_from_cli(&cli).unwrap();
        assert_eq!(
            transform,
            Affine::new(30.0, 0.0, 600_000.0, 0.0, -30.0, 5_000_000.0)
        );
    }

    #[test]
    fn transform_needs_six_numbers() {
        let cli = parse(&["in.png", "--transform", "1,0,0"]);
        let err = transform_from_cli(&cli).unwrap_err();
        assert!(err.contains("expected 6"));
    }

    #[test]
    fn degenerate_transform_is_rejected() {
        let cli = parse(&["in.png", "--transform", "0,0,0,0,0,0"]);
        assert!(transform_from_cli(&cli).is_err());
    }

    #[test]
    fn both_transforms_conflict() {
        let result = Cli::try_parse_from([
            "rastershape",
            "in.png",
            "--transform",
            "1,0,0,0,1,0",
            "--gdal-transform",
            "0,1,0,0,0,1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn connectivity_flag_sets_options() {
        let cli = parse(&["in.png", "--connectivity", "eight"]);
        let options = options_from_cli(&cli).unwrap();
        assert_eq!(options.connectivity, Connectivity::Eight);
    }

    #[test]
    fn options_json_overrides_flags() {
        let cli = parse(&[
            "in.png",
            "--connectivity",
            "four",
            "--options-json",
            r#"{"band":1,"connectivity":"eight"}"#,
        ]);
        let options = options_from_cli(&cli).unwrap();
        assert_eq!(options.connectivity, Connectivity::Eight);
    }

    #[test]
    fn bad_options_json_is_reported() {
        let cli = parse(&["in.png", "--options-json", "{not json"]);
        let err = options_from_cli(&cli).unwrap_err();
        assert!(err.starts_with("Error parsing --options-json"));
    }

    #[test]
    fn gray8_image_keeps_u8_cells() {
        let image = GrayImage::from_pixel(2, 2, Luma([7]));
        let DecodedBand::U8(band) = decode_band(DynamicImage::ImageLuma8(image)) else {
            unreachable!("8-bit gray should decode to u8");
        };
        assert_eq!(band.get(1, 1), Some(7));
    }

    #[test]
    fn gray16_image_keeps_u16_cells() {
        let image: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::from_pixel(2, 1, Luma([1000]));
        let DecodedBand::U16(band) = decode_band(DynamicImage::ImageLuma16(image)) else {
            unreachable!("16-bit gray should decode to u16");
        };
        assert_eq!(band.get(0, 0), Some(1000));
    }

    #[test]
    fn rgb8_image_is_reduced_to_u8_luminance() {
        let image = RgbImage::from_pixel(3, 1, Rgb([255, 255, 255]));
        let DecodedBand::U8(band) = decode_band(DynamicImage::ImageRgb8(image)) else {
            unreachable!("8-bit colour should decode to u8");
        };
        assert_eq!(band.get(2, 0), Some(255));
    }
}
