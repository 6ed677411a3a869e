//! Integration test: run the `rastershape` binary on a generated image.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;
use std::process::Command;

use image::{GrayImage, Luma};

/// Write a 4x4 label image to the test scratch directory: value 10 on the
/// left half, 20 on the right, and a single 0 (nodata) cell in a corner.
fn write_labels(name: &str) -> PathBuf {
    let image = GrayImage::from_fn(4, 4, |x, y| match (x, y) {
        (3, 3) => Luma([0]),
        (0 | 1, _) => Luma([10]),
        _ => Luma([20]),
    });
    let path = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(name);
    image.save(&path).unwrap();
    path
}

fn rastershape() -> Command {
    Command::new(env!("CARGO_BIN_EXE_rastershape"))
}

#[test]
fn writes_report_and_geojson() {
    let image_path = write_labels("labels-report.png");
    let geojson_path = image_path.with_extension("geojson");

    let output = rastershape()
        .arg(&image_path)
        .args(["--transform", "10,0,1000,0,-10,2000"])
        .args(["--crs", "EPSG:3857", "--nodata", "0"])
        .arg("--geojson")
        .arg(&geojson_path)
        .output()
        .expect("binary should run");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Conversion Diagnostics Report"));
    assert!(stdout.contains("Features: 2"));
    assert!(!stdout.contains("Warning:"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&geojson_path).unwrap()).unwrap();
    assert_eq!(json["type"], "FeatureCollection");
    assert_eq!(json["features"].as_array().unwrap().len(), 2);
    assert_eq!(json["features"][0]["properties"]["value"], 10);
    assert_eq!(json["features"][1]["properties"]["value"], 20);
    assert_eq!(
        json["crs"]["properties"]["name"],
        "urn:ogc:def:crs:EPSG::3857"
    );
}

#[test]
fn json_diagnostics_are_machine_readable() {
    let image_path = write_labels("labels-json.png");

    let output = rastershape()
        .arg(&image_path)
        .args(["--connectivity", "eight", "--json"])
        .output()
        .expect("binary should run");
    assert!(output.status.success());

    let diagnostics: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(diagnostics["connectivity"], "eight");
    assert_eq!(diagnostics["region_count"], 3);
    assert_eq!(diagnostics["dimensions"]["width"], 4);
}

#[test]
fn svg_preview_is_written() {
    let image_path = write_labels("labels-svg.png");
    let svg_path = image_path.with_extension("svg");

    let output = rastershape()
        .arg(&image_path)
        .arg("--svg")
        .arg(&svg_path)
        .output()
        .expect("binary should run");
    assert!(output.status.success());

    let svg = std::fs::read_to_string(&svg_path).unwrap();
    assert!(svg.contains("<title>labels-svg</title>"));
    assert_eq!(svg.matches("<path").count(), 3);
}

#[test]
fn mismatched_mask_fails() {
    let image_path = write_labels("labels-mask.png");
    let mask_path = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("mask-2x2.png");
    GrayImage::from_pixel(2, 2, Luma([255])).save(&mask_path).unwrap();

    let output = rastershape()
        .arg(&image_path)
        .arg("--mask")
        .arg(&mask_path)
        .output()
        .expect("binary should run");
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("mask shape"));
}

#[test]
fn missing_image_fails() {
    let output = rastershape()
        .arg(PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("does-not-exist.png"))
        .output()
        .expect("binary should run");
    assert!(!output.status.success());
}
