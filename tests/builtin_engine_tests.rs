//! Integration tests for the built-in engine driven through the batch pipeline
//!
//! These tests verify:
//! - OBJ and STL meshes are imported, decimated and exported
//! - Material libraries and textures travel with the output mesh
//! - Output format selection

use camino::Utf8PathBuf;
use meshbatch::engine::{ObjImporter, StlImporter};
use meshbatch::models::{JobConfig, JobOptions};
use meshbatch::registry::Importer;
use meshbatch::report::TracingReporter;
use meshbatch::{BatchOrchestrator, builtin_registry};
use std::fmt::Write as _;
use std::fs;
use tempfile::TempDir;

/// OBJ text for an n x n grid of unit squares, optionally with UVs and a material
fn grid_obj(n: usize, material: Option<&str>) -> String {
    let mut obj = String::new();
    if material.is_some() {
        obj.push_str("mtllib grid.mtl\n");
    }
    for y in 0..=n {
        for x in 0..=n {
            // Gentle bump so the surface is not perfectly planar
            let z = ((x as f64) * 0.7).sin() * ((y as f64) * 0.5).cos() * 0.2;
            writeln!(obj, "v {} {} {:.4}", x, y, z).unwrap();
        }
    }
    if let Some(name) = material {
        for y in 0..=n {
            for x in 0..=n {
                writeln!(obj, "vt {:.4} {:.4}", x as f64 / n as f64, y as f64 / n as f64).unwrap();
            }
        }
        writeln!(obj, "usemtl {}", name).unwrap();
    }
    let idx = |x: usize, y: usize| y * (n + 1) + x + 1;
    for y in 0..n {
        for x in 0..n {
            let (a, b, c, d) = (idx(x, y), idx(x + 1, y), idx(x + 1, y + 1), idx(x, y + 1));
            if material.is_some() {
                writeln!(obj, "f {a}/{a} {b}/{b} {c}/{c}").unwrap();
                writeln!(obj, "f {a}/{a} {c}/{c} {d}/{d}").unwrap();
            } else {
                writeln!(obj, "f {a} {b} {c}").unwrap();
                writeln!(obj, "f {a} {c} {d}").unwrap();
            }
        }
    }
    obj
}

struct Workspace {
    _temp: TempDir,
    input: Utf8PathBuf,
    output: Utf8PathBuf,
}

fn workspace() -> Workspace {
    let temp = TempDir::new().unwrap();
    let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
    let input = root.join("in");
    fs::create_dir_all(&input).unwrap();
    Workspace {
        _temp: temp,
        input,
        output: root.join("out"),
    }
}

fn job(ws: &Workspace, extension: &str, output_format: &str) -> JobConfig {
    JobConfig::try_from(JobOptions {
        source_root: ws.input.clone(),
        destination_root: ws.output.clone(),
        extension: extension.to_string(),
        output_format: output_format.to_string(),
        texture_quality: 70,
        mesh_quality_percent: 30,
        face_ratio_percent: 50,
        side_outputs: Vec::new(),
    })
    .unwrap()
}

#[test]
fn test_obj_batch_halves_face_count() {
    let ws = workspace();
    fs::create_dir_all(ws.input.join("props")).unwrap();
    fs::write(ws.input.join("props/grid.obj"), grid_obj(10, None)).unwrap();
    fs::write(ws.input.join("broken.obj"), "v 0 0 0\nf 1 2 3\n").unwrap();

    let registry = builtin_registry();
    let reporter = TracingReporter;
    let summary = BatchOrchestrator::new(&registry, &reporter)
        .run(&job(&ws, "obj", "obj"))
        .unwrap();

    assert_eq!(summary.success_count(), 1);
    assert_eq!(summary.failure_count(), 1);

    let output = ws.output.join("props/grid.obj");
    let simplified = ObjImporter.load(&output).unwrap();
    assert!(simplified.face_count() <= 100);
    assert!(simplified.face_count() > 0);
}

#[test]
fn test_materials_and_textures_follow_output() {
    let ws = workspace();
    fs::write(ws.input.join("grid.obj"), grid_obj(6, Some("skin"))).unwrap();
    fs::write(ws.input.join("grid.mtl"), "newmtl skin\nKd 1 1 1\nmap_Kd skin.png\n").unwrap();
    image::RgbImage::from_pixel(8, 8, image::Rgb([120, 80, 40]))
        .save(ws.input.join("skin.png"))
        .unwrap();

    let registry = builtin_registry();
    let reporter = TracingReporter;
    let summary = BatchOrchestrator::new(&registry, &reporter)
        .run(&job(&ws, "obj", "obj"))
        .unwrap();

    assert_eq!(summary.success_count(), 1);
    assert!(ws.output.join("grid.obj").exists());
    assert!(ws.output.join("grid.mtl").exists());
    assert!(ws.output.join("skin.png").exists());

    let reloaded = ObjImporter.load(&ws.output.join("grid.obj")).unwrap();
    assert_eq!(reloaded.materials.len(), 1);
    assert!(reloaded.texcoords.is_some());
}

#[test]
fn test_obj_to_stl_output_format() {
    let ws = workspace();
    fs::write(ws.input.join("grid.obj"), grid_obj(8, None)).unwrap();

    let registry = builtin_registry();
    let reporter = TracingReporter;
    let summary = BatchOrchestrator::new(&registry, &reporter)
        .run(&job(&ws, "obj", "stl"))
        .unwrap();

    assert_eq!(summary.success_count(), 1);
    let stl = StlImporter.load(&ws.output.join("grid.stl")).unwrap();
    assert!(stl.face_count() <= 64);
}

#[test]
fn test_unknown_output_format_fails_every_file() {
    let ws = workspace();
    fs::write(ws.input.join("a.obj"), grid_obj(2, None)).unwrap();
    fs::write(ws.input.join("b.obj"), grid_obj(2, None)).unwrap();

    let registry = builtin_registry();
    let reporter = TracingReporter;
    let summary = BatchOrchestrator::new(&registry, &reporter)
        .run(&job(&ws, "obj", "ply"))
        .unwrap();

    assert_eq!(summary.success_count(), 0);
    assert_eq!(summary.failure_count(), 2);
}

#[test]
fn test_missing_texture_leaves_no_output_behind() {
    let ws = workspace();
    fs::create_dir_all(ws.input.join("props")).unwrap();
    fs::write(ws.input.join("props/grid.obj"), grid_obj(4, Some("skin"))).unwrap();
    fs::write(
        ws.input.join("props/grid.mtl"),
        "newmtl skin\nKd 1 1 1\nmap_Kd missing.png\n",
    )
    .unwrap();

    let registry = builtin_registry();
    let reporter = TracingReporter;
    let summary = BatchOrchestrator::new(&registry, &reporter)
        .run(&job(&ws, "obj", "obj"))
        .unwrap();

    assert_eq!(summary.success_count(), 0);
    assert_eq!(summary.failure_count(), 1);
    assert!(!ws.output.join("props/grid.obj").exists());
    assert!(!ws.output.join("props/grid.mtl").exists());
    assert!(!ws.output.join("props").exists());
    assert!(ws.output.is_dir());
}
