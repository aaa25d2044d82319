//! STL import and export (ASCII or binary in, binary out) via `stl_io`.

use super::document::MeshDocument;
use crate::registry::{Exporter, Importer, ProcessingError};
use camino::Utf8Path;
use nalgebra::Point3;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use tracing::debug;

pub struct StlImporter;

impl Importer for StlImporter {
    fn format_name(&self) -> &'static str {
        "STL"
    }

    fn load(&self, path: &Utf8Path) -> Result<MeshDocument, ProcessingError> {
        let file = File::open(path).map_err(|e| ProcessingError::io(path, e))?;
        let mut reader = BufReader::new(file);

        let stl = stl_io::read_stl(&mut reader).map_err(|e| ProcessingError::Parse {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;

        debug!(
            "STL contains {} vertices, {} triangles",
            stl.vertices.len(),
            stl.faces.len()
        );

        let mut vertices = Vec::new();
        vertices.try_reserve(stl.vertices.len())?;
        vertices.extend(
            stl.vertices
                .iter()
                .map(|v| Point3::new(v.0[0] as f64, v.0[1] as f64, v.0[2] as f64)),
        );

        let mut faces = Vec::new();
        faces.try_reserve(stl.faces.len())?;
        // stl_io already welds coincident corners; drop the collapsed ones
        faces.extend(
            stl.faces
                .iter()
                .map(|f| f.vertices)
                .filter(|[a, b, c]| a != b && b != c && a != c),
        );

        let label = path.file_name().unwrap_or(path.as_str()).to_string();
        let document = MeshDocument::from_geometry(label, vertices, faces);
        document.validate()?;
        Ok(document)
    }
}

pub struct StlExporter;

impl Exporter for StlExporter {
    fn format_name(&self) -> &'static str {
        "STL"
    }

    fn save(&self, document: &MeshDocument, path: &Utf8Path) -> Result<(), ProcessingError> {
        document.validate()?;

        let triangles: Vec<stl_io::Triangle> = document
            .faces
            .iter()
            .map(|&[i0, i1, i2]| {
                let corner = |i: usize| {
                    let p = &document.vertices[i];
                    stl_io::Vertex::new([p.x as f32, p.y as f32, p.z as f32])
                };
                stl_io::Triangle {
                    normal: stl_io::Normal::new(face_normal(document, [i0, i1, i2])),
                    vertices: [corner(i0), corner(i1), corner(i2)],
                }
            })
            .collect();

        let file = File::create(path).map_err(|e| ProcessingError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        stl_io::write_stl(&mut writer, triangles.iter()).map_err(|e| ProcessingError::io(path, e))?;
        writer.flush().map_err(|e| ProcessingError::io(path, e))?;

        debug!("Saved {} triangles to {}", triangles.len(), path);
        Ok(())
    }
}

fn face_normal(document: &MeshDocument, [a, b, c]: [usize; 3]) -> [f32; 3] {
    let p0 = document.vertices[a];
    let n = (document.vertices[b] - p0).cross(&(document.vertices[c] - p0));
    let len = n.norm();
    if len < 1e-12 {
        return [0.0, 0.0, 0.0];
    }
    [(n.x / len) as f32, (n.y / len) as f32, (n.z / len) as f32]
}
