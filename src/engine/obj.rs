//! Wavefront OBJ import (via `tobj`) and export.

use super::document::{Material, MeshDocument};
use crate::registry::{Exporter, Importer, ProcessingError};
use camino::Utf8Path;
use nalgebra::Point3;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use tracing::{debug, warn};

pub struct ObjImporter;

impl Importer for ObjImporter {
    fn format_name(&self) -> &'static str {
        "Wavefront OBJ"
    }

    fn load(&self, path: &Utf8Path) -> Result<MeshDocument, ProcessingError> {
        let (models, materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ignore_points: true,
                ignore_lines: true,
                ..Default::default()
            },
        )
        .map_err(|e| ProcessingError::Parse {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;

        if models.is_empty() {
            return Err(ProcessingError::Parse {
                path: path.to_path_buf(),
                details: "OBJ file contains no models".to_string(),
            });
        }

        let base_dir = path.parent().unwrap_or_else(|| Utf8Path::new(""));
        let materials = match materials {
            Ok(materials) => materials
                .into_iter()
                .map(|m| convert_material(m, base_dir))
                .collect(),
            Err(e) => {
                warn!("Ignoring materials of {}: {}", path, e);
                Vec::new()
            }
        };

        let vertex_total: usize = models.iter().map(|m| m.mesh.positions.len() / 3).sum();
        let face_total: usize = models.iter().map(|m| m.mesh.indices.len() / 3).sum();
        let has_texcoords = models.iter().any(|m| !m.mesh.texcoords.is_empty());

        let mut vertices = Vec::new();
        vertices.try_reserve(vertex_total)?;
        let mut faces = Vec::new();
        faces.try_reserve(face_total)?;
        let mut face_materials = Vec::new();
        face_materials.try_reserve(face_total)?;
        let mut texcoords = Vec::new();
        if has_texcoords {
            texcoords.try_reserve(vertex_total)?;
        }

        // Merge all models into one document; indices are per-model
        for model in &models {
            let mesh = &model.mesh;
            let offset = vertices.len();
            let count = mesh.positions.len() / 3;

            vertices.extend(
                mesh.positions
                    .chunks_exact(3)
                    .map(|c| Point3::new(c[0] as f64, c[1] as f64, c[2] as f64)),
            );

            if has_texcoords {
                if mesh.texcoords.len() == count * 2 {
                    texcoords.extend(mesh.texcoords.chunks_exact(2).map(|c| [c[0], c[1]]));
                } else {
                    texcoords.extend(std::iter::repeat_n([0.0, 0.0], count));
                }
            }

            let material = mesh.material_id.filter(|id| *id < materials.len());
            for tri in mesh.indices.chunks_exact(3) {
                faces.push([
                    tri[0] as usize + offset,
                    tri[1] as usize + offset,
                    tri[2] as usize + offset,
                ]);
                face_materials.push(material);
            }
        }

        debug!(
            "OBJ loaded: {} vertices, {} faces, {} materials from {} models",
            vertices.len(),
            faces.len(),
            materials.len(),
            models.len()
        );

        let label = path.file_name().unwrap_or(path.as_str()).to_string();
        let mut document = MeshDocument::from_geometry(label, vertices, faces);
        document.face_materials = face_materials;
        document.materials = materials;
        if has_texcoords {
            document.texcoords = Some(texcoords);
        }
        document.validate()?;
        Ok(document)
    }
}

fn convert_material(material: tobj::Material, base_dir: &Utf8Path) -> Material {
    let diffuse_texture = material
        .diffuse_texture
        .filter(|t| !t.trim().is_empty())
        .map(|t| {
            // Texture options such as "-bm 0.5" precede the file name
            let name = t.split_whitespace().last().unwrap_or(t.as_str()).to_string();
            base_dir.join(name)
        });

    Material {
        name: material.name,
        diffuse: material.diffuse,
        diffuse_texture,
    }
}

pub struct ObjExporter;

impl Exporter for ObjExporter {
    fn format_name(&self) -> &'static str {
        "Wavefront OBJ"
    }

    fn save(&self, document: &MeshDocument, path: &Utf8Path) -> Result<(), ProcessingError> {
        document.validate()?;

        let mtl_path = if document.materials.is_empty() {
            None
        } else {
            let mtl_path = path.with_extension("mtl");
            write_mtl(document, &mtl_path).map_err(|e| ProcessingError::io(&mtl_path, e))?;
            Some(mtl_path)
        };

        write_obj(document, path, mtl_path.as_deref()).map_err(|e| ProcessingError::io(path, e))?;

        debug!(
            "Saved {} vertices, {} faces to {}",
            document.vertex_count(),
            document.face_count(),
            path
        );
        Ok(())
    }
}

fn write_obj(document: &MeshDocument, path: &Utf8Path, mtl: Option<&Utf8Path>) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);

    writeln!(writer, "# OBJ file exported by meshbatch")?;
    writeln!(writer, "# Vertices: {}", document.vertex_count())?;
    writeln!(writer, "# Faces: {}", document.face_count())?;
    if let Some(file_name) = mtl.and_then(Utf8Path::file_name) {
        writeln!(writer, "mtllib {}", file_name)?;
    }
    writeln!(writer)?;

    for v in &document.vertices {
        writeln!(writer, "v {:.6} {:.6} {:.6}", v.x, v.y, v.z)?;
    }
    if let Some(texcoords) = &document.texcoords {
        for uv in texcoords {
            writeln!(writer, "vt {:.6} {:.6}", uv[0], uv[1])?;
        }
    }

    let with_uv = document.texcoords.is_some();
    let mut current_material = None;
    for (face, material) in document.faces.iter().zip(&document.face_materials) {
        if let Some(id) = material {
            if current_material != Some(*id) {
                if let Some(m) = document.materials.get(*id) {
                    writeln!(writer, "usemtl {}", m.name)?;
                }
                current_material = Some(*id);
            }
        }

        let [a, b, c] = [face[0] + 1, face[1] + 1, face[2] + 1];
        if with_uv {
            writeln!(writer, "f {a}/{a} {b}/{b} {c}/{c}")?;
        } else {
            writeln!(writer, "f {a} {b} {c}")?;
        }
    }

    writer.flush()
}

fn write_mtl(document: &MeshDocument, path: &Utf8Path) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "# Material library exported by meshbatch")?;

    for material in &document.materials {
        writeln!(writer)?;
        writeln!(writer, "newmtl {}", material.name)?;
        if let Some([r, g, b]) = material.diffuse {
            writeln!(writer, "Kd {:.6} {:.6} {:.6}", r, g, b)?;
        }
        if let Some(file_name) = material
            .diffuse_texture
            .as_deref()
            .and_then(Utf8Path::file_name)
        {
            writeln!(writer, "map_Kd {}", file_name)?;
        }
    }

    writer.flush()
}
