//! In-memory mesh document used by the built-in engine.

use crate::registry::ProcessingError;
use camino::{Utf8Path, Utf8PathBuf};
use image::codecs::jpeg::JpegEncoder;
use nalgebra::Point3;
use std::fs::{self, File};
use std::io::{BufWriter, Write};

/// A material referenced by one or more faces
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub diffuse: Option<[f32; 3]>,
    /// Absolute path of the diffuse texture image, if any
    pub diffuse_texture: Option<Utf8PathBuf>,
}

/// Face/vertex counts the pipeline needs to size a simplification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeshStats {
    pub face_count: usize,
    pub vertex_count: usize,
    pub selected_face_count: usize,
}

/// One loaded triangle mesh plus the metadata that travels with it.
///
/// Per-face arrays (`face_materials`, `face_selection`) always have the same
/// length as `faces`; per-vertex arrays (`texcoords`, `vertex_quality`) are
/// either absent or as long as `vertices`.
#[derive(Debug, Clone, Default)]
pub struct MeshDocument {
    /// Label shown in logs, usually the source file name
    pub label: String,
    pub vertices: Vec<Point3<f64>>,
    pub faces: Vec<[usize; 3]>,
    pub texcoords: Option<Vec<[f32; 2]>>,
    pub vertex_quality: Option<Vec<f64>>,
    pub face_materials: Vec<Option<usize>>,
    pub face_selection: Vec<bool>,
    pub materials: Vec<Material>,
}

impl MeshDocument {
    /// Build a document from bare geometry with no selection or materials
    pub fn from_geometry(
        label: impl Into<String>,
        vertices: Vec<Point3<f64>>,
        faces: Vec<[usize; 3]>,
    ) -> Self {
        let face_count = faces.len();
        Self {
            label: label.into(),
            vertices,
            faces,
            texcoords: None,
            vertex_quality: None,
            face_materials: vec![None; face_count],
            face_selection: vec![false; face_count],
            materials: Vec::new(),
        }
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn selected_face_count(&self) -> usize {
        self.face_selection.iter().filter(|s| **s).count()
    }

    pub fn has_selection(&self) -> bool {
        self.face_selection.iter().any(|s| *s)
    }

    /// Mark the given faces as selected; out-of-range indices are ignored
    pub fn select_faces(&mut self, faces: impl IntoIterator<Item = usize>) {
        for face in faces {
            if let Some(flag) = self.face_selection.get_mut(face) {
                *flag = true;
            }
        }
    }

    pub fn stats(&self) -> MeshStats {
        MeshStats {
            face_count: self.face_count(),
            vertex_count: self.vertex_count(),
            selected_face_count: self.selected_face_count(),
        }
    }

    /// Check that every face index and per-element array is consistent
    pub fn validate(&self) -> Result<(), ProcessingError> {
        let nv = self.vertices.len();
        if let Some((fi, face)) = self
            .faces
            .iter()
            .enumerate()
            .find(|(_, f)| f.iter().any(|&i| i >= nv))
        {
            return Err(ProcessingError::Processing(format!(
                "face {} references vertex {:?} but the mesh has {} vertices",
                fi, face, nv
            )));
        }
        if self.face_materials.len() != self.faces.len()
            || self.face_selection.len() != self.faces.len()
        {
            return Err(ProcessingError::Processing(
                "per-face attribute arrays do not match the face count".to_string(),
            ));
        }
        if self.texcoords.as_ref().is_some_and(|t| t.len() != nv)
            || self.vertex_quality.as_ref().is_some_and(|q| q.len() != nv)
        {
            return Err(ProcessingError::Processing(
                "per-vertex attribute arrays do not match the vertex count".to_string(),
            ));
        }
        Ok(())
    }

    /// Write every material's diffuse texture into `directory`.
    ///
    /// JPEG textures are re-encoded at `quality` (clamped to 1..=100); any
    /// other image type is copied unchanged. Returns the written paths.
    pub fn save_textures(
        &self,
        directory: &Utf8Path,
        quality: u8,
    ) -> Result<Vec<Utf8PathBuf>, ProcessingError> {
        let mut written: Vec<Utf8PathBuf> = Vec::new();
        let mut sources: Vec<&Utf8Path> = Vec::new();

        for texture in self
            .materials
            .iter()
            .filter_map(|m| m.diffuse_texture.as_deref())
        {
            let Some(file_name) = texture.file_name() else {
                continue;
            };
            let target = directory.join(file_name);
            if let Some(i) = written.iter().position(|w| *w == target) {
                // Materials refer to textures by file name only
                if sources[i] == texture {
                    continue;
                }
                return Err(ProcessingError::Processing(format!(
                    "textures {} and {} would both be written as {}",
                    sources[i], texture, target
                )));
            }

            if is_jpeg(texture) {
                reencode_jpeg(texture, &target, quality)?;
            } else if texture != target {
                fs::copy(texture, &target).map_err(|e| ProcessingError::io(texture, e))?;
            }

            tracing::debug!("Saved texture {} -> {}", texture, target);
            written.push(target);
            sources.push(texture);
        }

        Ok(written)
    }
}

fn is_jpeg(path: &Utf8Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false)
}

fn reencode_jpeg(source: &Utf8Path, target: &Utf8Path, quality: u8) -> Result<(), ProcessingError> {
    let image = image::open(source).map_err(|e| ProcessingError::Parse {
        path: source.to_path_buf(),
        details: e.to_string(),
    })?;
    let rgb = image.to_rgb8();

    let file = File::create(target).map_err(|e| ProcessingError::io(target, e))?;
    let mut writer = BufWriter::new(file);
    let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
    encoder
        .encode_image(&rgb)
        .map_err(|e| ProcessingError::Processing(format!("texture {}: {}", target, e)))?;
    writer.flush().map_err(|e| ProcessingError::io(target, e))?;
    Ok(())
}
