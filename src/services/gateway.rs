//! Mesh I/O gateway: resolves import/export capabilities by file extension.

use crate::engine::MeshDocument;
use crate::registry::{CapabilityRegistry, ProcessingError};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs::{self, File};
use thiserror::Error;

/// Errors from the import stage
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("File not found: {0}")]
    NotFound(Utf8PathBuf),

    #[error("File not readable: {path}")]
    NotReadable {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No importer registered for extension \"{extension}\"")]
    NoImporter { extension: String },

    #[error("Failed to load {path}")]
    Load {
        path: Utf8PathBuf,
        #[source]
        source: ProcessingError,
    },
}

/// Errors from the export stage
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("No exporter registered for extension \"{extension}\"")]
    NoExporter { extension: String },

    #[error("Failed to create directory {path}")]
    CreateDir {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to list output directory {path}")]
    ListDir {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to save {path}")]
    Save {
        path: Utf8PathBuf,
        #[source]
        source: ProcessingError,
    },

    #[error("Failed to save textures for {path}")]
    Textures {
        path: Utf8PathBuf,
        #[source]
        source: ProcessingError,
    },
}

/// Thin adapter between the orchestrator and the capability registry.
///
/// A missing capability (`NoImporter`/`NoExporter`) is reported separately
/// from a capability that was found but failed (`Load`/`Save`).
pub struct MeshGateway<'a> {
    registry: &'a dyn CapabilityRegistry,
}

impl<'a> MeshGateway<'a> {
    pub fn new(registry: &'a dyn CapabilityRegistry) -> Self {
        Self { registry }
    }

    /// Load `path` with the importer registered for its exact extension
    pub fn import(&self, path: &Utf8Path) -> Result<MeshDocument, ImportError> {
        if !path.is_file() {
            return Err(ImportError::NotFound(path.to_path_buf()));
        }
        // Probe readability before handing the path to a capability
        File::open(path).map_err(|source| ImportError::NotReadable {
            path: path.to_path_buf(),
            source,
        })?;

        let extension = path.extension().unwrap_or_default();
        let importer =
            self.registry
                .lookup_importer(extension)
                .ok_or_else(|| ImportError::NoImporter {
                    extension: extension.to_string(),
                })?;

        tracing::debug!("Importing {} as {}", path, importer.format_name());
        importer.load(path).map_err(|source| ImportError::Load {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save `document` to `path`, creating parent directories first, then
    /// write its textures next to it at `texture_quality`.
    ///
    /// The document is consumed; it is dropped once the export finishes or fails.
    /// When saving the mesh or its textures fails, every file and directory the
    /// export created is removed again.
    pub fn export(
        &self,
        document: MeshDocument,
        path: &Utf8Path,
        texture_quality: u8,
    ) -> Result<(), ExportError> {
        let extension = path.extension().unwrap_or_default();
        let exporter =
            self.registry
                .lookup_exporter(extension)
                .ok_or_else(|| ExportError::NoExporter {
                    extension: extension.to_string(),
                })?;

        let parent = match path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent,
            _ => Utf8Path::new("."),
        };
        let rollback = ExportRollback::prepare(parent)?;

        tracing::debug!("Exporting {} as {}", path, exporter.format_name());
        let saved = exporter
            .save(&document, path)
            .map_err(|source| ExportError::Save {
                path: path.to_path_buf(),
                source,
            })
            .and_then(|()| {
                document
                    .save_textures(parent, texture_quality)
                    .map_err(|source| ExportError::Textures {
                        path: path.to_path_buf(),
                        source,
                    })
            });

        if let Err(e) = saved {
            rollback.discard();
            return Err(e);
        }
        Ok(())
    }
}

/// What an output directory looked like before an export wrote into it
struct ExportRollback {
    directory: Utf8PathBuf,
    existing: HashSet<OsString>,
    /// Directories created for this export, deepest first
    created_dirs: Vec<Utf8PathBuf>,
}

impl ExportRollback {
    /// Create `directory` (and missing ancestors) and record its current entries
    fn prepare(directory: &Utf8Path) -> Result<Self, ExportError> {
        let mut created_dirs = Vec::new();
        let mut missing = Some(directory);
        while let Some(dir) = missing.filter(|d| !d.as_str().is_empty() && !d.exists()) {
            created_dirs.push(dir.to_path_buf());
            missing = dir.parent();
        }

        fs::create_dir_all(directory).map_err(|source| ExportError::CreateDir {
            path: directory.to_path_buf(),
            source,
        })?;

        let list_error = |source: std::io::Error| ExportError::ListDir {
            path: directory.to_path_buf(),
            source,
        };
        let existing = fs::read_dir(directory)
            .map_err(list_error)?
            .map(|entry| entry.map(|e| e.file_name()))
            .collect::<Result<HashSet<_>, _>>()
            .map_err(list_error)?;

        Ok(Self {
            directory: directory.to_path_buf(),
            existing,
            created_dirs,
        })
    }

    /// Remove everything written since `prepare`
    fn discard(self) {
        match fs::read_dir(&self.directory) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    if self.existing.contains(&entry.file_name()) {
                        continue;
                    }
                    let path = entry.path();
                    let removed = if path.is_dir() {
                        fs::remove_dir_all(&path)
                    } else {
                        fs::remove_file(&path)
                    };
                    match removed {
                        Ok(()) => tracing::debug!("Removed partial output {}", path.display()),
                        Err(e) => tracing::warn!(
                            "Failed to remove partial output {}: {}",
                            path.display(),
                            e
                        ),
                    }
                }
            }
            Err(e) => tracing::warn!(
                "Failed to clean up partial output in {}: {}",
                self.directory,
                e
            ),
        }

        // Only directories that are empty again go away
        for dir in &self.created_dirs {
            if fs::remove_dir(dir).is_err() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Material;
    use crate::registry::{MockExporter, MockImporter, PluginRegistry};
    use nalgebra::Point3;
    use tempfile::TempDir;

    fn temp_utf8() -> (TempDir, Utf8PathBuf) {
        let temp = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
        (temp, path)
    }

    fn triangle() -> MeshDocument {
        MeshDocument::from_geometry(
            "tri",
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        )
    }

    fn registry_with_importer(ext: &str, fails: bool) -> PluginRegistry {
        let mut importer = MockImporter::new();
        importer.expect_format_name().return_const("Mock");
        importer.expect_load().returning(move |path| {
            if fails {
                Err(ProcessingError::Parse {
                    path: path.to_path_buf(),
                    details: "corrupt".to_string(),
                })
            } else {
                Ok(triangle())
            }
        });
        let mut registry = PluginRegistry::new();
        registry.register_importer(ext, Box::new(importer));
        registry
    }

    #[test]
    fn test_import_missing_file() {
        let (_temp, dir) = temp_utf8();
        let registry = registry_with_importer("3ds", false);
        let gateway = MeshGateway::new(&registry);

        let result = gateway.import(&dir.join("missing.3ds"));
        assert!(matches!(result, Err(ImportError::NotFound(_))));
    }

    #[test]
    fn test_import_without_importer() {
        let (_temp, dir) = temp_utf8();
        let path = dir.join("model.3DS");
        fs::write(&path, b"data").unwrap();
        let registry = registry_with_importer("3ds", false);
        let gateway = MeshGateway::new(&registry);

        match gateway.import(&path) {
            Err(ImportError::NoImporter { extension }) => assert_eq!(extension, "3DS"),
            other => panic!("unexpected result: {:?}", other.map(|d| d.label)),
        }
    }

    #[test]
    fn test_import_load_failure_is_distinct() {
        let (_temp, dir) = temp_utf8();
        let path = dir.join("broken.3ds");
        fs::write(&path, b"data").unwrap();
        let registry = registry_with_importer("3ds", true);
        let gateway = MeshGateway::new(&registry);

        assert!(matches!(
            gateway.import(&path),
            Err(ImportError::Load { .. })
        ));
    }

    #[test]
    fn test_import_success() {
        let (_temp, dir) = temp_utf8();
        let path = dir.join("good.3ds");
        fs::write(&path, b"data").unwrap();
        let registry = registry_with_importer("3ds", false);
        let gateway = MeshGateway::new(&registry);

        let doc = gateway.import(&path).unwrap();
        assert_eq!(doc.face_count(), 1);
    }

    #[test]
    fn test_export_without_exporter() {
        let (_temp, dir) = temp_utf8();
        let registry = PluginRegistry::new();
        let gateway = MeshGateway::new(&registry);

        let result = gateway.export(triangle(), &dir.join("out.obj"), 50);
        assert!(matches!(result, Err(ExportError::NoExporter { .. })));
    }

    #[test]
    fn test_export_creates_parent_directories() {
        let (_temp, dir) = temp_utf8();
        let mut exporter = MockExporter::new();
        exporter.expect_format_name().return_const("Mock");
        exporter
            .expect_save()
            .times(1)
            .returning(|_, path| fs::write(path, b"mesh").map_err(|e| ProcessingError::io(path, e)));
        let mut registry = PluginRegistry::new();
        registry.register_exporter("obj", Box::new(exporter));
        let gateway = MeshGateway::new(&registry);

        let out = dir.join("a").join("b").join("c.obj");
        gateway.export(triangle(), &out, 50).unwrap();
        assert!(out.exists());
    }

    #[test]
    fn test_export_save_and_texture_failures() {
        let (_temp, dir) = temp_utf8();
        let mut failing = MockExporter::new();
        failing.expect_format_name().return_const("Mock");
        failing
            .expect_save()
            .returning(|_, _| Err(ProcessingError::Processing("disk full".to_string())));
        let mut ok = MockExporter::new();
        ok.expect_format_name().return_const("Mock");
        ok.expect_save().returning(|_, _| Ok(()));

        let mut registry = PluginRegistry::new();
        registry.register_exporter("obj", Box::new(failing));
        registry.register_exporter("stl", Box::new(ok));
        let gateway = MeshGateway::new(&registry);

        assert!(matches!(
            gateway.export(triangle(), &dir.join("x.obj"), 50),
            Err(ExportError::Save { .. })
        ));

        let mut textured = triangle();
        textured.materials.push(Material {
            name: "m".to_string(),
            diffuse: None,
            diffuse_texture: Some(dir.join("missing.png")),
        });
        assert!(matches!(
            gateway.export(textured, &dir.join("x.stl"), 50),
            Err(ExportError::Textures { .. })
        ));
    }

    /// Exporter that writes the mesh and a sidecar, then fails
    fn half_writing_exporter() -> MockExporter {
        let mut exporter = MockExporter::new();
        exporter.expect_format_name().return_const("Mock");
        exporter.expect_save().returning(|_, path| {
            fs::write(path.with_extension("mtl"), b"newmtl m").unwrap();
            fs::write(path, b"mesh").unwrap();
            Err(ProcessingError::Processing("interrupted".to_string()))
        });
        exporter
    }

    #[test]
    fn test_failed_save_leaves_no_partial_output() {
        let (_temp, dir) = temp_utf8();
        fs::write(dir.join("keep.obj"), b"earlier").unwrap();
        let mut registry = PluginRegistry::new();
        registry.register_exporter("obj", Box::new(half_writing_exporter()));
        let gateway = MeshGateway::new(&registry);

        let result = gateway.export(triangle(), &dir.join("x.obj"), 50);

        assert!(matches!(result, Err(ExportError::Save { .. })));
        assert!(!dir.join("x.obj").exists());
        assert!(!dir.join("x.mtl").exists());
        assert_eq!(fs::read(dir.join("keep.obj")).unwrap(), b"earlier");
    }

    #[test]
    fn test_failed_textures_remove_mesh_and_created_directories() {
        let (_temp, dir) = temp_utf8();
        let texture = dir.join("skin.png");
        fs::write(&texture, b"not really a png").unwrap();
        let mut exporter = MockExporter::new();
        exporter.expect_format_name().return_const("Mock");
        exporter
            .expect_save()
            .returning(|_, path| fs::write(path, b"mesh").map_err(|e| ProcessingError::io(path, e)));
        let mut registry = PluginRegistry::new();
        registry.register_exporter("obj", Box::new(exporter));
        let gateway = MeshGateway::new(&registry);

        // The first texture copies fine, the second one is missing
        let mut textured = triangle();
        for (name, texture) in [("a", texture), ("b", dir.join("missing.png"))] {
            textured.materials.push(Material {
                name: name.to_string(),
                diffuse: None,
                diffuse_texture: Some(texture),
            });
        }
        let out = dir.join("out").join("nested").join("x.obj");

        let result = gateway.export(textured, &out, 50);

        assert!(matches!(result, Err(ExportError::Textures { .. })));
        assert!(!dir.join("out").exists());
        assert!(dir.join("skin.png").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_import_unreadable_file() {
        use std::os::unix::fs::PermissionsExt;

        let (_temp, dir) = temp_utf8();
        let path = dir.join("locked.3ds");
        fs::write(&path, b"data").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();
        if File::open(&path).is_ok() {
            // Running as root; permissions are not enforced
            return;
        }
        let registry = registry_with_importer("3ds", false);
        let gateway = MeshGateway::new(&registry);

        let result = gateway.import(&path);

        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
        assert!(matches!(result, Err(ImportError::NotReadable { .. })));
    }
}
