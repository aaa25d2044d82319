//! Quadric edge collapse decimation.
//!
//! Edges are collapsed cheapest-first according to the quadric error metric
//! (Garland & Heckbert): every vertex accumulates the squared distances to
//! the planes of its incident faces, and merging two vertices places the
//! survivor where the summed quadric is smallest. The filter reads its
//! settings from the same named parameters the batch pipeline builds, so any
//! other engine exposing the same name is a drop-in replacement.

use super::document::MeshDocument;
use crate::registry::{NamedFilter, ParameterSet, ProcessingError};
use crate::services::QUADRIC_EDGE_COLLAPSE_FILTER;
use nalgebra::{Matrix3, Matrix4, Point3, Vector3, Vector4};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use tracing::debug;

/// Decimation settings decoded from a [`ParameterSet`]
#[derive(Debug, Clone, PartialEq)]
pub struct DecimationSettings {
    pub target_faces: usize,
    /// Fraction of the current face count to keep; overrides `target_faces` when non-zero
    pub target_fraction: f64,
    pub quality_threshold: f64,
    pub preserve_boundary: bool,
    pub boundary_weight: f64,
    pub preserve_normal: bool,
    pub preserve_topology: bool,
    pub optimal_placement: bool,
    pub planar_quadric: bool,
    pub planar_weight: f64,
    pub quality_weight: bool,
    pub auto_clean: bool,
    pub selected_only: bool,
}

impl DecimationSettings {
    pub fn from_parameters(parameters: &ParameterSet) -> Result<Self, ProcessingError> {
        let target_faces = parameters.get_int("TargetFaceNum")?;
        if target_faces < 0 {
            return Err(invalid("TargetFaceNum", "must not be negative"));
        }
        let target_fraction = parameters.get_float("TargetPerc")?;
        if !(0.0..=1.0).contains(&target_fraction) {
            return Err(invalid("TargetPerc", "must be within [0, 1]"));
        }
        let quality_threshold = parameters.get_float("QualityThr")?;
        if !(0.0..=1.0).contains(&quality_threshold) {
            return Err(invalid("QualityThr", "must be within [0, 1]"));
        }
        let boundary_weight = parameters.get_float("BoundaryWeight")?;
        if boundary_weight <= 0.0 || !boundary_weight.is_finite() {
            return Err(invalid("BoundaryWeight", "must be positive"));
        }
        let planar_weight = parameters.get_float("PlanarWeight")?;
        if planar_weight < 0.0 || !planar_weight.is_finite() {
            return Err(invalid("PlanarWeight", "must not be negative"));
        }

        Ok(Self {
            target_faces: target_faces as usize,
            target_fraction,
            quality_threshold,
            preserve_boundary: parameters.get_bool("PreserveBoundary")?,
            boundary_weight,
            preserve_normal: parameters.get_bool("PreserveNormal")?,
            preserve_topology: parameters.get_bool("PreserveTopology")?,
            optimal_placement: parameters.get_bool("OptimalPlacement")?,
            planar_quadric: parameters.get_bool("PlanarQuadric")?,
            planar_weight,
            quality_weight: parameters.get_bool("QualityWeight")?,
            auto_clean: parameters.get_bool("AutoClean")?,
            selected_only: parameters.get_bool("Selected")?,
        })
    }
}

fn invalid(name: &str, details: &str) -> ProcessingError {
    ProcessingError::InvalidParameter {
        name: name.to_string(),
        details: details.to_string(),
    }
}

/// Outcome of one decimation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecimationReport {
    pub original_faces: usize,
    pub final_faces: usize,
    pub collapses_performed: usize,
    pub collapses_rejected: usize,
}

/// The built-in "Simplification: Quadric Edge Collapse Decimation" filter
pub struct QuadricEdgeCollapse;

impl NamedFilter for QuadricEdgeCollapse {
    fn name(&self) -> &str {
        QUADRIC_EDGE_COLLAPSE_FILTER
    }

    fn apply(
        &self,
        document: &mut MeshDocument,
        parameters: &ParameterSet,
    ) -> Result<(), ProcessingError> {
        let settings = DecimationSettings::from_parameters(parameters)?;
        let report = decimate(document, &settings)?;
        debug!(
            "Decimated {}: {} -> {} faces ({} collapses, {} rejected)",
            document.label,
            report.original_faces,
            report.final_faces,
            report.collapses_performed,
            report.collapses_rejected
        );
        Ok(())
    }
}

/// Decimate `document` in place
pub fn decimate(
    document: &mut MeshDocument,
    settings: &DecimationSettings,
) -> Result<DecimationReport, ProcessingError> {
    document.validate()?;
    let original_faces = document.face_count();

    let mut decimator = Decimator::new(document, settings)?;
    let (collapses_performed, collapses_rejected) = decimator.run();
    decimator.write_back(document)?;

    Ok(DecimationReport {
        original_faces,
        final_faces: document.face_count(),
        collapses_performed,
        collapses_rejected,
    })
}

/// Candidate collapse of `remove` into `keep`, valid while both versions match
#[derive(Debug, Clone)]
struct Collapse {
    cost: f64,
    keep: usize,
    remove: usize,
    keep_version: u32,
    remove_version: u32,
    position: Point3<f64>,
}

impl PartialEq for Collapse {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost
    }
}

impl Eq for Collapse {}

impl PartialOrd for Collapse {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Collapse {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the max-heap pops the cheapest collapse first
        other.cost.total_cmp(&self.cost)
    }
}

struct Decimator<'a> {
    settings: &'a DecimationSettings,
    positions: Vec<Point3<f64>>,
    faces: Vec<[usize; 3]>,
    face_alive: Vec<bool>,
    face_selected: Vec<bool>,
    vertex_faces: Vec<Vec<usize>>,
    vertex_alive: Vec<bool>,
    movable: Vec<bool>,
    version: Vec<u32>,
    quadrics: Vec<Matrix4<f64>>,
    texcoords: Option<Vec<[f32; 2]>>,
    vertex_quality: Option<Vec<f64>>,
    counted_faces: usize,
    target: usize,
    min_cost: f64,
    heap: BinaryHeap<Collapse>,
}

impl<'a> Decimator<'a> {
    fn new(document: &MeshDocument, settings: &'a DecimationSettings) -> Result<Self, ProcessingError> {
        let nv = document.vertex_count();
        let nf = document.face_count();

        let mut vertex_faces: Vec<Vec<usize>> = Vec::new();
        vertex_faces.try_reserve(nv)?;
        vertex_faces.resize_with(nv, Vec::new);
        for (fi, face) in document.faces.iter().enumerate() {
            for &v in face {
                vertex_faces[v].push(fi);
            }
        }

        let mut quadrics = Vec::new();
        quadrics.try_reserve(nv)?;
        quadrics.resize(nv, Matrix4::zeros());

        // Faces that take part in the target count
        let counted_faces = if settings.selected_only {
            document.selected_face_count()
        } else {
            nf
        };
        let target = if settings.target_fraction > 0.0 {
            (counted_faces as f64 * settings.target_fraction).round() as usize
        } else {
            settings.target_faces
        };

        let mut movable = vec![true; nv];
        if settings.selected_only {
            for (v, incident) in vertex_faces.iter().enumerate() {
                movable[v] = incident.iter().all(|&f| document.face_selection[f]);
            }
        }

        let mut decimator = Self {
            settings,
            positions: document.vertices.clone(),
            faces: document.faces.clone(),
            face_alive: vec![true; nf],
            face_selected: document.face_selection.clone(),
            vertex_faces,
            vertex_alive: vec![true; nv],
            movable,
            version: vec![0; nv],
            quadrics,
            texcoords: document.texcoords.clone(),
            vertex_quality: document.vertex_quality.clone(),
            counted_faces,
            target,
            min_cost: 0.0,
            heap: BinaryHeap::new(),
        };

        decimator.min_cost = 1e-10 * decimator.bounding_diagonal_squared();
        decimator.initialize_quadrics();
        decimator.build_queue();
        Ok(decimator)
    }

    fn bounding_diagonal_squared(&self) -> f64 {
        let mut iter = self.positions.iter();
        let Some(first) = iter.next() else {
            return 0.0;
        };
        let (mut min, mut max) = (first.coords, first.coords);
        for p in iter {
            min = min.inf(&p.coords);
            max = max.sup(&p.coords);
        }
        (max - min).norm_squared()
    }

    fn initialize_quadrics(&mut self) {
        let mut edge_faces: HashMap<(usize, usize), Vec<usize>> = HashMap::new();

        for (fi, &[a, b, c]) in self.faces.iter().enumerate() {
            if let Some(plane) = face_plane(&self.positions[a], &self.positions[b], &self.positions[c]) {
                let q = plane_quadric(&plane);
                for v in [a, b, c] {
                    self.quadrics[v] += q;
                }
            }
            for (u, v) in [(a, b), (b, c), (c, a)] {
                if u != v {
                    edge_faces.entry(ordered(u, v)).or_default().push(fi);
                }
            }
        }

        let mut boundary_vertices = HashSet::new();
        for (&(u, v), incident) in &edge_faces {
            let constraint_weight = match incident.len() {
                1 => {
                    boundary_vertices.insert(u);
                    boundary_vertices.insert(v);
                    self.settings.boundary_weight
                }
                _ if self.settings.planar_quadric => self.settings.planar_weight,
                _ => continue,
            };
            if constraint_weight == 0.0 {
                continue;
            }
            let face = self.faces[incident[0]];
            if let Some(q) = self.edge_constraint(face, u, v) {
                let q = q * constraint_weight;
                self.quadrics[u] += q;
                self.quadrics[v] += q;
            }
        }

        if self.settings.preserve_boundary {
            for v in boundary_vertices {
                self.movable[v] = false;
            }
        }
    }

    /// Quadric of the plane through edge (u, v) perpendicular to `face`
    fn edge_constraint(&self, face: [usize; 3], u: usize, v: usize) -> Option<Matrix4<f64>> {
        let [a, b, c] = face;
        let normal = face_plane(&self.positions[a], &self.positions[b], &self.positions[c])?;
        let normal = Vector3::new(normal.x, normal.y, normal.z);
        let edge = self.positions[v] - self.positions[u];
        let n = edge.cross(&normal);
        let len = n.norm();
        if len < 1e-12 {
            return None;
        }
        let n = n / len;
        let d = -n.dot(&self.positions[u].coords);
        Some(plane_quadric(&Vector4::new(n.x, n.y, n.z, d)))
    }

    fn build_queue(&mut self) {
        let mut seen = HashSet::new();
        for fi in 0..self.faces.len() {
            let [a, b, c] = self.faces[fi];
            for (u, v) in [(a, b), (b, c), (c, a)] {
                if u != v && seen.insert(ordered(u, v)) {
                    self.push_candidate(u, v);
                }
            }
        }
    }

    fn push_candidate(&mut self, u: usize, v: usize) {
        if !self.movable[u] || !self.movable[v] {
            return;
        }
        let (keep, remove) = ordered(u, v);
        let q = self.quadrics[keep] + self.quadrics[remove];
        let position = self.placement(&q, keep, remove);
        let mut cost = quadric_error(&q, &position).max(0.0);

        if self.settings.quality_threshold > 0.0 {
            let min_quality = self
                .faces_after(keep, remove, &position)
                .iter()
                .map(|t| triangle_quality(&t[0], &t[1], &t[2]))
                .fold(1.0_f64, f64::min);
            if min_quality < self.settings.quality_threshold {
                cost = (cost + self.min_cost) * self.settings.quality_threshold
                    / min_quality.max(1e-4);
            }
        }

        if self.settings.quality_weight {
            if let Some(quality) = &self.vertex_quality {
                cost *= ((quality[keep] + quality[remove]) * 0.5).max(1e-3);
            }
        }

        self.heap.push(Collapse {
            cost,
            keep,
            remove,
            keep_version: self.version[keep],
            remove_version: self.version[remove],
            position,
        });
    }

    fn placement(&self, q: &Matrix4<f64>, a: usize, b: usize) -> Point3<f64> {
        let pa = self.positions[a];
        let pb = self.positions[b];

        if self.settings.optimal_placement {
            let system: Matrix3<f64> = q.fixed_view::<3, 3>(0, 0).into_owned();
            let rhs = -Vector3::new(q[(0, 3)], q[(1, 3)], q[(2, 3)]);
            if system.determinant().abs() > 1e-12 {
                if let Some(inverse) = system.try_inverse() {
                    let p = Point3::from(inverse * rhs);
                    let mid = nalgebra::center(&pa, &pb);
                    // Nearly flat regions produce far-away minima; fall back
                    if (p - mid).norm() <= 2.0 * (pb - pa).norm() + 1e-12 {
                        return p;
                    }
                }
            }
            let mid = nalgebra::center(&pa, &pb);
            return [pa, pb, mid]
                .into_iter()
                .min_by(|x, y| quadric_error(q, x).total_cmp(&quadric_error(q, y)))
                .unwrap_or(mid);
        }

        if quadric_error(q, &pa) <= quadric_error(q, &pb) {
            pa
        } else {
            pb
        }
    }

    /// Corners of every face that survives collapsing `remove` into `keep`
    /// with the survivor moved to `position`, as (before, after) pairs
    fn surviving_faces(
        &self,
        keep: usize,
        remove: usize,
        position: &Point3<f64>,
    ) -> Vec<([Point3<f64>; 3], [Point3<f64>; 3])> {
        let mut result = Vec::new();
        let mut visited = HashSet::new();
        for &f in self.vertex_faces[keep].iter().chain(&self.vertex_faces[remove]) {
            if !self.face_alive[f] || !visited.insert(f) {
                continue;
            }
            let face = self.faces[f];
            if face.contains(&keep) && face.contains(&remove) {
                continue;
            }
            let before = face.map(|v| self.positions[v]);
            let after = face.map(|v| {
                if v == keep || v == remove {
                    *position
                } else {
                    self.positions[v]
                }
            });
            result.push((before, after));
        }
        result
    }

    fn faces_after(&self, keep: usize, remove: usize, position: &Point3<f64>) -> Vec<[Point3<f64>; 3]> {
        self.surviving_faces(keep, remove, position)
            .into_iter()
            .map(|(_, after)| after)
            .collect()
    }

    fn neighbors(&self, v: usize) -> Vec<usize> {
        let mut result: Vec<usize> = self.vertex_faces[v]
            .iter()
            .filter(|&&f| self.face_alive[f])
            .flat_map(|&f| self.faces[f])
            .filter(|&n| n != v)
            .collect();
        result.sort_unstable();
        result.dedup();
        result
    }

    /// Link condition: the collapse keeps the surface a manifold of the same genus
    fn preserves_topology(&self, keep: usize, remove: usize) -> bool {
        let shared_faces = self.vertex_faces[keep]
            .iter()
            .filter(|&&f| self.face_alive[f] && self.faces[f].contains(&remove))
            .count();
        let keep_neighbors = self.neighbors(keep);
        let common = self
            .neighbors(remove)
            .into_iter()
            .filter(|n| keep_neighbors.binary_search(n).is_ok())
            .count();
        shared_faces > 0 && common == shared_faces
    }

    fn flips_normals(&self, keep: usize, remove: usize, position: &Point3<f64>) -> bool {
        self.surviving_faces(keep, remove, position)
            .iter()
            .any(|(before, after)| {
                let n0 = (before[1] - before[0]).cross(&(before[2] - before[0]));
                let n1 = (after[1] - after[0]).cross(&(after[2] - after[0]));
                n0.dot(&n1) < 0.0
            })
    }

    fn run(&mut self) -> (usize, usize) {
        let mut performed = 0;
        let mut rejected = 0;

        while self.counted_faces > self.target {
            let Some(candidate) = self.heap.pop() else {
                break;
            };
            let (keep, remove) = (candidate.keep, candidate.remove);

            if !self.vertex_alive[keep]
                || !self.vertex_alive[remove]
                || self.version[keep] != candidate.keep_version
                || self.version[remove] != candidate.remove_version
            {
                continue;
            }

            if (self.settings.preserve_topology && !self.preserves_topology(keep, remove))
                || (self.settings.preserve_normal
                    && self.flips_normals(keep, remove, &candidate.position))
            {
                rejected += 1;
                continue;
            }

            self.collapse(keep, remove, candidate.position);
            performed += 1;

            for n in self.neighbors(keep) {
                self.push_candidate(keep, n);
            }
        }

        (performed, rejected)
    }

    fn collapse(&mut self, keep: usize, remove: usize, position: Point3<f64>) {
        if let Some(uv) = &mut self.texcoords {
            let from_remove = (position - self.positions[remove]).norm_squared()
                < (position - self.positions[keep]).norm_squared();
            if from_remove {
                uv[keep] = uv[remove];
            }
        }
        if let Some(quality) = &mut self.vertex_quality {
            quality[keep] = (quality[keep] + quality[remove]) * 0.5;
        }

        self.positions[keep] = position;
        let removed_quadric = self.quadrics[remove];
        self.quadrics[keep] += removed_quadric;

        let incident = std::mem::take(&mut self.vertex_faces[remove]);
        for f in incident {
            if !self.face_alive[f] {
                continue;
            }
            if self.faces[f].contains(&keep) {
                self.face_alive[f] = false;
                if !self.settings.selected_only || self.face_selected[f] {
                    self.counted_faces -= 1;
                }
            } else {
                for v in self.faces[f].iter_mut() {
                    if *v == remove {
                        *v = keep;
                    }
                }
                self.vertex_faces[keep].push(f);
            }
        }

        let face_alive = &self.face_alive;
        self.vertex_faces[keep].retain(|&f| face_alive[f]);
        self.vertex_alive[remove] = false;
        self.version[keep] += 1;
        self.version[remove] += 1;
    }

    fn write_back(self, document: &mut MeshDocument) -> Result<(), ProcessingError> {
        let mut seen_faces = HashSet::new();
        let mut kept_faces = Vec::new();
        kept_faces.try_reserve(self.faces.len())?;

        for (fi, face) in self.faces.iter().enumerate() {
            if !self.face_alive[fi] {
                continue;
            }
            if self.settings.auto_clean {
                let [a, b, c] = *face;
                let degenerate = a == b
                    || b == c
                    || a == c
                    || face_plane(&self.positions[a], &self.positions[b], &self.positions[c])
                        .is_none();
                let mut key = *face;
                key.sort_unstable();
                if degenerate || !seen_faces.insert(key) {
                    continue;
                }
            }
            kept_faces.push(fi);
        }

        let mut referenced = vec![false; self.positions.len()];
        for &fi in &kept_faces {
            for &v in &self.faces[fi] {
                referenced[v] = true;
            }
        }

        let mut remap = vec![usize::MAX; self.positions.len()];
        let mut kept_vertices = Vec::new();
        kept_vertices.try_reserve(self.positions.len())?;
        for v in 0..self.positions.len() {
            let keep = self.vertex_alive[v] && (referenced[v] || !self.settings.auto_clean);
            if keep {
                remap[v] = kept_vertices.len();
                kept_vertices.push(v);
            }
        }

        document.vertices = kept_vertices.iter().map(|&v| self.positions[v]).collect();
        document.texcoords = self
            .texcoords
            .map(|uv| kept_vertices.iter().map(|&v| uv[v]).collect());
        document.vertex_quality = self
            .vertex_quality
            .map(|q| kept_vertices.iter().map(|&v| q[v]).collect());

        let face_materials = std::mem::take(&mut document.face_materials);
        document.faces = kept_faces
            .iter()
            .map(|&fi| self.faces[fi].map(|v| remap[v]))
            .collect();
        document.face_materials = kept_faces.iter().map(|&fi| face_materials[fi]).collect();
        document.face_selection = kept_faces.iter().map(|&fi| self.face_selected[fi]).collect();

        document.validate()
    }
}

fn ordered(u: usize, v: usize) -> (usize, usize) {
    if u < v { (u, v) } else { (v, u) }
}

fn face_plane(p0: &Point3<f64>, p1: &Point3<f64>, p2: &Point3<f64>) -> Option<Vector4<f64>> {
    let n = (p1 - p0).cross(&(p2 - p0));
    let len = n.norm();
    if len < 1e-12 || !len.is_finite() {
        return None;
    }
    let n = n / len;
    Some(Vector4::new(n.x, n.y, n.z, -n.dot(&p0.coords)))
}

fn plane_quadric(plane: &Vector4<f64>) -> Matrix4<f64> {
    plane * plane.transpose()
}

fn quadric_error(q: &Matrix4<f64>, p: &Point3<f64>) -> f64 {
    let v = Vector4::new(p.x, p.y, p.z, 1.0);
    v.dot(&(q * v))
}

/// Shape quality in [0, 1]; 1 for an equilateral triangle, 0 when degenerate
fn triangle_quality(p0: &Point3<f64>, p1: &Point3<f64>, p2: &Point3<f64>) -> f64 {
    let double_area = (p1 - p0).cross(&(p2 - p0)).norm();
    let squared_edges =
        (p1 - p0).norm_squared() + (p2 - p1).norm_squared() + (p0 - p2).norm_squared();
    if squared_edges <= 0.0 {
        return 0.0;
    }
    // 4 * sqrt(3) * area / sum of squared edge lengths
    2.0 * 3.0_f64.sqrt() * double_area / squared_edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ParamValue;

    /// Regular n x n grid of unit squares split into triangles
    fn grid(n: usize) -> MeshDocument {
        let mut vertices = Vec::new();
        for y in 0..=n {
            for x in 0..=n {
                vertices.push(Point3::new(x as f64, y as f64, 0.0));
            }
        }
        let mut faces = Vec::new();
        let idx = |x: usize, y: usize| y * (n + 1) + x;
        for y in 0..n {
            for x in 0..n {
                faces.push([idx(x, y), idx(x + 1, y), idx(x + 1, y + 1)]);
                faces.push([idx(x, y), idx(x + 1, y + 1), idx(x, y + 1)]);
            }
        }
        MeshDocument::from_geometry("grid", vertices, faces)
    }

    fn settings(target_faces: usize) -> DecimationSettings {
        DecimationSettings {
            target_faces,
            target_fraction: 0.0,
            quality_threshold: 0.3,
            preserve_boundary: true,
            boundary_weight: 1.0,
            preserve_normal: false,
            preserve_topology: false,
            optimal_placement: true,
            planar_quadric: false,
            planar_weight: 0.001,
            quality_weight: false,
            auto_clean: true,
            selected_only: false,
        }
    }

    fn full_parameters(target: i64) -> ParameterSet {
        ParameterSet::new()
            .with("TargetFaceNum", ParamValue::Int(target))
            .with("TargetPerc", ParamValue::Float(0.0))
            .with("QualityThr", ParamValue::Float(0.3))
            .with("PreserveBoundary", ParamValue::Bool(true))
            .with("BoundaryWeight", ParamValue::Float(1.0))
            .with("PreserveNormal", ParamValue::Bool(false))
            .with("PreserveTopology", ParamValue::Bool(false))
            .with("OptimalPlacement", ParamValue::Bool(true))
            .with("PlanarQuadric", ParamValue::Bool(false))
            .with("PlanarWeight", ParamValue::Float(0.001))
            .with("QualityWeight", ParamValue::Bool(false))
            .with("AutoClean", ParamValue::Bool(true))
            .with("Selected", ParamValue::Bool(false))
    }

    #[test]
    fn test_settings_from_parameters() {
        let decoded = DecimationSettings::from_parameters(&full_parameters(10)).unwrap();
        assert_eq!(decoded, settings(10));
    }

    #[test]
    fn test_settings_reject_missing_and_invalid_values() {
        let missing = ParameterSet::new().with("TargetFaceNum", ParamValue::Int(10));
        assert!(DecimationSettings::from_parameters(&missing).is_err());

        let negative = full_parameters(-1);
        assert!(DecimationSettings::from_parameters(&negative).is_err());

        let bad_quality = full_parameters(10).with("QualityThr", ParamValue::Float(1.5));
        assert!(DecimationSettings::from_parameters(&bad_quality).is_err());
    }

    #[test]
    fn test_decimate_reaches_target_on_flat_grid() {
        let mut doc = grid(8);
        let original = doc.face_count();
        let mut s = settings(original / 2);
        s.preserve_boundary = false;

        let report = decimate(&mut doc, &s).unwrap();

        assert_eq!(report.original_faces, 128);
        assert!(report.final_faces <= original / 2);
        assert!(report.final_faces > 0);
        assert!(report.collapses_performed > 0);
        assert_eq!(doc.face_count(), report.final_faces);
        assert!(doc.validate().is_ok());
        // Flat input stays flat
        assert!(doc.vertices.iter().all(|p| p.z.abs() < 1e-9));
    }

    #[test]
    fn test_decimate_preserves_boundary_vertices() {
        let mut doc = grid(6);
        let boundary: Vec<Point3<f64>> = doc
            .vertices
            .iter()
            .copied()
            .filter(|p| p.x == 0.0 || p.y == 0.0 || p.x == 6.0 || p.y == 6.0)
            .collect();

        decimate(&mut doc, &settings(10)).unwrap();

        for p in boundary {
            assert!(
                doc.vertices.iter().any(|q| (q - p).norm() < 1e-9),
                "boundary vertex {:?} was moved",
                p
            );
        }
    }

    #[test]
    fn test_target_at_or_above_face_count_is_noop() {
        let mut doc = grid(3);
        let before = doc.clone();

        let report = decimate(&mut doc, &settings(1000)).unwrap();

        assert_eq!(report.collapses_performed, 0);
        assert_eq!(doc.faces, before.faces);
        assert_eq!(doc.vertices, before.vertices);
    }

    #[test]
    fn test_selection_limits_collapses_to_selected_region() {
        let mut doc = grid(8);
        // Select the left half of the grid
        let selected: Vec<usize> = (0..doc.face_count())
            .filter(|&f| doc.faces[f].iter().all(|&v| doc.vertices[v].x <= 4.0))
            .collect();
        doc.select_faces(selected.iter().copied());
        let selected_before = doc.selected_face_count();
        let unselected_before = doc.face_count() - selected_before;

        let mut s = settings(selected_before / 2);
        s.preserve_boundary = false;
        s.selected_only = true;
        decimate(&mut doc, &s).unwrap();

        let unselected_after = doc.face_selection.iter().filter(|s| !**s).count();
        assert_eq!(unselected_after, unselected_before);
        assert!(doc.selected_face_count() < selected_before);
    }

    #[test]
    fn test_endpoint_placement_reuses_original_positions() {
        let mut doc = grid(6);
        let originals = doc.vertices.clone();
        let mut s = settings(20);
        s.preserve_boundary = false;
        s.optimal_placement = false;

        decimate(&mut doc, &s).unwrap();

        for p in &doc.vertices {
            assert!(originals.iter().any(|q| (q - p).norm() < 1e-12));
        }
    }

    #[test]
    fn test_preserve_topology_and_normals_still_reduce() {
        let mut doc = grid(8);
        let mut s = settings(64);
        s.preserve_boundary = false;
        s.preserve_topology = true;
        s.preserve_normal = true;

        let report = decimate(&mut doc, &s).unwrap();
        assert!(report.final_faces < report.original_faces);
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn test_texcoords_follow_surviving_vertices() {
        let mut doc = grid(4);
        doc.texcoords = Some(doc.vertices.iter().map(|p| [p.x as f32 / 4.0, p.y as f32 / 4.0]).collect());
        let mut s = settings(8);
        s.preserve_boundary = false;

        decimate(&mut doc, &s).unwrap();

        let uv = doc.texcoords.as_ref().unwrap();
        assert_eq!(uv.len(), doc.vertex_count());
    }

    #[test]
    fn test_auto_clean_drops_unreferenced_vertices() {
        let mut doc = grid(2);
        doc.vertices.push(Point3::new(10.0, 10.0, 10.0));

        decimate(&mut doc, &settings(1000)).unwrap();

        assert_eq!(doc.vertex_count(), 9);
    }

    #[test]
    fn test_filter_reports_its_name() {
        assert_eq!(
            QuadricEdgeCollapse.name(),
            "Simplification: Quadric Edge Collapse Decimation"
        );
    }

    #[test]
    fn test_triangle_quality_bounds() {
        let equilateral = triangle_quality(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.5, 3.0_f64.sqrt() / 2.0, 0.0),
        );
        assert!((equilateral - 1.0).abs() < 1e-9);

        let sliver = triangle_quality(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(2.0, 0.0, 0.0),
        );
        assert_eq!(sliver, 0.0);
    }
}
