//! Simplification parameter builder.

use crate::engine::MeshStats;
use crate::registry::{ParamValue, ParameterSet};

/// Build the parameter set for one quadric edge collapse run.
///
/// The target face count is `round(count * target_face_ratio)`, where `count`
/// is the selected face count when the mesh carries a selection and the
/// total face count otherwise. `Selected` is set only in the former case.
pub fn build_simplification_parameters(
    stats: &MeshStats,
    target_face_ratio: f64,
    quality_threshold: f64,
) -> ParameterSet {
    let selected = stats.selected_face_count > 0;
    let basis = if selected {
        stats.selected_face_count
    } else {
        stats.face_count
    };
    let target = (basis as f64 * target_face_ratio).round() as i64;

    ParameterSet::new()
        .with("TargetFaceNum", ParamValue::Int(target))
        .with("TargetPerc", ParamValue::Float(0.0))
        .with("QualityThr", ParamValue::Float(quality_threshold))
        .with("PreserveBoundary", ParamValue::Bool(true))
        .with("BoundaryWeight", ParamValue::Float(1.0))
        .with("PreserveNormal", ParamValue::Bool(false))
        .with("PreserveTopology", ParamValue::Bool(false))
        .with("OptimalPlacement", ParamValue::Bool(true))
        .with("PlanarQuadric", ParamValue::Bool(false))
        .with("PlanarWeight", ParamValue::Float(0.001))
        .with("QualityWeight", ParamValue::Bool(false))
        .with("AutoClean", ParamValue::Bool(true))
        .with("Selected", ParamValue::Bool(selected))
}
