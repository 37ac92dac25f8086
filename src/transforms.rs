//! CPU-side box -> NDC normalization (spec C6), ported from
//! `original_source/src/transform.c`. Only `CARTESIAN` is implemented there
//! (the log variants are `TODO` in the original); SPEC_FULL supplements
//! them since the distillation's Non-goals don't name them.

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransformKind {
    Cartesian,
    LogX,
    LogY,
    LogLog,
}

/// Axis-aligned bounding box in data space.
#[derive(Copy, Clone, Debug)]
pub struct Box3 {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Box3 {
    pub fn new(min: [f32; 3], max: [f32; 3]) -> Self {
        Self { min, max }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct DataCoords {
    pub transform: TransformKind,
    pub bbox: Box3,
}

impl DataCoords {
    pub fn cartesian(bbox: Box3) -> Self {
        Self {
            transform: TransformKind::Cartesian,
            bbox,
        }
    }
}

/// Clamp used for non-positive inputs on a log axis. Resolves the spec's
/// open question ("two call sites disagree") in favor of the spec's own
/// suggestion: clamp-to-epsilon, least surprising, logged once.
const LOG_EPSILON: f32 = 1e-6;

fn log_axis(v: f32, warned: &mut bool) -> f32 {
    if v <= 0.0 {
        if !*warned {
            log::warn!("log transform received non-positive input {v}, clamping to {LOG_EPSILON}");
            *warned = true;
        }
        LOG_EPSILON.log10()
    } else {
        v.log10()
    }
}

/// Normalizes `pos_in` into `pos_out`, writing `[-1, +1]` componentwise for
/// `CARTESIAN`. `pos_out` is resized to match `pos_in` if needed.
pub fn transform(coords: &DataCoords, pos_in: &[[f32; 3]], pos_out: &mut Vec<[f32; 3]>) {
    log::debug!(
        "data normalization on {} position elements",
        pos_in.len()
    );
    pos_out.clear();
    pos_out.reserve(pos_in.len());

    let mut warned = false;
    let (log_x, log_y) = match coords.transform {
        TransformKind::Cartesian => (false, false),
        TransformKind::LogX => (true, false),
        TransformKind::LogY => (false, true),
        TransformKind::LogLog => (true, true),
    };

    let (bmin, bmax) = preprocess_box(coords.bbox, log_x, log_y, &mut warned);

    for p in pos_in {
        let mut v = *p;
        if log_x {
            v[0] = log_axis(v[0], &mut warned);
        }
        if log_y {
            v[1] = log_axis(v[1], &mut warned);
        }
        let mut out = [0.0f32; 3];
        for i in 0..3 {
            let span = bmax[i] - bmin[i];
            out[i] = if span.abs() > f32::EPSILON {
                2.0 * (v[i] - bmin[i]) / span - 1.0
            } else {
                0.0
            };
        }
        pos_out.push(out);
    }
}

fn preprocess_box(bbox: Box3, log_x: bool, log_y: bool, warned: &mut bool) -> ([f32; 3], [f32; 3]) {
    let mut min = bbox.min;
    let mut max = bbox.max;
    if log_x {
        min[0] = log_axis(min[0], warned);
        max[0] = log_axis(max[0], warned);
    }
    if log_y {
        min[1] = log_axis(min[1], warned);
        max[1] = log_axis(max[1], warned);
    }
    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cartesian_maps_box_corners_to_unit_cube_corners() {
        let coords = DataCoords::cartesian(Box3::new([-1.0, -1.0, -1.0], [1.0, 1.0, 1.0]));
        let mut out = Vec::new();
        transform(&coords, &[coords.bbox.min, coords.bbox.max], &mut out);
        for v in out[0] {
            assert!((v - (-1.0)).abs() < 1e-6);
        }
        for v in out[1] {
            assert!((v - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn cartesian_maps_center_to_origin() {
        let coords = DataCoords::cartesian(Box3::new([0.0, 0.0, 0.0], [10.0, 20.0, 4.0]));
        let mut out = Vec::new();
        transform(&coords, &[[5.0, 10.0, 2.0]], &mut out);
        for v in out[0] {
            assert!(v.abs() < 1e-6);
        }
    }

    #[test]
    fn segment_ring_stays_within_unit_magnitude_after_normalize() {
        // Scenario 3 from spec.md.
        let coords = DataCoords::cartesian(Box3::new([-1.0, -1.0, -1.0], [1.0, 1.0, 1.0]));
        let mut positions = Vec::new();
        for i in 0..100 {
            let theta = (i as f32) / 100.0 * std::f32::consts::TAU;
            for r in [0.25f32, 0.75] {
                positions.push([r * theta.cos(), r * theta.sin(), 0.0]);
            }
        }
        let mut out = Vec::new();
        transform(&coords, &positions, &mut out);
        for v in out {
            let mag = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
            assert!(mag <= 1.0 + 1e-4, "magnitude {mag} exceeds 1+eps");
        }
    }

    #[test]
    fn log_transform_clamps_non_positive_inputs() {
        let coords = DataCoords {
            transform: TransformKind::LogX,
            bbox: Box3::new([0.1, -1.0, -1.0], [100.0, 1.0, 1.0]),
        };
        let mut out = Vec::new();
        transform(&coords, &[[-5.0, 0.0, 0.0]], &mut out);
        // Clamped to epsilon, so it lands at the lower edge of the box, not NaN/inf.
        assert!(out[0][0].is_finite());
    }
}
