//! Circular geometry
//!
//! Cartesian/polar conversion and signed circular difference, in degrees.
//! Every "relative to" and "error versus" column of the trial table reduces to
//! [`circdiff`], so its wraparound and boundary handling are the contract:
//! absolute angles live in [0, 360) and signed differences in (-180, 180].

use crate::types::{finite, Cell};

/// Convert cartesian `(x, y)` to polar `(deg, mag)`.
///
/// `deg` is measured counterclockwise from the positive x axis in [0, 360).
/// The origin maps to `(0, 0)`, whatever the signs of its zeros.
pub fn cart2pol(x: f64, y: f64) -> (f64, f64) {
    let mag = x.hypot(y);
    if mag == 0.0 {
        return (0.0, 0.0);
    }
    let deg = (y.atan2(x).to_degrees() + 360.0).rem_euclid(360.0);
    // rem_euclid may round up to the modulus for tiny negative inputs
    let deg = if deg >= 360.0 { 0.0 } else { deg };
    (deg, mag)
}

/// Convert polar `(deg, mag)` to cartesian `(x, y)`
pub fn pol2cart(deg: f64, mag: f64) -> (f64, f64) {
    let rad = deg.to_radians();
    (mag * rad.cos(), mag * rad.sin())
}

/// Signed minimal circular distance from `angle` to `reference`, in (-180, 180].
///
/// An exact half-turn is always reported as +180.
pub fn circdiff(angle: f64, reference: f64) -> f64 {
    let diff = (angle - reference + 180.0).rem_euclid(360.0) - 180.0;
    if diff <= -180.0 {
        180.0
    } else {
        diff
    }
}

/// [`cart2pol`] over cells; non-finite or missing coordinates give undefined outputs
pub fn cart2pol_cell(x: Cell, y: Cell) -> (Cell, Cell) {
    match (x.and_then(finite), y.and_then(finite)) {
        (Some(x), Some(y)) => {
            let (deg, mag) = cart2pol(x, y);
            (finite(deg), finite(mag))
        }
        _ => (None, None),
    }
}

/// [`circdiff`] over cells; undefined when either side is undefined
pub fn circdiff_cell(angle: Cell, reference: Cell) -> Cell {
    match (angle.and_then(finite), reference.and_then(finite)) {
        (Some(angle), Some(reference)) => finite(circdiff(angle, reference)),
        _ => None,
    }
}

/// Element-wise [`circdiff_cell`] over equal-length columns
pub fn circdiff_many(angles: &[Cell], references: &[Cell]) -> Vec<Cell> {
    angles
        .iter()
        .zip(references)
        .map(|(&angle, &reference)| circdiff_cell(angle, reference))
        .collect()
}

/// Element-wise [`cart2pol_cell`] returning `(deg, mag)` columns
pub fn cart2pol_many(xs: &[Cell], ys: &[Cell]) -> (Vec<Cell>, Vec<Cell>) {
    xs.iter()
        .zip(ys)
        .map(|(&x, &y)| cart2pol_cell(x, y))
        .unzip()
}
