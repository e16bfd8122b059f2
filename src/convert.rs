//! Basis change from the motion format's convention to the target engine's.
//!
//! Source positions are y-up and scaled so one unit is ten target units.
//! The target is z-up with the source's z axis flipped onto -y.

use cgmath::{Matrix, Matrix3, Quaternion, Vector3};

use crate::quat::normalize_or_identity;

pub const UNIT_SCALE: f32 = 10.;

/// Rows are [1, 0, 0], [0, 0, -1], [0, 1, 0]. cgmath is column major.
fn basis() -> Matrix3<f32> {
    Matrix3::new(1., 0., 0., 0., 0., 1., 0., -1., 0.)
}

pub fn position(p: Vector3<f32>) -> Vector3<f32> {
    Vector3::new(p.x, -p.z, p.y) * UNIT_SCALE
}

/// Conjugates the rotation by the basis change: `B * R * B^T`.
pub fn rotation(q: Quaternion<f32>) -> Quaternion<f32> {
    let b = basis();
    let r = b * Matrix3::from(q) * b.transpose();
    from_matrix(&r)
}

/// Branches on the largest diagonal term to keep the square root well away
/// from zero.
fn from_matrix(mat: &Matrix3<f32>) -> Quaternion<f32> {
    let m = |row: usize, col: usize| mat[col][row];
    let trace = m(0, 0) + m(1, 1) + m(2, 2);
    let (w, x, y, z) = if trace > 0. {
        let s = (trace + 1.).sqrt() * 2.;
        (
            0.25 * s,
            (m(2, 1) - m(1, 2)) / s,
            (m(0, 2) - m(2, 0)) / s,
            (m(1, 0) - m(0, 1)) / s,
        )
    } else if m(0, 0) > m(1, 1) && m(0, 0) > m(2, 2) {
        let s = (1. + m(0, 0) - m(1, 1) - m(2, 2)).sqrt() * 2.;
        (
            (m(2, 1) - m(1, 2)) / s,
            0.25 * s,
            (m(0, 1) + m(1, 0)) / s,
            (m(0, 2) + m(2, 0)) / s,
        )
    } else if m(1, 1) > m(2, 2) {
        let s = (1. + m(1, 1) - m(0, 0) - m(2, 2)).sqrt() * 2.;
        (
            (m(0, 2) - m(2, 0)) / s,
            (m(0, 1) + m(1, 0)) / s,
            0.25 * s,
            (m(1, 2) + m(2, 1)) / s,
        )
    } else {
        let s = (1. + m(2, 2) - m(0, 0) - m(1, 1)).sqrt() * 2.;
        (
            (m(1, 0) - m(0, 1)) / s,
            (m(0, 2) + m(2, 0)) / s,
            (m(1, 2) + m(2, 1)) / s,
            0.25 * s,
        )
    };
    normalize_or_identity(Quaternion::new(w, x, y, z))
}
