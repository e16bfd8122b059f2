//! Shortest-path quaternion blending.

use cgmath::{InnerSpace, Quaternion};

/// Above this |dot| the angle is too small for a stable slerp.
const SLERP_THRESHOLD: f32 = 0.9995;

pub(crate) fn identity() -> Quaternion<f32> {
    Quaternion::new(1., 0., 0., 0.)
}

/// Normalizes `q`, falling back to the identity for a degenerate magnitude.
pub(crate) fn normalize_or_identity(q: Quaternion<f32>) -> Quaternion<f32> {
    let mag = q.magnitude();
    if mag > f32::EPSILON {
        q * (1. / mag)
    } else {
        identity()
    }
}

pub fn nlerp(a: Quaternion<f32>, b: Quaternion<f32>, t: f32) -> Quaternion<f32> {
    let b = if a.dot(b) < 0. { -b } else { b };
    normalize_or_identity(a + (b - a) * t)
}

pub fn slerp(a: Quaternion<f32>, b: Quaternion<f32>, t: f32) -> Quaternion<f32> {
    let t = t.max(0.).min(1.);
    let mut dot = a.dot(b);
    let b = if dot < 0. {
        dot = -dot;
        -b
    } else {
        b
    };
    if dot > SLERP_THRESHOLD {
        return nlerp(a, b, t);
    }

    let theta_0 = dot.acos();
    let sin_theta_0 = theta_0.sin();
    if sin_theta_0 == 0. {
        return a;
    }
    let theta = theta_0 * t;
    let sin_theta = theta.sin();
    let s0 = theta.cos() - dot * sin_theta / sin_theta_0;
    let s1 = sin_theta / sin_theta_0;
    a * s0 + b * s1
}
