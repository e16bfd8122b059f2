//! Easing curves packed into a bone keyframe.
//!
//! The 16 byte control block holds four rows (x1, y1, x2, y2) of four
//! columns, one column per [`Channel`]. Each byte maps 0..=127 onto 0..=1.

use crate::read::BEZIER_LEN;

const MAX_ITERATIONS: usize = 15;
const TOLERANCE: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    PositionX = 0,
    PositionY = 1,
    PositionZ = 2,
    Rotation = 3,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::PositionX,
        Channel::PositionY,
        Channel::PositionZ,
        Channel::Rotation,
    ];
}

/// Cubic bezier from (0, 0) to (1, 1) with two inner control points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BezierCurve {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

fn bernstein(p1: f32, p2: f32, t: f32) -> f32 {
    let s = 1. - t;
    3. * s * s * t * p1 + 3. * s * t * t * p2 + t * t * t
}

impl BezierCurve {
    pub const LINEAR: Self = BezierCurve {
        x1: 20. / 127.,
        y1: 20. / 127.,
        x2: 107. / 127.,
        y2: 107. / 127.,
    };

    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// `None` when the block is shorter than 16 bytes.
    pub fn from_control_bytes(bytes: &[u8], channel: Channel) -> Option<Self> {
        if bytes.len() < BEZIER_LEN {
            return None;
        }
        let c = channel as usize;
        let v = |row: usize| bytes[row * 4 + c] as f32 / 127.;
        Some(Self::new(v(0), v(1), v(2), v(3)))
    }

    /// Maps a linear fraction onto the curve.
    ///
    /// Bisects for the parameter whose x matches `x`, halving the step every
    /// iteration, then returns the curve's y at that parameter.
    pub fn evaluate(&self, x: f32) -> f32 {
        let x = x.max(0.).min(1.);
        let mut t = 0.5;
        for i in 0..MAX_ITERATIONS {
            let diff = bernstein(self.x1, self.x2, t) - x;
            if diff.abs() < TOLERANCE {
                break;
            }
            let step = 1. / (4u32 << i) as f32;
            if diff > 0. {
                t -= step;
            } else {
                t += step;
            }
        }
        bernstein(self.y1, self.y2, t)
    }
}

/// Warps `x` with one channel of a control block, or passes it through when
/// there is no usable block.
pub fn ease(control: Option<&[u8]>, channel: Channel, x: f32) -> f32 {
    match control.and_then(|c| BezierCurve::from_control_bytes(c, channel)) {
        Some(curve) => curve.evaluate(x),
        None => x,
    }
}
