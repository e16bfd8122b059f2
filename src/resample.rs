//! Turns sparse keyframes into tracks a runtime can play back directly.
//!
//! Bones are baked into one sample per output frame in the target basis.
//! Morphs keep one key per source keyframe, timed in seconds.

use cgmath::{Quaternion, Vector3};
use log::*;

use crate::bezier::{ease, Channel};
use crate::{convert, quat, BoneKeyframe, BoneTrack, MorphTrack};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneSample {
    pub position: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector3<f32>,
}

/// One sample per output frame, starting at frame 0.
#[derive(Debug, Clone, PartialEq)]
pub struct ResampledBoneTrack {
    pub name: String,
    pub frame_rate: f32,
    pub samples: Vec<BoneSample>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct MorphKey {
    /// Seconds from the start.
    pub time: f32,
    pub weight: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResampledMorphTrack {
    pub name: String,
    pub keys: Vec<MorphKey>,
}

impl ResampledBoneTrack {
    pub fn positions(&self) -> impl Iterator<Item = Vector3<f32>> + '_ {
        self.samples.iter().map(|x| x.position)
    }

    pub fn rotations(&self) -> impl Iterator<Item = Quaternion<f32>> + '_ {
        self.samples.iter().map(|x| x.rotation)
    }

    pub fn scales(&self) -> impl Iterator<Item = Vector3<f32>> + '_ {
        self.samples.iter().map(|x| x.scale)
    }
}

fn unit_scale() -> Vector3<f32> {
    Vector3::new(1., 1., 1.)
}

fn hold(key: &BoneKeyframe) -> (Vector3<f32>, Quaternion<f32>) {
    (convert::position(key.position), convert::rotation(key.rotation))
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Blends between two keyframes. The later key's control block shapes
/// every channel independently.
fn blend(k0: &BoneKeyframe, k1: &BoneKeyframe, frame: u32) -> (Vector3<f32>, Quaternion<f32>) {
    if k1.frame == k0.frame {
        return hold(k0);
    }
    let t = (frame - k0.frame) as f32 / (k1.frame - k0.frame) as f32;
    let control = k1.interpolation.as_ref().map(|x| &x[..]);
    let [tx, ty, tz, tr] = [
        ease(control, Channel::PositionX, t),
        ease(control, Channel::PositionY, t),
        ease(control, Channel::PositionZ, t),
        ease(control, Channel::Rotation, t),
    ];

    let (p0, p1) = (k0.position, k1.position);
    let source = Vector3::new(
        lerp(p0.x, p1.x, tx),
        lerp(p0.y, p1.y, ty),
        lerp(p0.z, p1.z, tz),
    );
    let q0 = convert::rotation(k0.rotation);
    let q1 = convert::rotation(k1.rotation);
    (convert::position(source), quat::slerp(q0, q1, tr))
}

/// Samples `track` at every frame in `0..total_frames`.
///
/// Frames before the first key hold the first key and frames after the last
/// key hold the last one. `reference` is added to every position after the
/// basis change. An empty track produces no samples.
pub fn resample_bone(
    track: &BoneTrack,
    frame_rate: f32,
    total_frames: usize,
    reference: Option<Vector3<f32>>,
) -> ResampledBoneTrack {
    let keys = track.keyframes();
    let mut samples = Vec::with_capacity(if keys.is_empty() { 0 } else { total_frames });

    if let (Some(first), Some(last)) = (keys.first(), keys.last()) {
        let head = hold(first);
        let tail = hold(last);
        let offset = reference.unwrap_or_else(|| Vector3::new(0., 0., 0.));
        let mut cursor = 0;
        for f in 0..total_frames {
            let (position, rotation) = if f as u64 <= first.frame as u64 {
                head
            } else if f as u64 >= last.frame as u64 {
                tail
            } else {
                let f = f as u32;
                while cursor + 1 < keys.len() && keys[cursor + 1].frame <= f {
                    cursor += 1;
                }
                blend(&keys[cursor], &keys[cursor + 1], f)
            };
            samples.push(BoneSample {
                position: position + offset,
                rotation,
                scale: unit_scale(),
            });
        }
    }
    trace!(
        "resampled bone `{}`: {} key(s) -> {} frame(s)",
        track.name(),
        keys.len(),
        samples.len()
    );

    ResampledBoneTrack {
        name: track.name().to_string(),
        frame_rate,
        samples,
    }
}

/// One key per source keyframe at `frame / frame_rate` seconds.
pub fn resample_morph(track: &MorphTrack, frame_rate: f32) -> ResampledMorphTrack {
    let keys = track
        .keyframes()
        .iter()
        .map(|k| MorphKey {
            time: k.frame as f32 / frame_rate,
            weight: k.weight,
        })
        .collect();
    ResampledMorphTrack {
        name: track.name().to_string(),
        keys,
    }
}
