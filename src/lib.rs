use cgmath::{Quaternion, Vector3};

use std::collections::HashMap;

pub mod bezier;
pub mod convert;
mod error;
pub mod export;
pub mod quat;
pub mod read;
pub mod resample;
mod write;

pub use error::*;

/// A decoded motion file.
///
/// Tracks are kept in the order their names first appear in the file and
/// every track's keyframes are frame-ascending. Nothing is mutated after
/// construction.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionFile {
    header: String,
    model: String,
    bones: Vec<BoneTrack>,
    morphs: Vec<MorphTrack>,
    warnings: Vec<DecodeWarning>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneKeyframe {
    pub frame: u32,
    pub position: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    /// Packed easing curves, see [`bezier`]. `None` means linear.
    pub interpolation: Option<[u8; 16]>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd)]
pub struct MorphKeyframe {
    pub frame: u32,
    pub weight: f32,
}

pub trait Keyframe {
    fn frame(&self) -> u32;
}

impl Keyframe for BoneKeyframe {
    fn frame(&self) -> u32 {
        self.frame
    }
}

impl Keyframe for MorphKeyframe {
    fn frame(&self) -> u32 {
        self.frame
    }
}

/// A named run of keyframes, sorted by frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Track<K> {
    name: String,
    keyframes: Vec<K>,
}

pub type BoneTrack = Track<BoneKeyframe>;
pub type MorphTrack = Track<MorphKeyframe>;

impl<K: Keyframe> Track<K> {
    /// Keyframes sharing a frame keep their relative order.
    pub fn new(name: impl Into<String>, mut keyframes: Vec<K>) -> Self {
        keyframes.sort_by_key(|k| k.frame());
        Self {
            name: name.into(),
            keyframes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keyframes(&self) -> &[K] {
        &self.keyframes
    }

    pub fn first_frame(&self) -> Option<u32> {
        self.keyframes.first().map(|k| k.frame())
    }

    pub fn last_frame(&self) -> Option<u32> {
        self.keyframes.last().map(|k| k.frame())
    }
}

fn group<K: Keyframe>(records: impl IntoIterator<Item = (String, K)>) -> Vec<Track<K>> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<K>)> = vec![];
    for (name, key) in records {
        let idx = match index.get(&name) {
            Some(&idx) => idx,
            None => {
                index.insert(name.clone(), groups.len());
                groups.push((name, vec![]));
                groups.len() - 1
            }
        };
        groups[idx].1.push(key);
    }
    groups
        .into_iter()
        .map(|(name, keys)| Track::new(name, keys))
        .collect()
}

impl MotionFile {
    /// Builds a motion from raw `(name, keyframe)` records in file order.
    pub fn from_records(
        header: impl Into<String>,
        model: impl Into<String>,
        bones: impl IntoIterator<Item = (String, BoneKeyframe)>,
        morphs: impl IntoIterator<Item = (String, MorphKeyframe)>,
    ) -> Self {
        Self {
            header: header.into(),
            model: model.into(),
            bones: group(bones),
            morphs: group(morphs),
            warnings: vec![],
        }
    }

    pub(crate) fn with_warnings(mut self, warnings: Vec<DecodeWarning>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn bones(&self) -> &[BoneTrack] {
        &self.bones
    }

    pub fn morphs(&self) -> &[MorphTrack] {
        &self.morphs
    }

    pub fn bone_track(&self, name: &str) -> Option<&BoneTrack> {
        self.bones.iter().find(|x| x.name == name)
    }

    pub fn morph_track(&self, name: &str) -> Option<&MorphTrack> {
        self.morphs.iter().find(|x| x.name == name)
    }

    pub fn bone_names(&self) -> impl Iterator<Item = &str> {
        self.bones.iter().map(|x| x.name())
    }

    pub fn morph_names(&self) -> impl Iterator<Item = &str> {
        self.morphs.iter().map(|x| x.name())
    }

    pub fn bone_key_count(&self) -> usize {
        self.bones.iter().map(|x| x.keyframes.len()).sum()
    }

    pub fn morph_key_count(&self) -> usize {
        self.morphs.iter().map(|x| x.keyframes.len()).sum()
    }

    /// Text fields that contained bytes the decoder had to replace.
    pub fn warnings(&self) -> &[DecodeWarning] {
        &self.warnings
    }

    /// Output length shared by every resampled track: one past the highest
    /// frame of any bone or morph key, and at least 1.
    pub fn total_frames(&self) -> usize {
        let bones = self
            .bones
            .iter()
            .flat_map(|x| x.keyframes.iter().map(|k| k.frame()));
        let morphs = self
            .morphs
            .iter()
            .flat_map(|x| x.keyframes.iter().map(|k| k.frame()));
        bones
            .chain(morphs)
            .max()
            .map(|f| f as usize + 1)
            .unwrap_or(1)
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    pub(crate) const EPSILON: f32 = 1e-4;

    pub(crate) fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    pub(crate) fn close_vec(a: Vector3<f32>, b: Vector3<f32>) -> bool {
        close(a.x, b.x) && close(a.y, b.y) && close(a.z, b.z)
    }

    pub(crate) fn close_quat(a: Quaternion<f32>, b: Quaternion<f32>) -> bool {
        close(a.s, b.s) && close_vec(a.v, b.v)
    }

    pub(crate) fn bone_key(frame: u32, position: [f32; 3]) -> BoneKeyframe {
        BoneKeyframe {
            frame,
            position: position.into(),
            rotation: Quaternion::new(1., 0., 0., 0.),
            interpolation: None,
        }
    }

    #[test]
    fn tracks_group_in_first_seen_order() {
        let bones = vec![
            ("left".to_string(), bone_key(5, [0., 0., 0.])),
            ("center".to_string(), bone_key(0, [0., 0., 0.])),
            ("left".to_string(), bone_key(1, [0., 0., 0.])),
        ];
        let mot = MotionFile::from_records("", "", bones, vec![]);
        let names: Vec<_> = mot.bone_names().collect();
        assert_eq!(names, ["left", "center"]);
        let left = mot.bone_track("left").unwrap();
        let frames: Vec<_> = left.keyframes().iter().map(|k| k.frame).collect();
        assert_eq!(frames, [1, 5]);
        assert_eq!(mot.bone_key_count(), 3);
    }

    #[test]
    fn equal_frames_keep_file_order() {
        let morphs = vec![
            ("a".to_string(), MorphKeyframe { frame: 3, weight: 0.1 }),
            ("a".to_string(), MorphKeyframe { frame: 1, weight: 0.2 }),
            ("a".to_string(), MorphKeyframe { frame: 3, weight: 0.3 }),
        ];
        let mot = MotionFile::from_records("", "", vec![], morphs);
        let weights: Vec<_> = mot.morphs()[0].keyframes().iter().map(|k| k.weight).collect();
        assert_eq!(weights, [0.2, 0.1, 0.3]);
    }

    #[test]
    fn total_frames_spans_bones_and_morphs() {
        let bones = vec![("center".to_string(), bone_key(12, [0., 0., 0.]))];
        let morphs = vec![("smile".to_string(), MorphKeyframe { frame: 40, weight: 1. })];
        let mot = MotionFile::from_records("", "", bones, morphs);
        assert_eq!(mot.total_frames(), 41);

        let empty = MotionFile::from_records("", "", vec![], vec![]);
        assert_eq!(empty.total_frames(), 1);
    }
}
