//! Hands resampled tracks to a target runtime.
//!
//! The runtime is reached through [`TrackWriter`]; skeleton knowledge comes
//! from a [`Host`]. Every track gets its own outcome so one bad track never
//! takes the rest of the motion down with it.

use cgmath::Vector3;
use log::*;

use std::fmt::Display;

use crate::resample::{resample_bone, resample_morph, ResampledBoneTrack, ResampledMorphTrack};
use crate::{ExportError, MotionFile};

/// Morph names with this prefix are internal to the authoring tool.
pub const RESERVED_PREFIX: &str = "__";

pub const DEFAULT_FRAME_RATE: f32 = 30.;

/// About nine hours at 30 fps. Every bone track holds one sample per frame.
pub const DEFAULT_MAX_FRAMES: usize = 1 << 20;

/// Receives finished tracks. Implemented once per target runtime.
pub trait TrackWriter {
    type Error: Display;

    fn add_bone_track(&mut self, name: &str) -> Result<(), Self::Error>;
    fn set_bone_keys(&mut self, track: &ResampledBoneTrack) -> Result<(), Self::Error>;
    fn add_morph_curve(&mut self, name: &str) -> Result<(), Self::Error>;
    fn set_morph_keys(&mut self, track: &ResampledMorphTrack) -> Result<(), Self::Error>;
}

/// What the target skeleton knows about the motion's names.
pub trait Host {
    /// Bind pose position of a bone, in target space.
    fn reference_position(&self, bone: &str) -> Option<Vector3<f32>>;

    fn has_bone(&self, _bone: &str) -> bool {
        true
    }

    fn has_morph_target(&self, morph: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportOptions {
    pub frame_rate: f32,
    pub max_frames: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            frame_rate: DEFAULT_FRAME_RATE,
            max_frames: DEFAULT_MAX_FRAMES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoKeyframes,
    UnknownBone,
    EmptyName,
    Reserved,
    UnknownMorphTarget,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackOutcome {
    Written,
    Skipped(SkipReason),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackReport {
    pub name: String,
    pub outcome: TrackOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub frame_rate: f32,
    pub total_frames: usize,
    pub bones: Vec<TrackReport>,
    pub morphs: Vec<TrackReport>,
}

impl ExportReport {
    fn all(&self) -> impl Iterator<Item = &TrackReport> {
        self.bones.iter().chain(self.morphs.iter())
    }

    pub fn written(&self) -> usize {
        self.all()
            .filter(|x| x.outcome == TrackOutcome::Written)
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.all()
            .filter(|x| matches!(x.outcome, TrackOutcome::Skipped(_)))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &TrackReport> {
        self.all()
            .filter(|x| matches!(x.outcome, TrackOutcome::Failed(_)))
    }
}

fn report(name: &str, outcome: TrackOutcome) -> TrackReport {
    TrackReport {
        name: name.to_string(),
        outcome,
    }
}

fn morph_skip_reason<H: Host>(name: &str, host: &H) -> Option<SkipReason> {
    if name.is_empty() {
        Some(SkipReason::EmptyName)
    } else if name.starts_with(RESERVED_PREFIX) {
        Some(SkipReason::Reserved)
    } else if !host.has_morph_target(name) {
        Some(SkipReason::UnknownMorphTarget)
    } else {
        None
    }
}

/// Resamples every track of `motion` and feeds it to `writer`.
///
/// Only an unusable frame rate or a motion longer than
/// [`ExportOptions::max_frames`] fails the whole export. Everything else is
/// reported per track.
pub fn export<H: Host, W: TrackWriter>(
    motion: &MotionFile,
    options: &ExportOptions,
    host: &H,
    writer: &mut W,
) -> Result<ExportReport, ExportError> {
    let frame_rate = options.frame_rate;
    if !(frame_rate.is_finite() && frame_rate > 0.) {
        return Err(ExportError::InvalidFrameRate(frame_rate));
    }
    let total_frames = motion.total_frames();
    if total_frames > options.max_frames {
        error!(
            "`{}` spans {} frame(s), refusing to resample past {}",
            motion.model(),
            total_frames,
            options.max_frames
        );
        return Err(ExportError::TooManyFrames {
            frames: total_frames,
            limit: options.max_frames,
        });
    }
    info!(
        "exporting `{}`: {} frame(s) at {} fps",
        motion.model(),
        total_frames,
        frame_rate
    );

    let mut bones = vec![];
    for track in motion.bones() {
        let name = track.name();
        if track.keyframes().is_empty() {
            bones.push(report(name, TrackOutcome::Skipped(SkipReason::NoKeyframes)));
            continue;
        }
        if !host.has_bone(name) {
            debug!("bone `{}` is not in the skeleton, skipping", name);
            bones.push(report(name, TrackOutcome::Skipped(SkipReason::UnknownBone)));
            continue;
        }
        if let Err(e) = writer.add_bone_track(name) {
            warn!("couldn't add bone track `{}`: {}", name, e);
            bones.push(report(name, TrackOutcome::Failed(e.to_string())));
            continue;
        }
        let resampled = resample_bone(
            track,
            frame_rate,
            total_frames,
            host.reference_position(name),
        );
        let outcome = match writer.set_bone_keys(&resampled) {
            Ok(()) => TrackOutcome::Written,
            Err(e) => {
                warn!("couldn't write keys of bone `{}`: {}", name, e);
                TrackOutcome::Failed(e.to_string())
            }
        };
        bones.push(report(name, outcome));
    }

    let mut morphs = vec![];
    for track in motion.morphs() {
        let name = track.name();
        if let Some(reason) = morph_skip_reason(name, host) {
            trace!("skipping morph `{}`: {:?}", name, reason);
            morphs.push(report(name, TrackOutcome::Skipped(reason)));
            continue;
        }
        // the curve may already exist on the target
        if let Err(e) = writer.add_morph_curve(name) {
            debug!("adding morph curve `{}` failed, writing keys anyway: {}", name, e);
        }
        let resampled = resample_morph(track, frame_rate);
        let outcome = match writer.set_morph_keys(&resampled) {
            Ok(()) => TrackOutcome::Written,
            Err(e) => {
                warn!("couldn't write keys of morph `{}`: {}", name, e);
                TrackOutcome::Failed(e.to_string())
            }
        };
        morphs.push(report(name, outcome));
    }

    let report = ExportReport {
        frame_rate,
        total_frames,
        bones,
        morphs,
    };
    info!(
        "wrote {} track(s), skipped {}, {} failed",
        report.written(),
        report.skipped(),
        report.failed_count()
    );
    Ok(report)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::*;
    use crate::MorphKeyframe;

    use std::collections::{HashMap, HashSet};

    #[derive(Default)]
    struct Scene {
        offsets: HashMap<String, Vector3<f32>>,
        bones: Option<HashSet<String>>,
        morphs: HashSet<String>,
    }

    impl Host for Scene {
        fn reference_position(&self, bone: &str) -> Option<Vector3<f32>> {
            self.offsets.get(bone).copied()
        }
        fn has_bone(&self, bone: &str) -> bool {
            self.bones.as_ref().map_or(true, |x| x.contains(bone))
        }
        fn has_morph_target(&self, morph: &str) -> bool {
            self.morphs.contains(morph)
        }
    }

    #[derive(Default)]
    struct Recorder {
        bones: Vec<ResampledBoneTrack>,
        morphs: Vec<ResampledMorphTrack>,
        curves: Vec<String>,
        refuse_keys: Option<String>,
        refuse_curves: bool,
    }

    impl TrackWriter for Recorder {
        type Error = String;

        fn add_bone_track(&mut self, _name: &str) -> Result<(), String> {
            Ok(())
        }
        fn set_bone_keys(&mut self, track: &ResampledBoneTrack) -> Result<(), String> {
            if self.refuse_keys.as_deref() == Some(&track.name[..]) {
                return Err("locked".into());
            }
            self.bones.push(track.clone());
            Ok(())
        }
        fn add_morph_curve(&mut self, name: &str) -> Result<(), String> {
            if self.refuse_curves {
                return Err("exists".into());
            }
            self.curves.push(name.to_string());
            Ok(())
        }
        fn set_morph_keys(&mut self, track: &ResampledMorphTrack) -> Result<(), String> {
            self.morphs.push(track.clone());
            Ok(())
        }
    }

    fn motion() -> MotionFile {
        let bones = vec![
            ("center".to_string(), bone_key(0, [0., 0., 0.])),
            ("center".to_string(), bone_key(30, [0., 10., 0.])),
            ("arm".to_string(), bone_key(10, [1., 0., 0.])),
        ];
        let morphs = vec![
            ("smile".to_string(), MorphKeyframe { frame: 0, weight: 0. }),
            ("smile".to_string(), MorphKeyframe { frame: 15, weight: 1. }),
            ("smile".to_string(), MorphKeyframe { frame: 30, weight: 0. }),
            ("__hidden".to_string(), MorphKeyframe { frame: 0, weight: 1. }),
            ("".to_string(), MorphKeyframe { frame: 0, weight: 1. }),
            ("blink".to_string(), MorphKeyframe { frame: 5, weight: 1. }),
        ];
        MotionFile::from_records("Vocaloid Motion Data 0002", "miku", bones, morphs)
    }

    fn scene() -> Scene {
        Scene {
            morphs: ["smile", "__hidden", ""].iter().map(|x| x.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn writes_every_track_with_shared_length() {
        let mut writer = Recorder::default();
        let report = export(&motion(), &ExportOptions::default(), &scene(), &mut writer).unwrap();
        assert_eq!(report.total_frames, 31);
        assert_eq!(writer.bones.len(), 2);
        assert!(writer.bones.iter().all(|x| x.samples.len() == 31));
        assert!(close_vec(writer.bones[0].samples[15].position, Vector3::new(0., 0., 50.)));

        assert_eq!(writer.curves, ["smile"]);
        let times: Vec<_> = writer.morphs[0].keys.iter().map(|k| k.time).collect();
        assert_eq!(times, [0., 0.5, 1.]);
    }

    #[test]
    fn morph_filters_are_reported() {
        let mut writer = Recorder::default();
        let report = export(&motion(), &ExportOptions::default(), &scene(), &mut writer).unwrap();
        let outcomes: Vec<_> = report.morphs.iter().map(|x| x.outcome.clone()).collect();
        assert_eq!(
            outcomes,
            [
                TrackOutcome::Written,
                TrackOutcome::Skipped(SkipReason::Reserved),
                TrackOutcome::Skipped(SkipReason::EmptyName),
                TrackOutcome::Skipped(SkipReason::UnknownMorphTarget),
            ]
        );
        assert_eq!(report.written(), 3);
        assert_eq!(report.skipped(), 3);
    }

    #[test]
    fn reference_positions_come_from_the_host() {
        let mut host = scene();
        host.offsets.insert("arm".into(), Vector3::new(0., 0., 100.));
        let mut writer = Recorder::default();
        export(&motion(), &ExportOptions::default(), &host, &mut writer).unwrap();
        let arm = writer.bones.iter().find(|x| x.name == "arm").unwrap();
        assert!(arm
            .positions()
            .all(|p| close_vec(p, Vector3::new(10., 0., 100.))));
    }

    #[test]
    fn one_failing_track_does_not_stop_the_rest() {
        let mut writer = Recorder {
            refuse_keys: Some("center".into()),
            ..Default::default()
        };
        let report = export(&motion(), &ExportOptions::default(), &scene(), &mut writer).unwrap();
        assert_eq!(report.bones[0].outcome, TrackOutcome::Failed("locked".into()));
        assert_eq!(report.bones[1].outcome, TrackOutcome::Written);
        assert_eq!(report.failed_count(), 1);
        let failed: Vec<_> = report.failures().map(|x| &x.name[..]).collect();
        assert_eq!(failed, ["center"]);
        assert_eq!(writer.bones.len(), 1);
    }

    #[test]
    fn curve_creation_failure_is_ignored() {
        let mut writer = Recorder {
            refuse_curves: true,
            ..Default::default()
        };
        let report = export(&motion(), &ExportOptions::default(), &scene(), &mut writer).unwrap();
        assert_eq!(report.morphs[0].outcome, TrackOutcome::Written);
        assert_eq!(writer.morphs.len(), 1);
    }

    #[test]
    fn unknown_bones_are_skipped() {
        let host = Scene {
            bones: Some(["center".to_string()].iter().cloned().collect()),
            ..scene()
        };
        let mut writer = Recorder::default();
        let report = export(&motion(), &ExportOptions::default(), &host, &mut writer).unwrap();
        assert_eq!(
            report.bones[1].outcome,
            TrackOutcome::Skipped(SkipReason::UnknownBone)
        );
        assert_eq!(writer.bones.len(), 1);
    }

    #[test]
    fn bad_frame_rate_is_rejected() {
        let mut writer = Recorder::default();
        for &rate in [0., -30., f32::NAN, f32::INFINITY].iter() {
            let options = ExportOptions {
                frame_rate: rate,
                ..Default::default()
            };
            assert!(export(&motion(), &options, &scene(), &mut writer).is_err());
        }
        assert!(writer.bones.is_empty());
    }

    #[test]
    fn overlong_motion_is_rejected_before_resampling() {
        let bones = vec![("center".to_string(), bone_key(u32::MAX, [0., 0., 0.]))];
        let mot = MotionFile::from_records("Vocaloid Motion Data 0002", "", bones, vec![]);
        let mut writer = Recorder::default();
        let err = export(&mot, &ExportOptions::default(), &scene(), &mut writer).unwrap_err();
        assert_eq!(
            err,
            ExportError::TooManyFrames {
                frames: u32::MAX as usize + 1,
                limit: DEFAULT_MAX_FRAMES,
            }
        );
        assert!(writer.bones.is_empty());

        let options = ExportOptions {
            max_frames: 31,
            ..Default::default()
        };
        assert!(export(&motion(), &options, &scene(), &mut writer).is_ok());
    }
}
