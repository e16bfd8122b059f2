use anyhow::*;
use serde::Serialize;
use vmd::export::{ExportReport, TrackOutcome, TrackWriter};
use vmd::resample::{ResampledBoneTrack, ResampledMorphTrack};

use std::path::{Path, PathBuf};

#[derive(Serialize, Debug, Default, PartialEq)]
pub struct BoneCurves {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    /// x, y, z, w
    pub rotations: Vec<[f32; 4]>,
    pub scales: Vec<[f32; 3]>,
}

#[derive(Serialize, Debug, Default, PartialEq)]
pub struct CurveKey {
    pub time: f32,
    pub value: f32,
}

#[derive(Serialize, Debug, Default, PartialEq)]
pub struct MorphCurve {
    pub name: String,
    pub keys: Vec<CurveKey>,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct TrackEntry {
    pub name: String,
    pub outcome: String,
}

/// Collects tracks in memory and serializes them as one JSON document.
#[derive(Serialize, Debug, Default)]
pub struct JsonTrackWriter {
    pub model: String,
    pub frame_rate: f32,
    pub total_frames: usize,
    pub bones: Vec<BoneCurves>,
    pub morphs: Vec<MorphCurve>,
    pub report: Vec<TrackEntry>,
}

impl JsonTrackWriter {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..Default::default()
        }
    }

    pub fn finish(&mut self, report: &ExportReport) {
        self.frame_rate = report.frame_rate;
        self.total_frames = report.total_frames;
        self.report = report
            .bones
            .iter()
            .chain(report.morphs.iter())
            .map(|x| TrackEntry {
                name: x.name.clone(),
                outcome: match &x.outcome {
                    TrackOutcome::Written => "written".to_string(),
                    TrackOutcome::Skipped(reason) => format!("skipped ({:?})", reason),
                    TrackOutcome::Failed(e) => format!("failed: {}", e),
                },
            })
            .collect();
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize tracks")
    }
}

impl TrackWriter for JsonTrackWriter {
    type Error = Error;

    fn add_bone_track(&mut self, name: &str) -> Result<()> {
        if self.bones.iter().any(|x| x.name == name) {
            bail!("bone track `{}` already exists", name);
        }
        self.bones.push(BoneCurves {
            name: name.to_string(),
            ..Default::default()
        });
        Ok(())
    }

    fn set_bone_keys(&mut self, track: &ResampledBoneTrack) -> Result<()> {
        let curves = self
            .bones
            .iter_mut()
            .find(|x| x.name == track.name)
            .with_context(|| format!("no bone track `{}`", track.name))?;
        curves.positions = track.positions().map(Into::into).collect();
        curves.rotations = track
            .rotations()
            .map(|q| [q.v.x, q.v.y, q.v.z, q.s])
            .collect();
        curves.scales = track.scales().map(Into::into).collect();
        Ok(())
    }

    fn add_morph_curve(&mut self, name: &str) -> Result<()> {
        if self.morphs.iter().any(|x| x.name == name) {
            bail!("morph curve `{}` already exists", name);
        }
        self.morphs.push(MorphCurve {
            name: name.to_string(),
            keys: vec![],
        });
        Ok(())
    }

    fn set_morph_keys(&mut self, track: &ResampledMorphTrack) -> Result<()> {
        let curve = self
            .morphs
            .iter_mut()
            .find(|x| x.name == track.name)
            .with_context(|| format!("no morph curve `{}`", track.name))?;
        curve.keys = track
            .keys
            .iter()
            .map(|k| CurveKey {
                time: k.time,
                value: k.weight,
            })
            .collect();
        Ok(())
    }
}

/// `<stem>_Anim.json` next to the input, or the first free `_Anim_NN`.
pub fn output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|x| x.to_string_lossy().into_owned())
        .unwrap_or_else(|| "motion".to_string());
    let dir = input.parent().unwrap_or_else(|| Path::new(""));
    let path = dir.join(format!("{}_Anim.json", stem));
    if !path.exists() {
        return path;
    }
    (1..)
        .map(|i| dir.join(format!("{}_Anim_{:02}.json", stem, i)))
        .find(|x| !x.exists())
        .unwrap_or(path)
}
