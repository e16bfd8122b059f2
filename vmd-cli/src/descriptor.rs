use anyhow::*;
use cgmath::Vector3;
use log::*;
use serde::{Deserialize, Serialize};
use vmd::export::Host;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Describes the target skeleton the motion is baked for.
#[derive(Default, Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct Config {
    pub frame_rate: Option<f32>,
    /// Longest motion, in frames, that will be resampled.
    pub max_frames: Option<usize>,
    /// Bones the skeleton has. Every bone is accepted when absent.
    pub bones: Option<HashSet<String>>,
    /// Morph targets of the mesh. Every morph is accepted when absent.
    pub morph_targets: Option<HashSet<String>>,
    /// Bind pose positions in target space.
    pub reference_positions: HashMap<String, Vec3>,
}

#[derive(Default, Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Vec3(pub f32, pub f32, pub f32);

impl From<Vec3> for Vector3<f32> {
    fn from(vec: Vec3) -> Self {
        let Vec3(x, y, z) = vec;
        Vector3::new(x, y, z)
    }
}

impl Config {
    /// A missing file means the default configuration.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("no config at {}, using defaults", path.display());
            return Ok(Default::default());
        }
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&data).with_context(|| format!("failed to parse config {}", path.display()))
    }
}

impl Host for Config {
    fn reference_position(&self, bone: &str) -> Option<Vector3<f32>> {
        self.reference_positions.get(bone).map(|&x| x.into())
    }

    fn has_bone(&self, bone: &str) -> bool {
        self.bones.as_ref().map_or(true, |x| x.contains(bone))
    }

    fn has_morph_target(&self, morph: &str) -> bool {
        self.morph_targets.as_ref().map_or(true, |x| x.contains(morph))
    }
}
