use anyhow::*;
use log::*;
use structopt::StructOpt;
use vmd::export::{export, ExportOptions, DEFAULT_FRAME_RATE, DEFAULT_MAX_FRAMES};
use vmd::MotionFile;

use std::fs;
use std::path::{Path, PathBuf};

mod descriptor;
mod output;

#[derive(Debug, StructOpt)]
#[structopt(name = "vmd", about = "bakes vmd motions into per-frame tracks")]
enum Opt {
    /// Print what a motion file contains
    Info {
        #[structopt(parse(from_os_str))]
        input: PathBuf,
    },
    /// Resample a motion and write its tracks as JSON
    Convert {
        #[structopt(parse(from_os_str))]
        input: PathBuf,

        /// Defaults to `<input>_Anim.json`, numbered if that exists
        #[structopt(short, long, parse(from_os_str))]
        output: Option<PathBuf>,

        /// Target skeleton description
        #[structopt(short, long, parse(from_os_str), default_value = "vmd.toml")]
        config: PathBuf,

        /// Overrides the config's frame rate
        #[structopt(long)]
        fps: Option<f32>,

        /// Overrides the config's frame limit
        #[structopt(long)]
        max_frames: Option<usize>,
    },
}

fn load(path: &Path) -> Result<MotionFile> {
    let data = fs::read(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mot = MotionFile::parse(&data)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    for warning in mot.warnings() {
        warn!("{} was read as `{}`", warning.field, warning.decoded);
    }
    Ok(mot)
}

fn info(input: &Path) -> Result<()> {
    let mot = load(input)?;
    println!("header: {}", mot.header());
    println!("model: {}", mot.model());
    println!("frames: {}", mot.total_frames());
    println!("bone keys: {}", mot.bone_key_count());
    for track in mot.bones() {
        println!("  {} [{}]", track.name(), track.keyframes().len());
    }
    println!("morph keys: {}", mot.morph_key_count());
    for track in mot.morphs() {
        println!("  {} [{}]", track.name(), track.keyframes().len());
    }
    Ok(())
}

fn convert(
    input: &Path,
    output: Option<PathBuf>,
    config: &Path,
    fps: Option<f32>,
    max_frames: Option<usize>,
) -> Result<()> {
    let config = descriptor::Config::load(config)?;
    let mot = load(input)?;
    let options = ExportOptions {
        frame_rate: fps.or(config.frame_rate).unwrap_or(DEFAULT_FRAME_RATE),
        max_frames: max_frames.or(config.max_frames).unwrap_or(DEFAULT_MAX_FRAMES),
    };

    let mut writer = output::JsonTrackWriter::new(mot.model());
    let report = export(&mot, &options, &config, &mut writer)?;
    writer.finish(&report);
    for failed in report.failures() {
        error!("track `{}` was not written: {:?}", failed.name, failed.outcome);
    }

    let output = output.unwrap_or_else(|| output::output_path(input));
    fs::write(&output, writer.to_json()?)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!(
        "wrote {} track(s) to {}, skipped {}",
        report.written(),
        output.display(),
        report.skipped()
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    info!("starting up");

    match Opt::from_args() {
        Opt::Info { input } => info(&input),
        Opt::Convert {
            input,
            output,
            config,
            fps,
            max_frames,
        } => convert(&input, output, &config, fps, max_frames),
    }
}
