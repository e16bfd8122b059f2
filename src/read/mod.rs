use cgmath::{Quaternion, Vector3};
use log::*;
use nom::bytes::complete::take;
use nom::multi::count;
use nom::number::complete::*;
use nom::sequence::tuple;
use nom::IResult;

use std::collections::HashSet;

use super::*;

mod utilities;

pub(crate) use utilities::*;

pub const HEADER_LEN: usize = 30;
pub const MODEL_LEN: usize = 20;
pub const NAME_LEN: usize = 15;
pub const BEZIER_LEN: usize = 16;
/// Unused tail of every bone record. Skipped, never interpreted.
pub const RESERVED_LEN: usize = 48;

pub const BONE_RECORD_LEN: usize = NAME_LEN + 4 + 3 * 4 + 4 * 4 + BEZIER_LEN + RESERVED_LEN;
pub const MORPH_RECORD_LEN: usize = NAME_LEN + 4 + 4;

fn ensure(i: &[u8], section: &'static str, needed: usize) -> Result<(), FormatError> {
    if i.len() < needed {
        return Err(FormatError::Truncated {
            section,
            needed,
            available: i.len(),
        });
    }
    Ok(())
}

/// Runs `f` after checking `needed` bytes are present, so the parser cannot
/// come up short.
fn section<'a, O, F>(
    i: &'a [u8],
    section: &'static str,
    needed: usize,
    f: F,
) -> Result<(&'a [u8], O), FormatError>
where
    F: Fn(&'a [u8]) -> IResult<&'a [u8], O>,
{
    ensure(i, section, needed)?;
    f(i).map_err(|_| FormatError::Truncated {
        section,
        needed,
        available: i.len(),
    })
}

fn payload_len(section: &'static str, n: u32, record_len: usize) -> Result<usize, FormatError> {
    (n as usize)
        .checked_mul(record_len)
        .ok_or(FormatError::CountOverflow { section, count: n })
}

fn bone_record(i: &[u8]) -> IResult<&[u8], (FixedText, BoneKeyframe)> {
    let (i, name) = fixed_text(NAME_LEN, decode_shift_jis)(i)?;
    let (i, frame) = le_u32(i)?;
    let (i, (x, y, z)) = tuple((le_f32, le_f32, le_f32))(i)?;
    let (i, (rx, ry, rz, rw)) = tuple((le_f32, le_f32, le_f32, le_f32))(i)?;
    let (i, bezier) = take(BEZIER_LEN)(i)?;
    let (i, _reserved) = take(RESERVED_LEN)(i)?;

    let mut interpolation = [0u8; BEZIER_LEN];
    interpolation.copy_from_slice(bezier);
    let key = BoneKeyframe {
        frame,
        position: Vector3::new(x, y, z),
        rotation: Quaternion::new(rw, rx, ry, rz),
        interpolation: Some(interpolation),
    };
    Ok((i, (name, key)))
}

fn morph_record(i: &[u8]) -> IResult<&[u8], (FixedText, MorphKeyframe)> {
    let (i, name) = fixed_text(NAME_LEN, decode_shift_jis)(i)?;
    let (i, frame) = le_u32(i)?;
    let (i, weight) = le_f32(i)?;
    Ok((i, (name, MorphKeyframe { frame, weight })))
}

#[derive(Default)]
struct Warnings {
    seen: HashSet<(&'static str, Vec<u8>)>,
    list: Vec<DecodeWarning>,
}

impl Warnings {
    fn take_text(&mut self, field: &'static str, text: FixedText) -> String {
        if text.lossy && self.seen.insert((field, text.raw.to_vec())) {
            warn!(
                "{} {:02x?} contains undecodable bytes, read as `{}`",
                field, text.raw, text.text
            );
            self.list.push(DecodeWarning {
                field,
                raw: text.raw.to_vec(),
                decoded: text.text.clone(),
            });
        }
        text.text
    }
}

impl MotionFile {
    /// Decodes a whole motion file.
    ///
    /// Fails without a partial result when the stream ends inside the fixed
    /// header or before the payload of a declared record count. Bytes after
    /// the morph section are ignored.
    pub fn parse(i: &[u8]) -> Result<Self, FormatError> {
        let mut warnings = Warnings::default();

        let (i, (header, model, bone_count)) = section(
            i,
            "header",
            HEADER_LEN + MODEL_LEN + 4,
            tuple((
                fixed_text(HEADER_LEN, decode_ascii),
                fixed_text(MODEL_LEN, decode_shift_jis),
                le_u32,
            )),
        )?;
        let header = warnings.take_text("header", header);
        let model = warnings.take_text("model name", model);
        debug!("header `{}`, model `{}`", header, model);

        let needed = payload_len("bone keyframes", bone_count, BONE_RECORD_LEN)?;
        let (i, bones) = section(
            i,
            "bone keyframes",
            needed,
            count(bone_record, bone_count as usize),
        )?;
        debug!("read {} bone keyframe(s)", bones.len());

        let (i, morph_count) = section(i, "morph keyframe count", 4, le_u32)?;
        let needed = payload_len("morph keyframes", morph_count, MORPH_RECORD_LEN)?;
        let (i, morphs) = section(
            i,
            "morph keyframes",
            needed,
            count(morph_record, morph_count as usize),
        )?;
        debug!("read {} morph keyframe(s)", morphs.len());

        if !i.is_empty() {
            trace!("ignoring {} trailing byte(s)", i.len());
        }

        let bones: Vec<_> = bones
            .into_iter()
            .map(|(name, key)| (warnings.take_text("bone name", name), key))
            .collect();
        let morphs: Vec<_> = morphs
            .into_iter()
            .map(|(name, key)| (warnings.take_text("morph name", name), key))
            .collect();

        Ok(MotionFile::from_records(header, model, bones, morphs).with_warnings(warnings.list))
    }
}
