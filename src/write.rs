use cookie_factory::bytes::*;
use cookie_factory::combinator::slice;
use cookie_factory::multi::all;
use cookie_factory::sequence::tuple;
use cookie_factory::*;
use encoding_rs::SHIFT_JIS;

use std::convert::TryFrom;
use std::io;

use super::*;
use crate::read::{BEZIER_LEN, HEADER_LEN, MODEL_LEN, NAME_LEN, RESERVED_LEN};

const RESERVED: [u8; RESERVED_LEN] = [0; RESERVED_LEN];

fn pad(mut raw: Vec<u8>, width: usize) -> Vec<u8> {
    raw.resize(width, 0);
    raw
}

fn encode_ascii(text: &str, width: usize) -> Result<Vec<u8>, EncodeError> {
    if !text.is_ascii() {
        return Err(EncodeError::UnmappableName(text.to_string()));
    }
    let raw = text.as_bytes();
    Ok(pad(raw[..raw.len().min(width)].to_vec(), width))
}

/// Encodes whole characters only, so a cut name never ends in half a
/// double-byte character.
fn encode_shift_jis(text: &str, width: usize) -> Result<Vec<u8>, EncodeError> {
    let mut raw = Vec::with_capacity(width);
    let mut buf = [0u8; 4];
    for c in text.chars() {
        let (bytes, _, unmappable) = SHIFT_JIS.encode(c.encode_utf8(&mut buf));
        if unmappable {
            return Err(EncodeError::UnmappableName(text.to_string()));
        }
        if raw.len() + bytes.len() > width {
            break;
        }
        raw.extend_from_slice(&bytes);
    }
    Ok(pad(raw, width))
}

fn record_count(section: &'static str, n: usize) -> Result<u32, EncodeError> {
    u32::try_from(n).map_err(|_| EncodeError::TooManyRecords(section))
}

fn bone_record<'a, W: io::Write + 'a>(
    name: &'a [u8],
    key: &'a BoneKeyframe,
) -> impl SerializeFn<W> + 'a {
    let p = key.position;
    let q = key.rotation;
    tuple((
        slice(name),
        le_u32(key.frame),
        tuple((le_f32(p.x), le_f32(p.y), le_f32(p.z))),
        tuple((le_f32(q.v.x), le_f32(q.v.y), le_f32(q.v.z), le_f32(q.s))),
        slice(key.interpolation.unwrap_or([0; BEZIER_LEN])),
        slice(&RESERVED[..]),
    ))
}

fn morph_record<'a, W: io::Write + 'a>(
    name: &'a [u8],
    key: &'a MorphKeyframe,
) -> impl SerializeFn<W> + 'a {
    tuple((slice(name), le_u32(key.frame), le_f32(key.weight)))
}

fn encode_tracks<K>(tracks: &[Track<K>]) -> Result<Vec<(Vec<u8>, &K)>, EncodeError> {
    let mut records = vec![];
    for track in tracks {
        let name = encode_shift_jis(&track.name, NAME_LEN)?;
        for key in &track.keyframes {
            records.push((name.clone(), key));
        }
    }
    Ok(records)
}

impl MotionFile {
    /// Serializes the motion in the same layout [`MotionFile::parse`] reads.
    ///
    /// Records are grouped by track, in track order. Keys without a control
    /// block get a zeroed one and the reserved tail is always zero.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        let header = encode_ascii(&self.header, HEADER_LEN)?;
        let model = encode_shift_jis(&self.model, MODEL_LEN)?;
        let bones = encode_tracks(&self.bones)?;
        let morphs = encode_tracks(&self.morphs)?;
        let bone_count = record_count("bone keyframes", bones.len())?;
        let morph_count = record_count("morph keyframes", morphs.len())?;

        let bone_records = bones.iter().map(|(name, key)| bone_record(name, key));
        let morph_records = morphs.iter().map(|(name, key)| morph_record(name, key));
        let out = Vec::with_capacity(
            HEADER_LEN
                + MODEL_LEN
                + 8
                + bones.len() * read::BONE_RECORD_LEN
                + morphs.len() * read::MORPH_RECORD_LEN,
        );
        gen_simple(
            tuple((
                slice(header),
                slice(model),
                le_u32(bone_count),
                all(bone_records),
                le_u32(morph_count),
                all(morph_records),
            )),
            out,
        )
        .map_err(|e| EncodeError::Serialize(format!("{:?}", e)))
    }
}
