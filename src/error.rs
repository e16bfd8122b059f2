use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    #[error("{section} needs {needed} bytes but only {available} are left")]
    Truncated {
        section: &'static str,
        needed: usize,
        available: usize,
    },
    #[error("{section} declares {count} records, which does not fit in memory")]
    CountOverflow { section: &'static str, count: u32 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("`{0}` cannot be represented in Shift-JIS")]
    UnmappableName(String),
    #[error("{0} has more records than the format can count")]
    TooManyRecords(&'static str),
    #[error("failed to serialize motion: {0}")]
    Serialize(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExportError {
    #[error("frame rate must be a positive finite number, got {0}")]
    InvalidFrameRate(f32),
    #[error("motion spans {frames} frames, more than the limit of {limit}")]
    TooManyFrames { frames: usize, limit: usize },
}

/// A text field that was decoded with replacement characters.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeWarning {
    pub field: &'static str,
    pub raw: Vec<u8>,
    pub decoded: String,
}
