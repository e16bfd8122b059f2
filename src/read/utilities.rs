use encoding_rs::SHIFT_JIS;
use nom::bytes::complete::take;
use nom::IResult;

/// A fixed-width text field after decoding.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FixedText<'a> {
    /// Bytes before the first NUL.
    pub raw: &'a [u8],
    pub text: String,
    /// Some bytes were replaced with U+FFFD.
    pub lossy: bool,
}

pub(crate) type Decoder = fn(&[u8]) -> (String, bool);

pub(crate) fn until_nul(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    &bytes[..end]
}

pub(crate) fn decode_ascii(bytes: &[u8]) -> (String, bool) {
    let mut lossy = false;
    let text = bytes
        .iter()
        .map(|&b| {
            if b.is_ascii() {
                b as char
            } else {
                lossy = true;
                char::REPLACEMENT_CHARACTER
            }
        })
        .collect();
    (text, lossy)
}

/// Never sniffs a byte order mark: those bytes are invalid Shift-JIS and
/// get replaced like any other.
pub(crate) fn decode_shift_jis(bytes: &[u8]) -> (String, bool) {
    let (text, lossy) = SHIFT_JIS.decode_without_bom_handling(bytes);
    (text.into_owned(), lossy)
}

/// Reads a NUL terminated string stored in a field of exactly `width` bytes.
pub(crate) fn fixed_text<'a>(
    width: usize,
    decode: Decoder,
) -> impl Fn(&'a [u8]) -> IResult<&'a [u8], FixedText<'a>> {
    move |i: &'a [u8]| {
        let (i, field) = take(width)(i)?;
        let raw = until_nul(field);
        let (text, lossy) = decode(raw);
        Ok((i, FixedText { raw, text, lossy }))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn stops_at_first_nul() {
        let i = b"center\0\xfd\xfd\xfd\xfd\xfd\xfd\xfd\xfdrest";
        let (rest, text) = fixed_text(15, decode_shift_jis)(&i[..]).unwrap();
        assert_eq!(text.text, "center");
        assert!(!text.lossy);
        assert_eq!(rest, b"rest");
    }

    #[test]
    fn unterminated_field_uses_full_width() {
        let (_, text) = fixed_text(4, decode_ascii)(&b"abcdef"[..]).unwrap();
        assert_eq!(text.text, "abcd");
    }

    #[test]
    fn shift_jis_names_decode() {
        // "センター"
        let raw = [0x83, 0x5A, 0x83, 0x93, 0x83, 0x5E, 0x81, 0x5B];
        let (text, lossy) = decode_shift_jis(&raw);
        assert_eq!(text, "センター");
        assert!(!lossy);
    }

    #[test]
    fn invalid_bytes_are_replaced() {
        let (text, lossy) = decode_ascii(b"Vocaloid\xff");
        assert_eq!(text, "Vocaloid\u{FFFD}");
        assert!(lossy);

        // lead byte cut off by the field width
        let (text, lossy) = decode_shift_jis(&[b'a', 0x83]);
        assert!(text.starts_with('a'));
        assert!(text.contains('\u{FFFD}'));
        assert!(lossy);
    }

    #[test]
    fn byte_order_marks_are_not_sniffed() {
        let (text, lossy) = decode_shift_jis(&[0xFF, 0xFE, 0x41, 0x42]);
        assert_eq!(text, "\u{FFFD}\u{FFFD}AB");
        assert!(lossy);

        let (text, lossy) = decode_shift_jis(&[0xFE, 0xFF, 0x41, 0x42]);
        assert!(text.starts_with('\u{FFFD}'));
        assert!(text.ends_with("AB"));
        assert!(lossy);
    }

    #[test]
    fn short_field_fails() {
        assert!(fixed_text(15, decode_shift_jis)(&b"short"[..]).is_err());
    }
}
