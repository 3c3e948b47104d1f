//! Byte cursor over a `.skel` stream: fixed-width big-endian primitives plus
//! the 7-bit continuation varint.

use crate::{Color, Error};
use byteorder::{BigEndian, ByteOrder};

const VARINT_MAX_BYTES: usize = 5;

#[derive(Clone, Debug)]
pub(crate) struct BinaryInput<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> BinaryInput<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, cursor: 0 }
    }

    pub(crate) fn offset(&self) -> usize {
        self.cursor
    }

    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.cursor)
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], Error> {
        if self.remaining() < needed {
            return Err(Error::TruncatedInput {
                offset: self.cursor,
                needed,
                remaining: self.remaining(),
            });
        }
        let out = &self.bytes[self.cursor..self.cursor + needed];
        self.cursor += needed;
        Ok(out)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn read_bool(&mut self) -> Result<bool, Error> {
        Ok(self.read_u8()? != 0)
    }

    pub(crate) fn read_u16_be(&mut self) -> Result<u16, Error> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    pub(crate) fn read_f32_be(&mut self) -> Result<f32, Error> {
        Ok(BigEndian::read_f32(self.take(4)?))
    }

    /// Little-to-big 7-bit groups, up to 5 bytes. A continuation bit on the
    /// 5th byte marks the accumulated `u32` as negative (`value - 2^32`).
    pub(crate) fn read_varint(&mut self) -> Result<i64, Error> {
        let mut value: u32 = 0;
        for i in 0..VARINT_MAX_BYTES {
            let b = self.read_u8()?;
            value |= ((b & 0x7F) as u32).wrapping_shl(7 * i as u32);
            if (b & 0x80) == 0 {
                return Ok(value as i64);
            }
        }
        Ok(value as i64 - (1i64 << 32))
    }

    /// Varint payload value (event ints, hull counts, offsets). Kept at full
    /// width: a 5-byte value without the negative marker exceeds `i32`.
    pub(crate) fn read_int(&mut self) -> Result<i64, Error> {
        self.read_varint()
    }

    /// Varint element count. Negative counts read as empty.
    pub(crate) fn read_count(&mut self) -> Result<usize, Error> {
        Ok(usize::try_from(self.read_varint()?).unwrap_or(0))
    }

    /// Varint index into a table of `len` entries declared so far.
    pub(crate) fn read_index(&mut self, kind: &'static str, len: usize) -> Result<usize, Error> {
        let offset = self.cursor;
        let index = self.read_varint()?;
        match usize::try_from(index) {
            Ok(i) if i < len => Ok(i),
            _ => Err(Error::IndexOutOfRange {
                kind,
                index,
                len,
                offset,
            }),
        }
    }

    /// `0` is null, `1` is the empty string, otherwise `len - 1` UTF-8 bytes follow.
    pub(crate) fn read_string(&mut self) -> Result<Option<String>, Error> {
        let length = self.read_varint()?;
        match length {
            0 => return Ok(None),
            1 => return Ok(Some(String::new())),
            _ => {}
        }
        let byte_len = if length > 0 {
            (length - 1) as usize
        } else {
            (length as u32) as usize
        };
        let bytes_offset = self.cursor;
        let bytes = self.take(byte_len)?;
        let s = std::str::from_utf8(bytes).map_err(|source| Error::InvalidEncoding {
            offset: bytes_offset,
            len: byte_len,
            source,
        })?;
        Ok(Some(s.to_string()))
    }

    pub(crate) fn read_float_array(&mut self, scale: f32) -> Result<Vec<f32>, Error> {
        let count = self.read_count()?;
        let mut out = Vec::with_capacity(count.min(self.remaining() / 4));
        for _ in 0..count {
            out.push(self.read_f32_be()? * scale);
        }
        Ok(out)
    }

    pub(crate) fn read_int_array(&mut self) -> Result<Vec<i64>, Error> {
        let count = self.read_count()?;
        let mut out = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            out.push(self.read_int()?);
        }
        Ok(out)
    }

    /// Varint count followed by raw big-endian `u16`s (triangle indices).
    pub(crate) fn read_short_array(&mut self) -> Result<Vec<u16>, Error> {
        let count = self.read_count()?;
        let mut out = Vec::with_capacity(count.min(self.remaining() / 2));
        for _ in 0..count {
            out.push(self.read_u16_be()?);
        }
        Ok(out)
    }

    pub(crate) fn read_color(&mut self) -> Result<Color, Error> {
        let bytes = self.take(4)?;
        Ok(Color([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

#[cfg(test)]
mod tests {
    use super::BinaryInput;
    use crate::Error;
    use crate::binary::test_support::*;

    fn varint_round_trip(value: i32) -> i64 {
        let mut bytes = Vec::new();
        push_int(&mut bytes, value);
        let mut input = BinaryInput::new(&bytes);
        let out = input.read_varint().expect("read_varint");
        assert_eq!(input.remaining(), 0, "value {value} left trailing bytes");
        out
    }

    #[test]
    fn varint_decodes_group_boundaries() {
        for value in [0, 1, 127, 128, 16383, 16384, 2_097_151, 2_097_152, i32::MAX] {
            assert_eq!(varint_round_trip(value), value as i64, "value {value}");
        }
    }

    #[test]
    fn varint_fifth_byte_continuation_is_negative() {
        assert_eq!(varint_round_trip(-1), -1);
        assert_eq!(varint_round_trip(-128), -128);
        assert_eq!(varint_round_trip(i32::MIN), i32::MIN as i64);

        let mut input = BinaryInput::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0x8F]);
        assert_eq!(input.read_varint().unwrap(), -1);
    }

    #[test]
    fn varint_without_fifth_byte_continuation_stays_unsigned() {
        let mut input = BinaryInput::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
        assert_eq!(input.read_varint().unwrap(), u32::MAX as i64);
    }

    #[test]
    fn int_payload_keeps_unsigned_five_byte_values() {
        let mut input = BinaryInput::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0x0F, 0x80, 0x01]);
        assert_eq!(input.read_int().unwrap(), 4_294_967_295);
        assert_eq!(input.read_int().unwrap(), 128);
    }

    #[test]
    fn varint_truncated_mid_sequence() {
        let mut input = BinaryInput::new(&[0x80, 0x80]);
        let err = input.read_varint().unwrap_err();
        assert!(
            matches!(err, Error::TruncatedInput { offset: 2, needed: 1, remaining: 0 }),
            "{err:?}"
        );
    }

    #[test]
    fn string_length_prefix_semantics() {
        let mut bytes = Vec::new();
        push_varint(&mut bytes, 0);
        push_varint(&mut bytes, 1);
        push_varint(&mut bytes, 4);
        bytes.extend_from_slice(b"abc");

        let mut input = BinaryInput::new(&bytes);
        assert_eq!(input.read_string().unwrap(), None);
        assert_eq!(input.read_string().unwrap(), Some(String::new()));
        assert_eq!(input.read_string().unwrap().as_deref(), Some("abc"));
        assert_eq!(input.remaining(), 0);
    }

    #[test]
    fn string_rejects_invalid_utf8() {
        let bytes = [3, 0xC3, 0x28];
        let mut input = BinaryInput::new(&bytes);
        let err = input.read_string().unwrap_err();
        assert!(
            matches!(err, Error::InvalidEncoding { offset: 1, len: 2, .. }),
            "{err:?}"
        );
    }

    #[test]
    fn string_truncated_body() {
        let bytes = [6, b'a', b'b'];
        let mut input = BinaryInput::new(&bytes);
        let err = input.read_string().unwrap_err();
        assert!(
            matches!(err, Error::TruncatedInput { needed: 5, remaining: 2, .. }),
            "{err:?}"
        );
    }

    #[test]
    fn float_is_big_endian_ieee754() {
        let mut input = BinaryInput::new(&[0x3F, 0xC0, 0x00, 0x00]);
        assert_eq!(input.read_f32_be().unwrap(), 1.5);

        let mut short = BinaryInput::new(&[0x3F, 0xC0, 0x00]);
        assert!(matches!(
            short.read_f32_be(),
            Err(Error::TruncatedInput { needed: 4, remaining: 3, .. })
        ));
    }

    #[test]
    fn float_array_applies_scale() {
        let mut bytes = Vec::new();
        push_varint(&mut bytes, 2);
        push_f32_be(&mut bytes, 1.5);
        push_f32_be(&mut bytes, -2.0);
        let mut input = BinaryInput::new(&bytes);
        assert_eq!(input.read_float_array(2.0).unwrap(), vec![3.0, -4.0]);
    }

    #[test]
    fn int_and_short_arrays() {
        let mut bytes = Vec::new();
        push_varint(&mut bytes, 3);
        push_int(&mut bytes, 5);
        push_int(&mut bytes, 300);
        push_int(&mut bytes, -2);
        push_varint(&mut bytes, 2);
        push_u16_be(&mut bytes, 1);
        push_u16_be(&mut bytes, 0xFFFE);

        let mut input = BinaryInput::new(&bytes);
        assert_eq!(input.read_int_array().unwrap(), vec![5, 300, -2]);
        assert_eq!(input.read_short_array().unwrap(), vec![1, 0xFFFE]);
    }

    #[test]
    fn color_and_bool() {
        let mut input = BinaryInput::new(&[0xAA, 0x00, 0x10, 0xFF, 0x00, 0x02]);
        assert_eq!(input.read_color().unwrap().to_hex(), "aa0010ff");
        assert!(!input.read_bool().unwrap());
        assert!(input.read_bool().unwrap());
        assert!(matches!(input.read_bool(), Err(Error::TruncatedInput { .. })));
    }

    #[test]
    fn index_must_be_below_table_len() {
        let mut bytes = Vec::new();
        push_varint(&mut bytes, 2);
        push_varint(&mut bytes, 3);
        push_int(&mut bytes, -1);
        let mut input = BinaryInput::new(&bytes);
        assert_eq!(input.read_index("slot", 3).unwrap(), 2);
        assert!(matches!(
            input.read_index("slot", 3),
            Err(Error::IndexOutOfRange { kind: "slot", index: 3, len: 3, offset: 1 })
        ));
        assert!(matches!(
            input.read_index("slot", 3),
            Err(Error::IndexOutOfRange { index: -1, .. })
        ));
    }
}
