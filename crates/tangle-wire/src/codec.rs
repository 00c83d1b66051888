// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Byte-level writer and reader: little-endian scalars, `u32` length
//! prefixes, bounded UTF-8 strings.

use thiserror::Error;

/// Errors produced by the byte reader and writer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Attempted to read beyond the end of the buffer.
    #[error("buffer too short")]
    OutOfBounds,
    /// UTF-8 decoding failed.
    #[error("invalid utf-8")]
    InvalidUtf8,
    /// String length exceeded the configured bound.
    #[error("string too long")]
    StringTooLong,
    /// Length or count prefix exceeded its bound.
    #[error("length too large")]
    LengthTooLarge,
    /// A `char` payload was not a Unicode scalar value.
    #[error("invalid char scalar {0:#x}")]
    InvalidChar(u32),
    /// A `bool` payload was neither 0 nor 1.
    #[error("invalid bool byte {0:#x}")]
    InvalidBool(u8),
}

/// Writer for little-endian scalars and length-prefixed data.
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Create a new writer with a pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Write a single byte.
    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Write a bool as one byte, `0` or `1`.
    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    /// Write an `i8`.
    pub fn write_i8(&mut self, value: i8) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a little-endian `i16`.
    pub fn write_i16_le(&mut self, value: i16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a little-endian `u16`.
    pub fn write_u16_le(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a little-endian `i32`.
    pub fn write_i32_le(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a little-endian `u32`.
    pub fn write_u32_le(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a little-endian `i64`.
    pub fn write_i64_le(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a little-endian `u64`.
    pub fn write_u64_le(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a little-endian IEEE-754 `f32`.
    pub fn write_f32_le(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a little-endian IEEE-754 `f64`.
    pub fn write_f64_le(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a `char` as its `u32` scalar value.
    pub fn write_char(&mut self, value: char) {
        self.write_u32_le(u32::from(value));
    }

    /// Write a `u32` count or length prefix.
    pub fn write_len(&mut self, len: usize) -> Result<(), CodecError> {
        let len: u32 = len.try_into().map_err(|_| CodecError::LengthTooLarge)?;
        self.write_u32_le(len);
        Ok(())
    }

    /// Write length-prefixed bytes (u32 LE length).
    pub fn write_len_prefixed_bytes(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        self.write_len(bytes.len())?;
        self.write_bytes(bytes);
        Ok(())
    }

    /// Write a length-prefixed UTF-8 string with a max bound.
    pub fn write_string(&mut self, value: &str, max_len: usize) -> Result<(), CodecError> {
        let bytes = value.as_bytes();
        if bytes.len() > max_len {
            return Err(CodecError::StringTooLong);
        }
        self.write_len_prefixed_bytes(bytes)
    }

    /// Consume the writer and return the buffer.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

/// Reader for little-endian scalars and length-prefixed data.
#[derive(Debug)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    /// Create a reader over the provided byte slice.
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    /// Bytes consumed so far.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let end = self
            .offset
            .checked_add(len)
            .ok_or(CodecError::OutOfBounds)?;
        if end > self.bytes.len() {
            return Err(CodecError::OutOfBounds);
        }
        let out = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        self.take(N)?
            .try_into()
            .map_err(|_| CodecError::OutOfBounds)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    /// Read a bool; any byte other than 0 or 1 is rejected.
    pub fn read_bool(&mut self) -> Result<bool, CodecError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::InvalidBool(other)),
        }
    }

    /// Read an `i8`.
    pub fn read_i8(&mut self) -> Result<i8, CodecError> {
        Ok(i8::from_le_bytes(self.array()?))
    }

    /// Read a little-endian `i16`.
    pub fn read_i16_le(&mut self) -> Result<i16, CodecError> {
        Ok(i16::from_le_bytes(self.array()?))
    }

    /// Read a little-endian `u16`.
    pub fn read_u16_le(&mut self) -> Result<u16, CodecError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    /// Read a little-endian `i32`.
    pub fn read_i32_le(&mut self) -> Result<i32, CodecError> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    /// Read a little-endian `u32`.
    pub fn read_u32_le(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    /// Read a little-endian `i64`.
    pub fn read_i64_le(&mut self) -> Result<i64, CodecError> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    /// Read a little-endian `u64`.
    pub fn read_u64_le(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    /// Read a little-endian `f32`.
    pub fn read_f32_le(&mut self) -> Result<f32, CodecError> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    /// Read a little-endian `f64`.
    pub fn read_f64_le(&mut self) -> Result<f64, CodecError> {
        Ok(f64::from_le_bytes(self.array()?))
    }

    /// Read a `char` from its `u32` scalar value.
    pub fn read_char(&mut self) -> Result<char, CodecError> {
        let raw = self.read_u32_le()?;
        char::from_u32(raw).ok_or(CodecError::InvalidChar(raw))
    }

    /// Read a `u32` count prefix bounded by `max`.
    ///
    /// Callers pre-sizing storage also cap the count by
    /// [`Reader::remaining`], so a forged count cannot force a large
    /// allocation.
    pub fn read_count(&mut self, max: usize) -> Result<usize, CodecError> {
        let count = usize::try_from(self.read_u32_le()?).map_err(|_| CodecError::LengthTooLarge)?;
        if count > max {
            return Err(CodecError::LengthTooLarge);
        }
        Ok(count)
    }

    /// Read a length-prefixed byte slice with a max bound.
    pub fn read_len_prefixed_bytes(&mut self, max_len: usize) -> Result<&'a [u8], CodecError> {
        let len = self.read_count(max_len)?;
        self.take(len)
    }

    /// Read a length-prefixed UTF-8 string with a max bound.
    pub fn read_str(&mut self, max_len: usize) -> Result<&'a str, CodecError> {
        let len = usize::try_from(self.read_u32_le()?).map_err(|_| CodecError::LengthTooLarge)?;
        if len > max_len {
            return Err(CodecError::StringTooLong);
        }
        std::str::from_utf8(self.take(len)?).map_err(|_| CodecError::InvalidUtf8)
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn scalars_and_strings_round_trip() {
        let mut w = Writer::with_capacity(64);
        w.write_bool(true);
        w.write_i16_le(-2);
        w.write_u64_le(u64::MAX);
        w.write_f64_le(1.5);
        w.write_char('λ');
        w.write_string("héllo", 64).unwrap();
        let bytes = w.into_vec();

        let mut r = Reader::new(&bytes);
        assert!(r.read_bool().unwrap());
        assert_eq!(r.read_i16_le().unwrap(), -2);
        assert_eq!(r.read_u64_le().unwrap(), u64::MAX);
        assert_eq!(r.read_f64_le().unwrap(), 1.5);
        assert_eq!(r.read_char().unwrap(), 'λ');
        assert_eq!(r.read_str(64).unwrap(), "héllo");
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn rejects_truncation_and_bad_payloads() {
        assert_eq!(Reader::new(&[1, 2]).read_u32_le(), Err(CodecError::OutOfBounds));
        assert_eq!(Reader::new(&[2]).read_bool(), Err(CodecError::InvalidBool(2)));
        assert_eq!(
            Reader::new(&0xD800u32.to_le_bytes()).read_char(),
            Err(CodecError::InvalidChar(0xD800))
        );
        let mut bad_utf8 = Writer::default();
        bad_utf8.write_len_prefixed_bytes(&[0xFF, 0xFE]).unwrap();
        assert_eq!(
            Reader::new(&bad_utf8.into_vec()).read_str(8),
            Err(CodecError::InvalidUtf8)
        );
    }

    #[test]
    fn enforces_bounds() {
        let mut w = Writer::default();
        assert_eq!(w.write_string("abcdef", 3), Err(CodecError::StringTooLong));
        w.write_u32_le(1_000);
        let bytes = w.into_vec();
        assert_eq!(Reader::new(&bytes).read_count(10), Err(CodecError::LengthTooLarge));
        assert_eq!(Reader::new(&bytes).read_str(10), Err(CodecError::StringTooLong));
    }
}
