//! Byte-level scanning and writing shared by the binary codecs.

use crate::errors::ReadError;
use encoding::DecoderTrap::Strict;
use encoding::EncoderTrap;
use encoding::Encoding;
use encoding::all::ISO_8859_1;
use std::fmt::Debug;

/// String encoding of a byte stream. For the versioned save format this is
/// a property of the version, not negotiable independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
  /// Single-byte Western encoding used by the legacy formats and the early
  /// save versions.
  Latin1,
  Utf8,
}

pub fn decode_text(bytes: &[u8], encoding: TextEncoding) -> Result<String, ReadError> {
  match encoding {
    TextEncoding::Latin1 => ISO_8859_1.decode(bytes, Strict).map_err(|e| {
      ReadError::Encoding(format!("failed decoding {bytes:?} as ISO-8859-1: {e}"))
    }),
    TextEncoding::Utf8 => Ok(std::str::from_utf8(bytes)?.to_string()),
  }
}

pub fn encode_text(s: &str, encoding: TextEncoding) -> Vec<u8> {
  match encoding {
    // Unmappable characters degrade to '?' rather than failing the save.
    TextEncoding::Latin1 => ISO_8859_1
      .encode(s, EncoderTrap::Replace)
      .unwrap_or_else(|_| s.bytes().map(|b| if b < 0x80 { b } else { b'?' }).collect()),
    TextEncoding::Utf8 => s.as_bytes().to_vec(),
  }
}

pub struct Scanner<'a> {
  cursor: usize,
  data: &'a [u8],
}

impl Debug for Scanner<'_> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Scanner")
      .field("cursor", &self.cursor)
      .finish()
  }
}

impl<'a> Scanner<'a> {
  pub fn new(data: &'a [u8]) -> Self {
    Self { cursor: 0, data }
  }

  pub fn is_at_end(&self) -> bool {
    self.cursor >= self.data.len()
  }

  pub fn remaining(&self) -> usize {
    self.data.len().saturating_sub(self.cursor)
  }

  /// Consume and return the next byte.
  pub fn pop(&mut self) -> Result<u8, ReadError> {
    match self.data.get(self.cursor) {
      Some(&byte) => {
        self.cursor += 1;
        Ok(byte)
      }
      None => Err(ReadError::Eof(self.cursor)),
    }
  }

  /// Consume the next two bytes as a little-endian `u16`.
  pub fn parse_short(&mut self) -> Result<u16, ReadError> {
    let bytes = self.take_n_bytes(2)?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
  }

  /// Consume the next four bytes as a little-endian `u32`.
  pub fn parse_int(&mut self) -> Result<u32, ReadError> {
    let bytes = self.take_n_bytes(4)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
  }

  /// Take the next `expected.len()` bytes, if they match `expected`.
  pub fn take_exact(&mut self, expected: &[u8]) -> Result<(), ReadError> {
    let actual = self.take_n_bytes(expected.len())?;
    if actual != expected {
      return Err(ReadError::StructuralCorruption(format!(
        "expected {expected:?} at position {:#x} but got {actual:?}",
        self.cursor - expected.len()
      )));
    }
    Ok(())
  }

  /// Take the next `n` bytes.
  pub fn take_n_bytes(&mut self, n: usize) -> Result<&'a [u8], ReadError> {
    if self.cursor + n > self.data.len() {
      return Err(ReadError::Eof(self.data.len()));
    }
    let data = &self.data[self.cursor..self.cursor + n];
    self.cursor += n;
    Ok(data)
  }

  pub fn skip(&mut self, n: usize) -> Result<(), ReadError> {
    self.take_n_bytes(n).map(|_| ())
  }

  /// Parses a C-style NUL-terminated string, consuming the NUL byte but
  /// returning the raw bytes without it.
  pub fn parse_nul_terminated(&mut self) -> Result<&'a [u8], ReadError> {
    for (index, byte) in self.data[self.cursor..].iter().enumerate() {
      if *byte == 0 {
        let bytes = &self.data[self.cursor..self.cursor + index];
        self.cursor += index + 1;
        return Ok(bytes);
      }
    }
    Err(ReadError::Eof(self.data.len()))
  }

  /// Parses a length-prefixed (u16) string in the given encoding.
  pub fn parse_string(&mut self, encoding: TextEncoding) -> Result<String, ReadError> {
    let len = self.parse_short()? as usize;
    let bytes = self.take_n_bytes(len)?;
    decode_text(bytes, encoding)
  }
}

/// The write-side counterpart of [Scanner]: appends little-endian fields
/// to a growing buffer.
#[derive(Debug, Default)]
pub struct Writer {
  data: Vec<u8>,
}

impl Writer {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn into_bytes(self) -> Vec<u8> {
    self.data
  }

  pub fn push_byte(&mut self, byte: u8) {
    self.data.push(byte);
  }

  pub fn push_short(&mut self, value: u16) {
    self.data.extend_from_slice(&value.to_le_bytes());
  }

  pub fn push_int(&mut self, value: u32) {
    self.data.extend_from_slice(&value.to_le_bytes());
  }

  pub fn push_bytes(&mut self, bytes: &[u8]) {
    self.data.extend_from_slice(bytes);
  }

  /// Appends the bytes followed by a NUL terminator.
  pub fn push_nul_terminated(&mut self, bytes: &[u8]) {
    self.data.extend_from_slice(bytes);
    self.data.push(0);
  }

  /// Appends a length-prefixed (u16) string in the given encoding.
  /// Overlong strings are truncated at the length-field limit.
  pub fn push_string(&mut self, s: &str, encoding: TextEncoding) {
    let mut bytes = encode_text(s, encoding);
    bytes.truncate(u16::MAX as usize);
    self.push_short(bytes.len() as u16);
    self.push_bytes(&bytes);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn scanner_walks_fields() {
    let data = [0x34, 0x12, b'h', b'i', 0x00, 0xFF];
    let mut scanner = Scanner::new(&data);
    assert_eq!(scanner.parse_short().unwrap(), 0x1234);
    assert_eq!(scanner.parse_nul_terminated().unwrap(), b"hi");
    assert_eq!(scanner.pop().unwrap(), 0xFF);
    assert!(scanner.is_at_end());
    assert!(matches!(scanner.pop(), Err(ReadError::Eof(_))));
  }

  #[test]
  fn writer_round_trips_strings() {
    let mut writer = Writer::new();
    writer.push_string("café", TextEncoding::Latin1);
    writer.push_string("café", TextEncoding::Utf8);
    let bytes = writer.into_bytes();

    let mut scanner = Scanner::new(&bytes);
    assert_eq!(scanner.parse_string(TextEncoding::Latin1).unwrap(), "café");
    assert_eq!(scanner.parse_string(TextEncoding::Utf8).unwrap(), "café");
  }

  #[test]
  fn take_exact_reports_position() {
    let data = b"MAGIC";
    let mut scanner = Scanner::new(data);
    assert!(scanner.take_exact(b"MAGIC").is_ok());
    let mut scanner = Scanner::new(data);
    assert!(matches!(
      scanner.take_exact(b"MUGIC"),
      Err(ReadError::StructuralCorruption(_))
    ));
  }
}
