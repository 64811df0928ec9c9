use std::str::Utf8Error;

/// The errors that may be produced by the codec layer.
///
/// [FormatMismatch](ReadError::FormatMismatch) is special: the multi-format
/// prober in [crate::io] swallows it and moves on to the next reader. Every
/// other variant is terminal for the parse attempt that produced it.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
  /// The bytes are not in this reader's format. Recoverable by trying
  /// another reader.
  #[error("not this format")]
  FormatMismatch,

  /// The bytes are in this reader's format, but a required field or grid
  /// reference is missing or inconsistent.
  #[error("structural corruption: {0}")]
  StructuralCorruption(String),

  /// Unexpectedly reached the end of the data at the given byte index.
  #[error("unexpected end of data at byte {0}")]
  Eof(usize),

  /// The save stream carries a version tag this build does not know.
  /// No partial upgrade is attempted.
  #[error("unsupported save version {0}")]
  VersionMismatch(u8),

  /// Got an error while decoding a string, possibly because it was
  /// incorrectly encoded or because the wrong encoding was assumed.
  #[error("failed to decode text: {0}")]
  Encoding(String),

  /// No tried key produced a matching checksum. The solution grid is
  /// left untouched.
  #[error("unscrambling failed: no matching checksum")]
  DescrambleFailure,

  /// An [I/O error](std::io::Error) occurred.
  #[error(transparent)]
  Io(#[from] std::io::Error),
}

impl From<Utf8Error> for ReadError {
  fn from(e: Utf8Error) -> Self {
    Self::Encoding(e.to_string())
  }
}

impl From<serde_json::Error> for ReadError {
  fn from(e: serde_json::Error) -> Self {
    Self::StructuralCorruption(format!("malformed JSON: {e}"))
  }
}
