//! Checksum logic for the binary crossword-exchange format. See
//! <https://gist.github.com/sliminality/dab21fa834eae0a70193c7cd69c356d5#checksums>

#[must_use]
pub(crate) fn checksum_region(base: &[u8], input_checksum: u16) -> u16 {
  let mut checksum = input_checksum;
  for &byte in base {
    if checksum & 0x0001_u16 != 0 {
      checksum = (checksum >> 1) + 0x8000;
    } else {
      checksum >>= 1;
    }
    checksum = checksum.overflowing_add(byte as u16).0;
  }
  checksum
}

/// For metadata (title, author, copyright, or notes), we do nothing if the
/// string is empty, but if it's not empty we include the \0 byte in the
/// calculation.
#[must_use]
pub(crate) fn checksum_metadata_string(s: &[u8], input_checksum: u16) -> u16 {
  if s.is_empty() {
    return input_checksum;
  }

  let mut checksum = checksum_region(s, input_checksum);
  checksum = checksum_region(&[0], checksum);
  checksum
}

/// For clues, the trailing \0 byte is not included.
#[must_use]
pub(crate) fn checksum_clue(s: &[u8], input_checksum: u16) -> u16 {
  checksum_region(s, input_checksum)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_metadata_leaves_checksum_alone() {
    assert_eq!(checksum_metadata_string(b"", 0x1234), 0x1234);
    assert_ne!(checksum_metadata_string(b"X", 0x1234), 0x1234);
  }

  #[test]
  fn region_is_order_sensitive() {
    assert_ne!(checksum_region(b"AB", 0), checksum_region(b"BA", 0));
  }
}
