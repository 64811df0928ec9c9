//! The codec layer: one module per format, plus the prober that picks the
//! right reader for a byte stream of unknown provenance.

pub(crate) mod bytes;
pub(crate) mod checksum;
pub mod ipuz;
pub mod jpz;
pub mod meta;
pub mod providers;
pub mod puz;
pub mod scramble;
pub mod text;

use crate::errors::ReadError;
use crate::puzzle::Puzzle;
use log::debug;

type Reader = fn(&[u8]) -> Result<Puzzle, ReadError>;

/// Probe order. Binary first, then the JSON and XML dialects from most to
/// least self-describing; plaintext last because its magic is the loosest.
const READERS: &[(&str, Reader)] = &[
  ("puz", puz::read),
  ("interchange", ipuz::read),
  ("applet", jpz::read),
  ("cell-list", providers::read_cell_list),
  ("entry-list", providers::read_entry_list),
  ("text", text::read),
];

/// What one reader made of the bytes.
#[derive(Debug)]
pub enum ReadOutcome {
  Parsed(Puzzle),
  /// Not this reader's format; another may still claim it.
  NotThisFormat,
  /// The format was recognized but the data is bad. Terminal: no other
  /// reader gets to reinterpret recognized-but-broken bytes.
  Corrupt(ReadError),
}

fn probe(name: &str, reader: Reader, data: &[u8]) -> ReadOutcome {
  match reader(data) {
    Ok(puzzle) => {
      debug!("parsed as {name}");
      ReadOutcome::Parsed(puzzle)
    }
    Err(ReadError::FormatMismatch) => ReadOutcome::NotThisFormat,
    Err(e) => ReadOutcome::Corrupt(e),
  }
}

/// Parses a puzzle in whichever supported format the bytes turn out to be.
pub fn read_any(data: &[u8]) -> Result<Puzzle, ReadError> {
  for (name, reader) in READERS {
    match probe(name, *reader, data) {
      ReadOutcome::Parsed(puzzle) => return Ok(puzzle),
      ReadOutcome::NotThisFormat => continue,
      ReadOutcome::Corrupt(e) => return Err(e),
    }
  }
  Err(ReadError::FormatMismatch)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::puzzle::{ACROSS, Cell, DOWN, Zone};

  fn small_puzzle() -> Puzzle {
    let mut p = Puzzle::new(2, 2);
    for pos in [(0, 0), (0, 1), (1, 0), (1, 1)] {
      p.set_cell(pos, Cell::new("A"));
    }
    p.add_clue(ACROSS, Some(1), "Top", Zone::across_run((0, 0), 2));
    p.add_clue(ACROSS, Some(3), "Bottom", Zone::across_run((1, 0), 2));
    p.add_clue(DOWN, Some(1), "Left", Zone::down_run((0, 0), 2));
    p.add_clue(DOWN, Some(2), "Right", Zone::down_run((0, 1), 2));
    p.index_zones().unwrap();
    p.meta.title = "Probe".into();
    p
  }

  #[test]
  fn prober_routes_each_format() {
    let puz_bytes = puz::write(&small_puzzle()).unwrap();
    assert_eq!(read_any(&puz_bytes).unwrap().meta.title, "Probe");

    let json_bytes = ipuz::write(&small_puzzle());
    assert_eq!(read_any(&json_bytes).unwrap().meta.title, "Probe");

    let text_bytes =
      b"<ACROSS PUZZLE>\n<SIZE>\n2x2\n<GRID>\nAA\nAA\n<ACROSS>\nTop\nBottom\n<DOWN>\nLeft\nRight\n";
    assert_eq!(read_any(text_bytes).unwrap().list(DOWN).unwrap().len(), 2);
  }

  #[test]
  fn unknown_bytes_mismatch_everywhere() {
    assert!(matches!(
      read_any(b"\x00\x01\x02 garbage"),
      Err(ReadError::FormatMismatch)
    ));
  }

  #[test]
  fn recognized_but_corrupt_is_terminal() {
    let mut puz_bytes = puz::write(&small_puzzle()).unwrap();
    puz_bytes.truncate(0x40);
    assert!(matches!(read_any(&puz_bytes), Err(ReadError::Eof(_))));
  }
}
