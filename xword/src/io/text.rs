//! Reader for the line-oriented plaintext dialect.
//!
//! The file is a sequence of `<SECTION>` headers, each followed by its
//! content lines: title, author, copyright, a WxH size line, the solution
//! grid one row per line with `.` for blocks, the across and down clues in
//! numbering order, and an optional notepad. Some sources pack several
//! clues on one line separated by `|`.

use crate::errors::ReadError;
use crate::io::puz::{across_len, down_len, starts_across, starts_down};
use crate::puzzle::{ACROSS, Cell, DOWN, Puzzle, Zone};
use log::warn;
use std::collections::BTreeMap;

const MAGIC: &str = "<ACROSS PUZZLE>";
const MAGIC_V2: &str = "<ACROSS PUZZLE V2>";

pub fn read(data: &[u8]) -> Result<Puzzle, ReadError> {
  let text = std::str::from_utf8(data).map_err(|_| ReadError::FormatMismatch)?;
  let mut lines = text.lines().map(str::trim_end);

  match lines.find(|line| !line.trim().is_empty()).map(str::trim) {
    Some(MAGIC) | Some(MAGIC_V2) => {}
    _ => return Err(ReadError::FormatMismatch),
  }

  let mut sections: BTreeMap<String, Vec<&str>> = BTreeMap::new();
  let mut current: Option<String> = None;
  for line in lines {
    let trimmed = line.trim();
    if trimmed.starts_with('<') && trimmed.ends_with('>') {
      current = Some(trimmed[1..trimmed.len() - 1].to_uppercase());
    } else if let Some(name) = &current {
      sections.entry(name.clone()).or_default().push(line);
    }
  }
  let section = |name: &str| sections.get(name).map(Vec::as_slice).unwrap_or(&[]);
  let first_line =
    |name: &str| section(name).iter().map(|l| l.trim()).find(|l| !l.is_empty());

  let (width, height) = parse_size(first_line("SIZE"))?;
  let mut puzzle = Puzzle::new(width, height);

  let rows: Vec<&str> =
    section("GRID").iter().map(|l| l.trim()).filter(|l| !l.is_empty()).collect();
  if rows.len() != height {
    return Err(ReadError::StructuralCorruption(format!(
      "grid has {} rows for a height of {height}",
      rows.len()
    )));
  }
  for (row, line) in rows.iter().enumerate() {
    let chars: Vec<char> = line.chars().collect();
    if chars.len() != width {
      return Err(ReadError::StructuralCorruption(format!(
        "grid row {row} has {} cells for a width of {width}",
        chars.len()
      )));
    }
    for (col, ch) in chars.iter().enumerate() {
      if *ch != '.' {
        puzzle.set_cell((row, col), Cell::new(ch.to_string()));
      }
    }
  }

  allocate(&mut puzzle, section("ACROSS"), section("DOWN"))?;
  puzzle.index_zones()?;
  puzzle.number_clues_by_position();

  puzzle.meta.title = first_line("TITLE").unwrap_or_default().to_string();
  puzzle.meta.author = first_line("AUTHOR").unwrap_or_default().to_string();
  puzzle.meta.copyright = first_line("COPYRIGHT").unwrap_or_default().to_string();
  puzzle.meta.notes = section("NOTEPAD")
    .iter()
    .map(|l| l.trim())
    .filter(|l| !l.is_empty())
    .collect::<Vec<_>>()
    .join("\n");

  Ok(puzzle)
}

fn parse_size(line: Option<&str>) -> Result<(usize, usize), ReadError> {
  let bad = || {
    ReadError::StructuralCorruption(format!("bad or missing size line {line:?}"))
  };
  let (w, h) = line.and_then(|l| l.split_once(['x', 'X'])).ok_or_else(bad)?;
  let width: usize = w.trim().parse().map_err(|_| bad())?;
  let height: usize = h.trim().parse().map_err(|_| bad())?;
  if width == 0 || height == 0 {
    return Err(bad());
  }
  Ok((width, height))
}

/// Hands the across and down clues out to the grid's entries in numbering
/// order. Clue counts must cover the entries; extras are dropped.
fn allocate(
  puzzle: &mut Puzzle,
  across: &[&str],
  down: &[&str],
) -> Result<(), ReadError> {
  let mut across = clue_lines(across).into_iter();
  let mut down = clue_lines(down).into_iter();

  for pos in puzzle.positions().collect::<Vec<_>>() {
    if starts_across(puzzle, pos) {
      let hint = across.next().ok_or_else(|| {
        ReadError::StructuralCorruption("not enough across clues".to_string())
      })?;
      let zone = Zone::across_run(pos, across_len(puzzle, pos));
      puzzle.add_clue(ACROSS, None, hint, zone);
    }
    if starts_down(puzzle, pos) {
      let hint = down.next().ok_or_else(|| {
        ReadError::StructuralCorruption("not enough down clues".to_string())
      })?;
      let zone = Zone::down_run(pos, down_len(puzzle, pos));
      puzzle.add_clue(DOWN, None, hint, zone);
    }
  }

  if across.next().is_some() || down.next().is_some() {
    warn!("text: more clues than grid entries, extras dropped");
  }
  Ok(())
}

fn clue_lines(lines: &[&str]) -> Vec<String> {
  lines
    .iter()
    .flat_map(|line| line.split('|'))
    .map(str::trim)
    .filter(|l| !l.is_empty())
    .map(str::to_string)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::puzzle::ClueId;

  const FIXTURE: &str = "\
<ACROSS PUZZLE>
<TITLE>
Text Fixture
<AUTHOR>
A. Setter
<COPYRIGHT>
(c) 2024
<SIZE>
3x3
<GRID>
CAT
O.E
WED
<ACROSS>
Feline
Hitched
<DOWN>
Bovine|Golf stand
<NOTEPAD>
Line one
Line two
";

  #[test]
  fn parses_grid_and_numbering() {
    let p = read(FIXTURE.as_bytes()).unwrap();
    assert_eq!((p.width(), p.height()), (3, 3));
    assert!(p.cell_at((1, 1)).is_none());
    assert_eq!(p.cell_at((2, 1)).unwrap().solution, "E");

    let across_1 = p.list(ACROSS).unwrap().by_number(1).unwrap();
    assert_eq!(across_1.hint, "Feline");
    assert_eq!(across_1.zone.positions(), [(0, 0), (0, 1), (0, 2)]);

    // The bar-packed down clues split into two.
    let down = p.list(DOWN).unwrap();
    assert_eq!(down.len(), 2);
    assert_eq!(down.by_number(2).unwrap().hint, "Golf stand");
    assert_eq!(
      down.by_number(2).unwrap().zone.positions(),
      [(0, 2), (1, 2), (2, 2)]
    );
  }

  #[test]
  fn reads_metadata_and_notepad() {
    let p = read(FIXTURE.as_bytes()).unwrap();
    assert_eq!(p.meta.title, "Text Fixture");
    assert_eq!(p.meta.author, "A. Setter");
    assert_eq!(p.meta.copyright, "(c) 2024");
    assert_eq!(p.meta.notes, "Line one\nLine two");
  }

  #[test]
  fn indexes_membership() {
    let p = read(FIXTURE.as_bytes()).unwrap();
    assert!(p.clues_at((0, 0)).contains(&ClueId::across(0)));
    assert!(p.clues_at((2, 2)).contains(&ClueId::down(1)));
  }

  #[test]
  fn other_text_is_a_format_mismatch() {
    assert!(matches!(read(b"TITLE: nope"), Err(ReadError::FormatMismatch)));
    assert!(matches!(read(&[0xFF, 0xFE]), Err(ReadError::FormatMismatch)));
  }

  #[test]
  fn missing_clues_are_structural() {
    let broken = FIXTURE.replace("Feline\nHitched", "Feline");
    assert!(matches!(
      read(broken.as_bytes()),
      Err(ReadError::StructuralCorruption(_))
    ));
  }

  #[test]
  fn ragged_grid_is_structural() {
    let broken = FIXTURE.replace("O.E", "O.");
    assert!(matches!(
      read(broken.as_bytes()),
      Err(ReadError::StructuralCorruption(_))
    ));
  }
}
