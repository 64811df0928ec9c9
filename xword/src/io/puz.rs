//! The binary crossword-exchange (.puz) codec.
//!
//! The format has no official documentation, but
//! <https://gist.github.com/sliminality/dab21fa834eae0a70193c7cd69c356d5>
//! describes it well. The reader verifies every checksum the format
//! carries and reports mismatches without failing the parse; the writer
//! recomputes them all.

use crate::errors::ReadError;
use crate::io::bytes::{Scanner, TextEncoding, Writer, decode_text, encode_text};
use crate::io::checksum::{checksum_clue, checksum_metadata_string, checksum_region};
use crate::puzzle::{ACROSS, Cell, DOWN, Pos, Puzzle, Zone};
use log::warn;
use std::collections::BTreeMap;
use std::fmt::{self, Debug, Display};

const MAGIC: &[u8] = b"ACROSS&DOWN\0";
/// Header length up to the solution grid.
const HEADER_LEN: usize = 0x34;
/// Version emitted by the writer. 1.x strings are ISO-8859-1.
const WRITE_VERSION: &[u8; 4] = b"1.3\0";
/// Value of the scrambled tag for a locked puzzle.
const SCRAMBLED_TAG: u16 = 0x0004;

// GEXT flag bits.
const GEXT_CIRCLED: u8 = 0x80;
const GEXT_REVEALED: u8 = 0x40;

/// Parses a .puz file, logging checksum mismatches rather than surfacing
/// them. The front controller uses this entry point.
pub fn read(data: &[u8]) -> Result<Puzzle, ReadError> {
  let (puzzle, mismatches) = parse(data)?;
  for mismatch in &mismatches {
    warn!("puz: {mismatch:?}");
  }
  Ok(puzzle)
}

/// Parses a .puz file, returning the puzzle together with any checksum
/// mismatches encountered. Mismatches may indicate a corrupted file or a
/// bug in this crate, but the parsed content is usually still usable.
pub fn parse(data: &[u8]) -> Result<(Puzzle, Vec<ChecksumMismatch>), ReadError> {
  if data.len() < HEADER_LEN || &data[0x02..0x0E] != MAGIC {
    return Err(ReadError::FormatMismatch);
  }

  let mut mismatches = vec![];
  let cib_checksum_expected = checksum_region(&data[0x2C..HEADER_LEN], 0);

  let mut scanner = Scanner::new(data);

  let overall_checksum = scanner.parse_short()?;
  scanner.take_exact(MAGIC)?;

  let cib_checksum = scanner.parse_short()?;
  if cib_checksum != cib_checksum_expected {
    mismatches.push(ChecksumMismatch {
      checksum: Checksum::Cib,
      expected: cib_checksum_expected,
      actual: cib_checksum,
    });
  }

  let masked_checksums = scanner.take_n_bytes(8)?;

  let version = scanner.take_n_bytes(4)?;
  // Encoding is a property of the version: 2.x files are UTF-8.
  let encoding = if version.first() == Some(&b'2') {
    TextEncoding::Utf8
  } else {
    TextEncoding::Latin1
  };

  // Reserved 1C.
  scanner.skip(2)?;
  let scrambled_checksum = scanner.parse_short()?;
  // Reserved 0x20 through 0x2B.
  scanner.skip(12)?;

  let width = scanner.pop()? as usize;
  let height = scanner.pop()? as usize;
  if width == 0 || height == 0 {
    return Err(ReadError::StructuralCorruption(format!(
      "bad grid dimensions {width}x{height}"
    )));
  }

  let num_clues = scanner.parse_short()?;
  // Unknown bitmask.
  scanner.parse_short()?;
  let scrambled_tag = scanner.parse_short()?;

  let solution_bytes = scanner.take_n_bytes(width * height)?;
  let state_bytes = scanner.take_n_bytes(width * height)?;

  let title = scanner.parse_nul_terminated()?;
  let author = scanner.parse_nul_terminated()?;
  let copyright = scanner.parse_nul_terminated()?;

  let mut clue_bytes = Vec::with_capacity(num_clues as usize);
  for _ in 0..num_clues {
    clue_bytes.push(scanner.parse_nul_terminated()?);
  }

  let notes = scanner.parse_nul_terminated()?;

  let overall_checksum_expected = {
    let mut c = checksum_region(solution_bytes, cib_checksum_expected);
    c = checksum_region(state_bytes, c);
    c = text_checksum(title, author, copyright, &clue_bytes, notes, c);
    c
  };
  if overall_checksum != overall_checksum_expected {
    mismatches.push(ChecksumMismatch {
      checksum: Checksum::Overall,
      expected: overall_checksum_expected,
      actual: overall_checksum,
    });
  }

  let solution_checksum = checksum_region(solution_bytes, 0);
  let grid_checksum = checksum_region(state_bytes, 0);
  let partial_checksum = text_checksum(title, author, copyright, &clue_bytes, notes, 0);
  let expected_masked = masked_checksums_for(
    cib_checksum_expected,
    solution_checksum,
    grid_checksum,
    partial_checksum,
  );
  for (i, (expected, actual)) in expected_masked.iter().zip(masked_checksums).enumerate() {
    if expected != actual {
      mismatches.push(ChecksumMismatch {
        checksum: Checksum::Masked(i),
        expected: *expected as u16,
        actual: *actual as u16,
      });
    }
  }

  let mut puzzle = Puzzle::new(width, height);
  for (i, (&sol, &state)) in solution_bytes.iter().zip(state_bytes).enumerate() {
    let pos = (i / width, i % width);
    if sol == b'.' {
      continue;
    }
    let mut cell = Cell::new(decode_text(&[sol], encoding)?);
    if state != b'-' && state != b'.' {
      cell.response = decode_text(&[state], encoding)?;
    }
    puzzle.set_cell(pos, cell);
  }

  let clues: Vec<String> = clue_bytes
    .iter()
    .map(|c| decode_text(c, encoding))
    .collect::<Result<_, _>>()?;
  allocate_clues(&mut puzzle, &clues)?;

  puzzle.meta.title = decode_text(title, encoding)?;
  puzzle.meta.author = decode_text(author, encoding)?;
  puzzle.meta.copyright = decode_text(copyright, encoding)?;
  puzzle.meta.notes = decode_text(notes, encoding)?;

  if scrambled_tag != 0 {
    puzzle.set_scrambled_checksum(Some(scrambled_checksum));
  }

  read_extras(&mut scanner, &mut puzzle, encoding)?;
  puzzle.index_zones()?;

  Ok((puzzle, mismatches))
}

fn text_checksum(
  title: &[u8],
  author: &[u8],
  copyright: &[u8],
  clues: &[&[u8]],
  notes: &[u8],
  input: u16,
) -> u16 {
  let mut c = checksum_metadata_string(title, input);
  c = checksum_metadata_string(author, c);
  c = checksum_metadata_string(copyright, c);
  for clue in clues {
    c = checksum_clue(clue, c);
  }
  checksum_metadata_string(notes, c)
}

fn masked_checksums_for(cib: u16, solution: u16, grid: u16, partial: u16) -> [u8; 8] {
  [
    0x49 ^ (cib & 0xFF) as u8,
    0x43 ^ (solution & 0xFF) as u8,
    0x48 ^ (grid & 0xFF) as u8,
    0x45 ^ (partial & 0xFF) as u8,
    0x41 ^ ((cib & 0xFF00) >> 8) as u8,
    0x54 ^ ((solution & 0xFF00) >> 8) as u8,
    0x45 ^ ((grid & 0xFF00) >> 8) as u8,
    0x44 ^ ((partial & 0xFF00) >> 8) as u8,
  ]
}

/// Numbers the grid by block adjacency in reading order and hands the flat
/// clue list out across-first at each numbered square, building the zones
/// as it goes.
fn allocate_clues(puzzle: &mut Puzzle, clues: &[String]) -> Result<(), ReadError> {
  let mut clue_iter = clues.iter();
  let mut number = 0u32;

  for pos in puzzle.positions().collect::<Vec<_>>() {
    let starts_across = starts_across(puzzle, pos);
    let starts_down = starts_down(puzzle, pos);
    if !starts_across && !starts_down {
      continue;
    }
    number += 1;

    if starts_across {
      let hint = clue_iter.next().ok_or_else(|| {
        ReadError::StructuralCorruption("fewer clues than numbered squares".to_string())
      })?;
      let zone = Zone::across_run(pos, across_len(puzzle, pos));
      puzzle.add_clue(ACROSS, Some(number), hint.clone(), zone);
    }
    if starts_down {
      let hint = clue_iter.next().ok_or_else(|| {
        ReadError::StructuralCorruption("fewer clues than numbered squares".to_string())
      })?;
      let zone = Zone::down_run(pos, down_len(puzzle, pos));
      puzzle.add_clue(DOWN, Some(number), hint.clone(), zone);
    }
  }

  if clue_iter.next().is_some() {
    warn!("puz: more clues than numbered squares, extras dropped");
  }
  Ok(())
}

fn present(puzzle: &Puzzle, pos: Pos) -> bool {
  puzzle.cell_at(pos).is_some()
}

/// Whether the given position is the start of an across entry.
pub(crate) fn starts_across(puzzle: &Puzzle, (row, col): Pos) -> bool {
  present(puzzle, (row, col))
    && (col == 0 || !present(puzzle, (row, col - 1)))
    && present(puzzle, (row, col + 1))
}

/// Whether the given position is the start of a down entry.
pub(crate) fn starts_down(puzzle: &Puzzle, (row, col): Pos) -> bool {
  present(puzzle, (row, col))
    && (row == 0 || !present(puzzle, (row - 1, col)))
    && present(puzzle, (row + 1, col))
}

pub(crate) fn across_len(puzzle: &Puzzle, (row, col): Pos) -> usize {
  (col..puzzle.width())
    .take_while(|&c| present(puzzle, (row, c)))
    .count()
}

pub(crate) fn down_len(puzzle: &Puzzle, (row, col): Pos) -> usize {
  (row..puzzle.height())
    .take_while(|&r| present(puzzle, (r, col)))
    .count()
}

/// Walks the optional extra sections after the notes field:
/// GRBS/RTBL (rebus solutions), RUSR (rebus responses), GEXT (cell
/// flags), LTIM (timer).
fn read_extras(
  scanner: &mut Scanner,
  puzzle: &mut Puzzle,
  encoding: TextEncoding,
) -> Result<(), ReadError> {
  let mut rebus_grid: Option<Vec<u8>> = None;
  let mut rebus_table: BTreeMap<u8, String> = BTreeMap::new();

  while scanner.remaining() >= 8 {
    let name = scanner.take_n_bytes(4)?.to_vec();
    let len = scanner.parse_short()? as usize;
    let expected_checksum = scanner.parse_short()?;
    let data = scanner.take_n_bytes(len)?.to_vec();
    // Trailing NUL after the payload.
    scanner.skip(1)?;

    let actual_checksum = checksum_region(&data, 0);
    if actual_checksum != expected_checksum {
      warn!(
        "puz: extra section {:?} checksum mismatch ({expected_checksum:#x} vs {actual_checksum:#x})",
        String::from_utf8_lossy(&name)
      );
    }

    match name.as_slice() {
      b"GRBS" => rebus_grid = Some(data),
      b"RTBL" => rebus_table = parse_rebus_table(&data, encoding)?,
      b"GEXT" => apply_gext(puzzle, &data),
      b"LTIM" => apply_ltim(puzzle, &data),
      b"RUSR" => apply_rusr(puzzle, &data, encoding)?,
      _ => {
        warn!("puz: skipping unknown extra section {:?}", String::from_utf8_lossy(&name));
      }
    }
  }

  if let Some(grid) = rebus_grid {
    let width = puzzle.width();
    for (i, &marker) in grid.iter().enumerate() {
      if marker == 0 {
        continue;
      }
      let pos = (i / width, i % width);
      match (rebus_table.get(&(marker - 1)), puzzle.cell_at_mut(pos)) {
        (Some(solution), Some(cell)) => cell.solution = solution.clone(),
        _ => {
          warn!("puz: rebus marker {marker} at ({}, {}) has no table entry", pos.0, pos.1);
        }
      }
    }
  }
  Ok(())
}

/// RTBL payload looks like ` 0:REBUS; 1:XY;` — key padded to two
/// characters, entries terminated by semicolons.
fn parse_rebus_table(
  data: &[u8],
  encoding: TextEncoding,
) -> Result<BTreeMap<u8, String>, ReadError> {
  let text = decode_text(data, encoding)?;
  let mut table = BTreeMap::new();
  for entry in text.split(';') {
    let entry = entry.trim();
    if entry.is_empty() {
      continue;
    }
    let (key, value) = entry.split_once(':').ok_or_else(|| {
      ReadError::StructuralCorruption(format!("bad rebus table entry {entry:?}"))
    })?;
    let key: u8 = key.trim().parse().map_err(|_| {
      ReadError::StructuralCorruption(format!("bad rebus table key {key:?}"))
    })?;
    table.insert(key, value.to_string());
  }
  Ok(table)
}

fn apply_gext(puzzle: &mut Puzzle, data: &[u8]) {
  let width = puzzle.width();
  for (i, &flags) in data.iter().enumerate() {
    let pos = (i / width, i % width);
    if let Some(cell) = puzzle.cell_at_mut(pos) {
      cell.circled = flags & GEXT_CIRCLED != 0;
      if flags & GEXT_REVEALED != 0 {
        cell.cheated = true;
      }
    }
  }
}

/// LTIM payload is ASCII `elapsed,running`.
fn apply_ltim(puzzle: &mut Puzzle, data: &[u8]) {
  let text = String::from_utf8_lossy(data);
  if let Some((elapsed, _running)) = text.split_once(',') {
    match elapsed.trim().parse() {
      Ok(seconds) => puzzle.set_elapsed_seconds(seconds),
      Err(_) => warn!("puz: unparseable LTIM payload {text:?}"),
    }
  }
}

/// RUSR is one NUL-terminated string per cell; empty means no rebus
/// response there.
fn apply_rusr(
  puzzle: &mut Puzzle,
  data: &[u8],
  encoding: TextEncoding,
) -> Result<(), ReadError> {
  let width = puzzle.width();
  let mut scanner = Scanner::new(data);
  let mut i = 0usize;
  while !scanner.is_at_end() {
    let bytes = scanner.parse_nul_terminated()?;
    if !bytes.is_empty() {
      let pos = (i / width, i % width);
      if let Some(cell) = puzzle.cell_at_mut(pos) {
        cell.response = decode_text(bytes, encoding)?;
      }
    }
    i += 1;
  }
  Ok(())
}

/// Serializes the puzzle as a .puz file. Bars, colors and marks have no
/// representation in this format and are dropped; a locked puzzle keeps
/// its scrambled tag and checksum.
pub fn write(puzzle: &Puzzle) -> Result<Vec<u8>, ReadError> {
  let encoding = TextEncoding::Latin1;
  let (width, height) = (puzzle.width(), puzzle.height());
  if width > u8::MAX as usize || height > u8::MAX as usize {
    return Err(ReadError::StructuralCorruption(format!(
      "grid {width}x{height} too large for the puz format"
    )));
  }

  let mut solution_bytes = Vec::with_capacity(width * height);
  let mut state_bytes = Vec::with_capacity(width * height);
  for pos in puzzle.positions() {
    match puzzle.cell_at(pos) {
      None => {
        solution_bytes.push(b'.');
        state_bytes.push(b'.');
      }
      Some(cell) => {
        let sol = cell.solution_char().unwrap_or('X');
        solution_bytes.push(*encode_text(&sol.to_string(), encoding).first().unwrap_or(&b'X'));
        match cell.response_char() {
          Some(ch) => state_bytes
            .push(*encode_text(&ch.to_string(), encoding).first().unwrap_or(&b'-')),
          None => state_bytes.push(b'-'),
        }
      }
    }
  }

  let clue_bytes = ordered_clue_bytes(puzzle, encoding);
  let title = encode_text(&puzzle.meta.title, encoding);
  let author = encode_text(&puzzle.meta.author, encoding);
  let copyright = encode_text(&puzzle.meta.copyright, encoding);
  let notes = encode_text(&puzzle.meta.notes, encoding);

  let mut header_tail = Writer::new();
  header_tail.push_byte(width as u8);
  header_tail.push_byte(height as u8);
  header_tail.push_short(clue_bytes.len() as u16);
  header_tail.push_short(0x0001);
  header_tail.push_short(if puzzle.is_locked() { SCRAMBLED_TAG } else { 0 });
  let header_tail = header_tail.into_bytes();

  let cib_checksum = checksum_region(&header_tail, 0);
  let clue_slices: Vec<&[u8]> = clue_bytes.iter().map(Vec::as_slice).collect();
  let overall_checksum = {
    let mut c = checksum_region(&solution_bytes, cib_checksum);
    c = checksum_region(&state_bytes, c);
    c = text_checksum(&title, &author, &copyright, &clue_slices, &notes, c);
    c
  };
  let solution_checksum = checksum_region(&solution_bytes, 0);
  let grid_checksum = checksum_region(&state_bytes, 0);
  let partial_checksum = text_checksum(&title, &author, &copyright, &clue_slices, &notes, 0);
  let masked =
    masked_checksums_for(cib_checksum, solution_checksum, grid_checksum, partial_checksum);

  let mut w = Writer::new();
  w.push_short(overall_checksum);
  w.push_bytes(MAGIC);
  w.push_short(cib_checksum);
  w.push_bytes(&masked);
  w.push_bytes(WRITE_VERSION);
  w.push_short(0); // reserved 1C
  w.push_short(puzzle.scrambled_checksum().unwrap_or(0));
  w.push_bytes(&[0; 12]); // reserved 20..2C
  w.push_bytes(&header_tail);
  w.push_bytes(&solution_bytes);
  w.push_bytes(&state_bytes);
  w.push_nul_terminated(&title);
  w.push_nul_terminated(&author);
  w.push_nul_terminated(&copyright);
  for clue in &clue_bytes {
    w.push_nul_terminated(clue);
  }
  w.push_nul_terminated(&notes);

  write_extras(&mut w, puzzle, encoding);

  Ok(w.into_bytes())
}

/// Clue hints in file order: reading order of numbered squares, across
/// before down at the same number.
fn ordered_clue_bytes(puzzle: &Puzzle, encoding: TextEncoding) -> Vec<Vec<u8>> {
  let mut starts: BTreeMap<Pos, Vec<(bool, String)>> = BTreeMap::new();
  for list_name in [ACROSS, DOWN] {
    if let Some(list) = puzzle.list(list_name) {
      for clue in list.iter() {
        if let Some(first) = clue.zone.first() {
          starts
            .entry(first)
            .or_default()
            .push((list_name == DOWN, clue.hint.clone()));
        }
      }
    }
  }

  let mut clues = Vec::new();
  for entries in starts.values_mut() {
    entries.sort_by_key(|(down, _)| *down);
    for (_, hint) in entries.iter() {
      clues.push(encode_text(hint, encoding));
    }
  }
  clues
}

fn write_extras(w: &mut Writer, puzzle: &Puzzle, encoding: TextEncoding) {
  let cells: Vec<Option<&Cell>> =
    puzzle.positions().map(|pos| puzzle.cell_at(pos)).collect();

  let rebus_solutions: Vec<&str> = {
    let mut seen = Vec::new();
    for cell in cells.iter().flatten() {
      if cell.solution.chars().count() > 1 && !seen.contains(&cell.solution.as_str()) {
        seen.push(cell.solution.as_str());
      }
    }
    seen
  };

  if !rebus_solutions.is_empty() {
    let grbs: Vec<u8> = cells
      .iter()
      .map(|cell| match cell {
        Some(cell) => rebus_solutions
          .iter()
          .position(|s| *s == cell.solution)
          .map(|i| i as u8 + 1)
          .unwrap_or(0),
        None => 0,
      })
      .collect();
    push_extra(w, b"GRBS", &grbs);

    let mut rtbl = String::new();
    for (i, solution) in rebus_solutions.iter().enumerate() {
      rtbl.push_str(&format!("{i:2}:{solution};"));
    }
    push_extra(w, b"RTBL", &encode_text(&rtbl, encoding));
  }

  if cells.iter().flatten().any(|c| c.circled || c.cheated) {
    let gext: Vec<u8> = cells
      .iter()
      .map(|cell| match cell {
        Some(cell) => {
          let mut flags = 0;
          if cell.circled {
            flags |= GEXT_CIRCLED;
          }
          if cell.cheated {
            flags |= GEXT_REVEALED;
          }
          flags
        }
        None => 0,
      })
      .collect();
    push_extra(w, b"GEXT", &gext);
  }

  if puzzle.elapsed_seconds() > 0 {
    let ltim = format!("{},0", puzzle.elapsed_seconds());
    push_extra(w, b"LTIM", ltim.as_bytes());
  }

  if cells.iter().flatten().any(|c| c.response.chars().count() > 1) {
    let mut rusr = Vec::new();
    for cell in &cells {
      match cell {
        Some(cell) if cell.response.chars().count() > 1 => {
          rusr.extend_from_slice(&encode_text(&cell.response, encoding));
          rusr.push(0);
        }
        _ => rusr.push(0),
      }
    }
    push_extra(w, b"RUSR", &rusr);
  }
}

fn push_extra(w: &mut Writer, name: &[u8; 4], data: &[u8]) {
  w.push_bytes(name);
  w.push_short(data.len() as u16);
  w.push_short(checksum_region(data, 0));
  w.push_bytes(data);
  w.push_byte(0);
}

/// Returned when parsing succeeded but one or more checksums in the file
/// didn't match the expected value.
#[derive(Eq, PartialEq)]
pub struct ChecksumMismatch {
  checksum: Checksum,
  expected: u16,
  actual: u16,
}

impl Debug for ChecksumMismatch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "mismatch on checksum {}: expected {:#x} but got {:#x}",
      self.checksum, self.expected, self.actual
    )
  }
}

#[derive(Debug, Eq, PartialEq)]
enum Checksum {
  Cib,
  Overall,
  Masked(usize),
}

impl Display for Checksum {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{self:?}")
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::puzzle::ClueId;

  /// A 15x15 daily-style grid: blocks down the diagonal-ish interior,
  /// solutions filled with a repeating alphabet.
  fn daily_puzzle() -> Puzzle {
    let mut p = Puzzle::new(15, 15);
    let blocks = [(0, 5), (5, 14), (7, 7), (9, 0), (14, 9)];
    for row in 0..15 {
      for col in 0..15 {
        if blocks.contains(&(row, col)) {
          continue;
        }
        let letter = (b'A' + ((row * 15 + col) % 26) as u8) as char;
        p.set_cell((row, col), Cell::new(letter.to_string()));
      }
    }

    // Build the clue lists the same way the format numbers them so the
    // writer and reader agree on clue order.
    let mut hints = Vec::new();
    let mut number = 0u32;
    for pos in p.positions().collect::<Vec<_>>() {
      let a = starts_across(&p, pos);
      let d = starts_down(&p, pos);
      if !a && !d {
        continue;
      }
      number += 1;
      if a {
        hints.push((ACROSS, number, Zone::across_run(pos, across_len(&p, pos))));
      }
      if d {
        hints.push((DOWN, number, Zone::down_run(pos, down_len(&p, pos))));
      }
    }
    for (list, number, zone) in hints {
      p.add_clue(list, Some(number), format!("{number} {list}"), zone);
    }
    p.index_zones().unwrap();

    p.meta.title = "Daily Fixture".into();
    p.meta.author = "A. Setter".into();
    p.meta.copyright = "© 2024".into();
    p.meta.notes = "Fixture notepad".into();
    p
  }

  #[test]
  fn fixture_spot_checks() {
    let bytes = write(&daily_puzzle()).unwrap();
    let (p, mismatches) = parse(&bytes).unwrap();
    assert!(mismatches.is_empty(), "{mismatches:?}");

    assert_eq!(p.meta.title, "Daily Fixture");
    assert_eq!(p.meta.author, "A. Setter");
    assert_eq!((p.width(), p.height()), (15, 15));

    // Clue 1 starts both across and down at the origin.
    let across_1 = p.list(ACROSS).unwrap().by_number(1).unwrap();
    let down_1 = p.list(DOWN).unwrap().by_number(1).unwrap();
    assert_eq!(across_1.zone.first(), Some((0, 0)));
    assert_eq!(down_1.zone.first(), Some((0, 0)));

    // A blocked interior cell.
    assert!(p.cell_at((5, 14)).is_none());

    // Solution spot checks at fixed coordinates.
    assert_eq!(p.cell_at((0, 0)).unwrap().solution, "A");
    assert_eq!(p.cell_at((2, 3)).unwrap().solution, "H");
  }

  #[test]
  fn round_trip_preserves_grid_and_clues() {
    let original = daily_puzzle();
    let bytes = write(&original).unwrap();
    let (read_back, _) = parse(&bytes).unwrap();

    assert_eq!(read_back.width(), original.width());
    for pos in original.positions() {
      let a = original.cell_at(pos).map(|c| &c.solution);
      let b = read_back.cell_at(pos).map(|c| &c.solution);
      assert_eq!(a, b, "solution differs at {pos:?}");
    }
    assert_eq!(
      read_back.list(ACROSS).unwrap().len(),
      original.list(ACROSS).unwrap().len()
    );
    assert_eq!(
      read_back.list(DOWN).unwrap().len(),
      original.list(DOWN).unwrap().len()
    );
  }

  #[test]
  fn rebus_and_flags_round_trip() {
    let mut p = daily_puzzle();
    {
      let cell = p.cell_at_mut((3, 3)).unwrap();
      cell.solution = "REBUS".into();
      cell.response = "ENTRY".into();
      cell.circled = true;
    }
    p.cell_at_mut((0, 0)).unwrap().cheated = true;
    p.set_elapsed_seconds(321);

    let bytes = write(&p).unwrap();
    let (read_back, _) = parse(&bytes).unwrap();

    let cell = read_back.cell_at((3, 3)).unwrap();
    assert_eq!(cell.solution, "REBUS");
    assert_eq!(cell.response, "ENTRY");
    assert!(cell.circled);
    assert!(read_back.cell_at((0, 0)).unwrap().cheated);
    assert_eq!(read_back.elapsed_seconds(), 321);
  }

  #[test]
  fn scrambled_tag_is_carried() {
    let mut p = daily_puzzle();
    crate::io::scramble::scramble(&mut p, 6789).unwrap();
    let bytes = write(&p).unwrap();
    let (read_back, _) = parse(&bytes).unwrap();
    assert!(read_back.is_locked());
    assert_eq!(read_back.scrambled_checksum(), p.scrambled_checksum());

    let mut unlocked = read_back;
    crate::io::scramble::try_unscramble(&mut unlocked, 6789).unwrap();
    assert_eq!(unlocked.cell_at((0, 0)).unwrap().solution, "A");
  }

  #[test]
  fn non_puz_bytes_are_a_format_mismatch() {
    assert!(matches!(read(b"not a puz file"), Err(ReadError::FormatMismatch)));
    assert!(matches!(read(&[0u8; 0x40]), Err(ReadError::FormatMismatch)));
  }

  #[test]
  fn truncated_puz_is_corrupt() {
    let bytes = write(&daily_puzzle()).unwrap();
    let result = read(&bytes[..bytes.len() / 2]);
    assert!(matches!(result, Err(ReadError::Eof(_))));
  }

  #[test]
  fn membership_indexing_happens_on_read() {
    let bytes = write(&daily_puzzle()).unwrap();
    let (p, _) = parse(&bytes).unwrap();
    let ids = p.clues_at((0, 0));
    assert!(ids.contains(&ClueId::across(0)));
    assert!(ids.contains(&ClueId::down(0)));
  }
}
