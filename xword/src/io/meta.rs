//! The native save format: a play-state stream layered over a source file.
//!
//! A saved game is the source puzzle file (whatever format it arrived in)
//! plus two small streams of our own: a solution stream preserving grid
//! facts the source format may not carry, and a meta stream holding play
//! state. Loading re-parses the source and merges the streams back on.
//!
//! The meta stream is versioned. The version tag at the front selects how
//! much of the stream follows: a version-N stream is the version-(N-1)
//! stream with one more section appended, so reading is a pipeline of
//! section readers run in order up to the tag. The writer always emits the
//! current version. Strings are ISO-8859-1 below version 7 and UTF-8 from
//! version 7 on.

use crate::errors::ReadError;
use crate::io::bytes::{Scanner, TextEncoding, Writer};
use crate::puzzle::{ACROSS, Bars, ClueId, DOWN, Note, Pos, Puzzle};
use log::warn;

const META_MAGIC: &[u8] = b"XWMETA\0";
const SOLUTION_MAGIC: &[u8] = b"XWSOLN\0";
const CURRENT_VERSION: u8 = 9;

// Solution-stream cell flag bits.
const FLAG_PRESENT: u8 = 0x01;
const FLAG_BAR_TOP: u8 = 0x02;
const FLAG_BAR_RIGHT: u8 = 0x04;
const FLAG_BAR_BOTTOM: u8 = 0x08;
const FLAG_BAR_LEFT: u8 = 0x10;
const FLAG_CIRCLED: u8 = 0x20;

/// Play state as carried by the meta stream, decoupled from any puzzle.
///
/// Clue references are stored the way the historical stream laid them out:
/// display number plus an across/down bit. Resolution back to [ClueId]s
/// happens in [merge_meta], where failures are logged and dropped rather
/// than failing the load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta {
  pub author: String,
  pub source: String,
  pub title: String,
  pub date: String,
  /// 0-100, or 0xFF for a still-locked puzzle. Derived state, stored so a
  /// puzzle list can be rendered without parsing the source file.
  pub percent_complete: u8,
  pub elapsed_seconds: u64,
  pub updatable: bool,
  pub cursor: Pos,
  pub cursor_across: bool,
  pub source_url: String,
  pub support_url: String,
  /// Visit history, most recent last, as (display number, across) pairs.
  pub history: Vec<(u32, bool)>,
  /// Per-clue notes, parallel to the across and down lists respectively.
  pub across_notes: Vec<Note>,
  pub down_notes: Vec<Note>,
  pub flagged: Vec<(u32, bool)>,
  pub completion_message: String,
  pub notes: String,
  pub pinned: Option<(u32, bool)>,
  /// (row, col, responder) triples for cells filled by a named player.
  pub responders: Vec<(u8, u8, String)>,
}

/// Serializes the puzzle's play state at the current version.
pub fn write_meta(puzzle: &Puzzle) -> Vec<u8> {
  let enc = TextEncoding::Utf8;
  let mut w = Writer::new();
  w.push_bytes(META_MAGIC);
  w.push_byte(CURRENT_VERSION);

  // V1
  w.push_string(&puzzle.meta.author, enc);
  w.push_string(&puzzle.meta.source, enc);
  w.push_string(&puzzle.meta.title, enc);
  w.push_string(&puzzle.meta.date, enc);
  w.push_byte(if puzzle.is_locked() { 0xFF } else { puzzle.percent_complete() });

  // V2
  w.push_int(puzzle.elapsed_seconds().min(u32::MAX as u64) as u32);
  w.push_byte(puzzle.meta.updatable as u8);

  // V3
  let (row, col) = puzzle.cursor();
  w.push_byte(row.min(u8::MAX as usize) as u8);
  w.push_byte(col.min(u8::MAX as usize) as u8);
  w.push_byte((puzzle.current_list() == ACROSS) as u8);

  // V4
  w.push_string(&puzzle.meta.source_url, enc);
  w.push_string(&puzzle.meta.support_url, enc);

  // V5
  let history = number_pairs(puzzle, puzzle.history().iter());
  w.push_short(history.len() as u16);
  for (number, across) in history {
    w.push_short(number as u16);
    w.push_byte(across as u8);
  }

  // V6
  for list_name in [ACROSS, DOWN] {
    let len = puzzle.list(list_name).map(|l| l.len()).unwrap_or(0);
    w.push_short(len as u16);
    for index in 0..len {
      let id = ClueId::new(list_name, index);
      let note = puzzle.note_for(&id).cloned().unwrap_or_default();
      write_note(&mut w, &note, enc);
    }
  }

  // V7
  let flagged = number_pairs(puzzle, puzzle.flagged());
  w.push_short(flagged.len() as u16);
  for (number, across) in flagged {
    w.push_short(number as u16);
    w.push_byte(across as u8);
  }

  // V8
  w.push_string(&puzzle.meta.completion_message, enc);
  w.push_string(&puzzle.meta.notes, enc);

  // V9
  match number_pairs(puzzle, puzzle.pinned().into_iter()).first() {
    Some(&(number, across)) => {
      w.push_byte(1);
      w.push_short(number as u16);
      w.push_byte(across as u8);
    }
    None => w.push_byte(0),
  }
  let responders: Vec<(Pos, &str)> = puzzle
    .positions()
    .filter_map(|pos| {
      let responder = puzzle.cell_at(pos)?.responder.as_deref()?;
      Some((pos, responder))
    })
    .collect();
  w.push_short(responders.len() as u16);
  for ((row, col), responder) in responders {
    w.push_byte(row as u8);
    w.push_byte(col as u8);
    w.push_string(responder, enc);
  }

  w.into_bytes()
}

/// Reduces clue identities to the (display number, across) pairs the stream
/// stores. Unnumbered clues and clues on extra lists have no representation
/// and are dropped.
fn number_pairs<'a>(
  puzzle: &Puzzle,
  ids: impl Iterator<Item = &'a ClueId>,
) -> Vec<(u32, bool)> {
  ids
    .filter_map(|id| {
      if id.list() != ACROSS && id.list() != DOWN {
        return None;
      }
      let number = puzzle.clue_for(id)?.number?;
      Some((number, id.list() == ACROSS))
    })
    .collect()
}

fn write_note(w: &mut Writer, note: &Note, enc: TextEncoding) {
  w.push_string(&note.scratch, enc);
  w.push_string(&note.text, enc);
  w.push_string(&note.anagram_source, enc);
  w.push_string(&note.anagram_solution, enc);
}

fn read_note(s: &mut Scanner, enc: TextEncoding) -> Result<Note, ReadError> {
  Ok(Note {
    scratch: s.parse_string(enc)?,
    text: s.parse_string(enc)?,
    anagram_source: s.parse_string(enc)?,
    anagram_solution: s.parse_string(enc)?,
  })
}

/// Parses a meta stream of any supported version. Sections beyond the
/// stream's version keep their [Meta] defaults.
pub fn read_meta(data: &[u8]) -> Result<Meta, ReadError> {
  let mut s = Scanner::new(data);
  if data.len() < META_MAGIC.len() + 1 || !data.starts_with(META_MAGIC) {
    return Err(ReadError::FormatMismatch);
  }
  s.skip(META_MAGIC.len())?;

  let version = s.pop()?;
  if version == 0 || version > CURRENT_VERSION {
    return Err(ReadError::VersionMismatch(version));
  }
  let enc = if version >= 7 { TextEncoding::Utf8 } else { TextEncoding::Latin1 };

  let mut meta = Meta::default();

  meta.author = s.parse_string(enc)?;
  meta.source = s.parse_string(enc)?;
  meta.title = s.parse_string(enc)?;
  meta.date = s.parse_string(enc)?;
  meta.percent_complete = s.pop()?;

  if version >= 2 {
    meta.elapsed_seconds = s.parse_int()? as u64;
    meta.updatable = s.pop()? != 0;
  }

  if version >= 3 {
    let row = s.pop()? as usize;
    let col = s.pop()? as usize;
    meta.cursor = (row, col);
    meta.cursor_across = s.pop()? != 0;
  }

  if version >= 4 {
    meta.source_url = s.parse_string(enc)?;
    meta.support_url = s.parse_string(enc)?;
  }

  if version >= 5 {
    let count = s.parse_short()?;
    for _ in 0..count {
      let number = s.parse_short()? as u32;
      let across = s.pop()? != 0;
      meta.history.push((number, across));
    }
  }

  if version >= 6 {
    for notes in [&mut meta.across_notes, &mut meta.down_notes] {
      let count = s.parse_short()?;
      for _ in 0..count {
        notes.push(read_note(&mut s, enc)?);
      }
    }
  }

  if version >= 7 {
    let count = s.parse_short()?;
    for _ in 0..count {
      let number = s.parse_short()? as u32;
      let across = s.pop()? != 0;
      meta.flagged.push((number, across));
    }
  }

  if version >= 8 {
    meta.completion_message = s.parse_string(enc)?;
    meta.notes = s.parse_string(enc)?;
  }

  if version >= 9 {
    if s.pop()? != 0 {
      let number = s.parse_short()? as u32;
      let across = s.pop()? != 0;
      meta.pinned = Some((number, across));
    }
    let count = s.parse_short()?;
    for _ in 0..count {
      let row = s.pop()?;
      let col = s.pop()?;
      let responder = s.parse_string(enc)?;
      meta.responders.push((row, col, responder));
    }
  }

  Ok(meta)
}

/// Applies loaded play state onto a freshly parsed puzzle.
///
/// Metadata strings only override when non-empty, so a source format that
/// carries its own title keeps it unless the save knew better. Clue
/// references that no longer resolve (the source was updated under us, or
/// the save is from a variant of the puzzle) are logged and dropped.
pub fn merge_meta(puzzle: &mut Puzzle, meta: &Meta) {
  for (target, value) in [
    (&mut puzzle.meta.author, &meta.author),
    (&mut puzzle.meta.source, &meta.source),
    (&mut puzzle.meta.title, &meta.title),
    (&mut puzzle.meta.date, &meta.date),
    (&mut puzzle.meta.source_url, &meta.source_url),
    (&mut puzzle.meta.support_url, &meta.support_url),
    (&mut puzzle.meta.completion_message, &meta.completion_message),
    (&mut puzzle.meta.notes, &meta.notes),
  ] {
    if !value.is_empty() {
      *target = value.clone();
    }
  }
  puzzle.meta.updatable = meta.updatable;
  puzzle.set_elapsed_seconds(meta.elapsed_seconds);

  puzzle.set_cursor(meta.cursor);
  puzzle.set_current_list(if meta.cursor_across { ACROSS } else { DOWN });

  let history: Vec<ClueId> = meta
    .history
    .iter()
    .filter_map(|&(number, across)| resolve(puzzle, number, across))
    .collect();
  puzzle.set_history(history);

  for (list_name, notes) in
    [(ACROSS, &meta.across_notes), (DOWN, &meta.down_notes)]
  {
    let len = puzzle.list(list_name).map(|l| l.len()).unwrap_or(0);
    if notes.len() != len {
      warn!(
        "meta: {} {list_name} notes for {len} clues, applying the overlap",
        notes.len()
      );
    }
    for (index, note) in notes.iter().take(len).enumerate() {
      puzzle.set_note(ClueId::new(list_name, index), note.clone());
    }
  }

  for &(number, across) in &meta.flagged {
    match resolve(puzzle, number, across) {
      Some(id) => puzzle.set_flagged(id, true),
      None => warn!("meta: dropping flag on unresolvable clue {number}"),
    }
  }

  puzzle.set_pinned(
    meta.pinned.and_then(|(number, across)| resolve(puzzle, number, across)),
  );

  for (row, col, responder) in &meta.responders {
    let pos = (*row as usize, *col as usize);
    match puzzle.cell_at_mut(pos) {
      Some(cell) => cell.responder = Some(responder.clone()),
      None => warn!("meta: responder for absent cell ({row}, {col})"),
    }
  }
}

fn resolve(puzzle: &Puzzle, number: u32, across: bool) -> Option<ClueId> {
  let list = puzzle.list(if across { ACROSS } else { DOWN })?;
  match list.by_number(number) {
    Some(clue) => Some(clue.id()),
    None => {
      warn!(
        "meta: no {} clue numbered {number}",
        if across { ACROSS } else { DOWN }
      );
      None
    }
  }
}

/// Serializes the grid facts the source format may not be able to carry:
/// the (possibly descrambled) solution plus bars and circles per cell.
pub fn write_solution(puzzle: &Puzzle) -> Vec<u8> {
  let enc = TextEncoding::Utf8;
  let mut w = Writer::new();
  w.push_bytes(SOLUTION_MAGIC);
  w.push_byte(puzzle.width().min(u8::MAX as usize) as u8);
  w.push_byte(puzzle.height().min(u8::MAX as usize) as u8);
  for pos in puzzle.positions() {
    match puzzle.cell_at(pos) {
      None => w.push_byte(0),
      Some(cell) => {
        let mut flags = FLAG_PRESENT;
        if cell.bars.top {
          flags |= FLAG_BAR_TOP;
        }
        if cell.bars.right {
          flags |= FLAG_BAR_RIGHT;
        }
        if cell.bars.bottom {
          flags |= FLAG_BAR_BOTTOM;
        }
        if cell.bars.left {
          flags |= FLAG_BAR_LEFT;
        }
        if cell.circled {
          flags |= FLAG_CIRCLED;
        }
        w.push_byte(flags);
        w.push_string(&cell.solution, enc);
      }
    }
  }
  w.into_bytes()
}

/// Merges a solution stream back onto a parsed puzzle. Dimensions must
/// match; per-cell presence disagreements are logged and skipped.
pub fn apply_solution(puzzle: &mut Puzzle, data: &[u8]) -> Result<(), ReadError> {
  let enc = TextEncoding::Utf8;
  let mut s = Scanner::new(data);
  if !data.starts_with(SOLUTION_MAGIC) {
    return Err(ReadError::FormatMismatch);
  }
  s.skip(SOLUTION_MAGIC.len())?;

  let width = s.pop()? as usize;
  let height = s.pop()? as usize;
  if width != puzzle.width() || height != puzzle.height() {
    return Err(ReadError::StructuralCorruption(format!(
      "solution stream is {width}x{height}, puzzle is {}x{}",
      puzzle.width(),
      puzzle.height()
    )));
  }

  for pos in puzzle.positions().collect::<Vec<_>>() {
    let flags = s.pop()?;
    if flags & FLAG_PRESENT == 0 {
      if puzzle.cell_at(pos).is_some() {
        warn!("meta: solution stream has no cell at ({}, {})", pos.0, pos.1);
      }
      continue;
    }
    let solution = s.parse_string(enc)?;
    match puzzle.cell_at_mut(pos) {
      Some(cell) => {
        cell.solution = solution;
        cell.bars = Bars {
          top: flags & FLAG_BAR_TOP != 0,
          right: flags & FLAG_BAR_RIGHT != 0,
          bottom: flags & FLAG_BAR_BOTTOM != 0,
          left: flags & FLAG_BAR_LEFT != 0,
        };
        cell.circled = flags & FLAG_CIRCLED != 0;
      }
      None => warn!("meta: solution for absent cell ({}, {})", pos.0, pos.1),
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::puzzle::{Cell, Zone};

  fn played_puzzle() -> Puzzle {
    let mut p = Puzzle::new(2, 2);
    for pos in [(0, 0), (0, 1), (1, 0), (1, 1)] {
      p.set_cell(pos, Cell::new("A"));
    }
    p.add_clue(ACROSS, None, "Top", Zone::across_run((0, 0), 2));
    p.add_clue(ACROSS, None, "Bottom", Zone::across_run((1, 0), 2));
    p.add_clue(DOWN, None, "Left", Zone::down_run((0, 0), 2));
    p.add_clue(DOWN, None, "Right", Zone::down_run((0, 1), 2));
    p.index_zones().unwrap();
    p.number_clues_by_position();

    p.meta.author = "A. Setter".into();
    p.meta.title = "Meta Fixture".into();
    p.meta.source = "Unit Tests".into();
    p.meta.date = "2024-06-01".into();
    p.meta.source_url = "https://example.com/xw/1".into();
    p.meta.support_url = "https://example.com/support".into();
    p.meta.updatable = true;
    p.meta.completion_message = "Bravo!".into();
    p.meta.notes = "Tricky corner".into();

    p.set_elapsed_seconds(642);
    p.set_cursor((1, 0));
    p.set_current_list(DOWN);
    p.push_history(ClueId::across(0));
    p.push_history(ClueId::down(1));
    p.set_note(
      ClueId::across(1),
      Note { scratch: "??A?".to_string(), ..Note::default() },
    );
    p.set_flagged(ClueId::down(0), true);
    p.set_pinned(Some(ClueId::across(1)));
    p.cell_at_mut((0, 1)).unwrap().responder = Some("pat".into());
    p
  }

  /// The same puzzle as it would come out of a fresh source parse, before
  /// any play state is layered on.
  fn fresh_parse() -> Puzzle {
    let mut p = played_puzzle();
    p.meta = crate::puzzle::Metadata {
      title: "Meta Fixture".into(),
      ..Default::default()
    };
    p.set_elapsed_seconds(0);
    p.set_cursor((0, 0));
    p.set_current_list(ACROSS);
    p.set_history(vec![]);
    p.set_note(ClueId::across(1), Note::default());
    p.set_flagged(ClueId::down(0), false);
    p.set_pinned(None);
    p.cell_at_mut((0, 1)).unwrap().responder = None;
    p
  }

  #[test]
  fn meta_round_trip_restores_play_state() {
    let original = played_puzzle();
    let bytes = write_meta(&original);

    let meta = read_meta(&bytes).unwrap();
    let mut restored = fresh_parse();
    merge_meta(&mut restored, &meta);

    assert_eq!(restored, original);
  }

  #[test]
  fn future_version_is_rejected_whole() {
    let mut bytes = write_meta(&played_puzzle());
    bytes[META_MAGIC.len()] = CURRENT_VERSION + 3;
    assert!(matches!(
      read_meta(&bytes),
      Err(ReadError::VersionMismatch(v)) if v == CURRENT_VERSION + 3
    ));
  }

  #[test]
  fn old_version_reads_its_prefix() {
    // A version-2 stream: V1 strings in ISO-8859-1, then elapsed time and
    // the updatable flag, nothing else.
    let enc = TextEncoding::Latin1;
    let mut w = Writer::new();
    w.push_bytes(META_MAGIC);
    w.push_byte(2);
    w.push_string("Ancien Auteur", enc);
    w.push_string("Journal", enc);
    w.push_string("Grille nº 7", enc);
    w.push_string("1999-12-31", enc);
    w.push_byte(40);
    w.push_int(123);
    w.push_byte(1);

    let meta = read_meta(&w.into_bytes()).unwrap();
    assert_eq!(meta.author, "Ancien Auteur");
    assert_eq!(meta.title, "Grille nº 7");
    assert_eq!(meta.percent_complete, 40);
    assert_eq!(meta.elapsed_seconds, 123);
    assert!(meta.updatable);
    assert!(meta.history.is_empty());
    assert_eq!(meta.pinned, None);
  }

  #[test]
  fn unresolvable_references_are_dropped() {
    let mut meta = read_meta(&write_meta(&played_puzzle())).unwrap();
    meta.history.push((99, true));
    meta.flagged.push((42, false));
    meta.pinned = Some((77, true));

    let mut p = fresh_parse();
    merge_meta(&mut p, &meta);
    assert_eq!(p.history().len(), 2);
    assert!(!p.is_flagged(&ClueId::down(1)));
    assert_eq!(p.pinned(), None);
  }

  #[test]
  fn note_count_skew_applies_overlap() {
    let mut meta = read_meta(&write_meta(&played_puzzle())).unwrap();
    meta.across_notes.push(Note { text: "extra".into(), ..Note::default() });

    let mut p = fresh_parse();
    merge_meta(&mut p, &meta);
    assert!(p.note_for(&ClueId::across(1)).is_some());
    assert!(p.note_for(&ClueId::new(ACROSS, 2)).is_none());
  }

  #[test]
  fn solution_stream_round_trips_bars_and_circles() {
    let mut original = played_puzzle();
    original.cell_at_mut((0, 0)).unwrap().circled = true;
    original.cell_at_mut((1, 1)).unwrap().bars =
      Bars { top: true, left: true, ..Bars::default() };
    original.cell_at_mut((1, 0)).unwrap().solution = "REBUS".into();

    let bytes = write_solution(&original);
    let mut restored = played_puzzle();
    apply_solution(&mut restored, &bytes).unwrap();

    assert!(restored.cell_at((0, 0)).unwrap().circled);
    assert_eq!(
      restored.cell_at((1, 1)).unwrap().bars,
      Bars { top: true, left: true, ..Bars::default() }
    );
    assert_eq!(restored.cell_at((1, 0)).unwrap().solution, "REBUS");
  }

  #[test]
  fn solution_stream_dimension_mismatch_is_structural() {
    let bytes = write_solution(&played_puzzle());
    let mut other = Puzzle::new(3, 3);
    assert!(matches!(
      apply_solution(&mut other, &bytes),
      Err(ReadError::StructuralCorruption(_))
    ));
  }

  #[test]
  fn wrong_magic_is_a_format_mismatch() {
    assert!(matches!(read_meta(b"not meta"), Err(ReadError::FormatMismatch)));
    let mut p = played_puzzle();
    assert!(matches!(
      apply_solution(&mut p, b"not a solution stream"),
      Err(ReadError::FormatMismatch)
    ));
  }
}
