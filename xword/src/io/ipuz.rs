//! The open JSON interchange format.
//!
//! This is the one format that can carry everything the model holds, so it
//! is also the archival format: `read(write(p))` reproduces `p` under deep
//! equality. The reader works on a [serde_json::Value] tree rather than
//! typed structs because real files in the wild carry unknown keys and
//! several shapes for the same field, all of which must be tolerated.
//!
//! Standard keys cover the grid, solution, saved fill, styles and clue
//! lists; play state that has no standard key rides in a single
//! vendor-prefixed extension object.

use crate::errors::ReadError;
use crate::html;
use crate::puzzle::{ACROSS, Bars, Cell, ClueId, DOWN, Note, Pos, Puzzle, Zone};
use log::warn;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

const VERSION_HOST: &str = "ipuz.org";
const KIND_CROSSWORD: &str = "crossword";
const BLOCK: &str = "#";
/// All nonstandard state lives under this one key.
const EXT: &str = "org.xword:state";

const MARK_KEYS: [[&str; 3]; 3] =
  [["TL", "T", "TR"], ["L", "C", "R"], ["BL", "B", "BR"]];

pub fn read(data: &[u8]) -> Result<Puzzle, ReadError> {
  // Bytes that aren't JSON at all belong to some other format.
  let root: Value =
    serde_json::from_slice(data).map_err(|_| ReadError::FormatMismatch)?;
  if !is_crossword(&root) {
    return Err(ReadError::FormatMismatch);
  }

  let width = dimension(&root, "width")?;
  let height = dimension(&root, "height")?;
  let mut puzzle = Puzzle::new(width, height);

  // Label grid: presence, display numbers, and per-cell styles.
  let mut numbered: BTreeMap<u32, Pos> = BTreeMap::new();
  let labels = grid_rows(&root, "puzzle", height)?;
  for (row, row_value) in labels.iter().enumerate() {
    let entries = row_cells(row_value, width, row)?;
    for (col, entry) in entries.iter().enumerate() {
      let pos = (row, col);
      let (label, style) = split_entry(entry);
      if is_block(label) {
        continue;
      }
      let mut cell = Cell::default();
      if let Some(style) = style {
        apply_style(&mut cell, style);
      }
      puzzle.set_cell(pos, cell);
      if let Some(number) = label.as_u64() {
        numbered.insert(number as u32, pos);
      }
    }
  }

  if let Some(rows) = optional_grid(&root, "solution", height)? {
    for (row, row_value) in rows.iter().enumerate() {
      for (col, entry) in row_cells(row_value, width, row)?.iter().enumerate() {
        if let (Some(text), Some(cell)) =
          (entry.as_str(), puzzle.cell_at_mut((row, col)))
          && text != BLOCK
        {
          cell.solution = text.to_string();
        }
      }
    }
  }

  if let Some(rows) = optional_grid(&root, "saved", height)? {
    for (row, row_value) in rows.iter().enumerate() {
      for (col, entry) in row_cells(row_value, width, row)?.iter().enumerate() {
        if let (Some(text), Some(cell)) =
          (entry.as_str(), puzzle.cell_at_mut((row, col)))
          && text != BLOCK
        {
          cell.response = text.to_string();
        }
      }
    }
  }

  if let Some(lists) = root.get("clues").and_then(Value::as_object) {
    for (list_name, clues) in lists {
      let clues = clues.as_array().ok_or_else(|| {
        ReadError::StructuralCorruption(format!("clue list {list_name:?} is not an array"))
      })?;
      for clue in clues {
        let (number, hint, cells) = parse_clue(clue)?;
        let zone = match cells {
          Some(zone) => zone,
          None => infer_zone(&puzzle, &numbered, list_name, number),
        };
        puzzle.add_clue(list_name, number, hint, zone);
      }
    }
  }
  puzzle.index_zones()?;

  read_metadata(&mut puzzle, &root);
  if let Some(ext) = root.get(EXT) {
    read_extension(&mut puzzle, ext);
  }
  Ok(puzzle)
}

fn is_crossword(root: &Value) -> bool {
  let versioned = root
    .get("version")
    .and_then(Value::as_str)
    .is_some_and(|v| v.contains(VERSION_HOST));
  let kind = root.get("kind").and_then(Value::as_array).is_some_and(|kinds| {
    kinds
      .iter()
      .filter_map(Value::as_str)
      .any(|k| k.contains(KIND_CROSSWORD))
  });
  versioned && kind
}

fn dimension(root: &Value, key: &str) -> Result<usize, ReadError> {
  root
    .get("dimensions")
    .and_then(|d| d.get(key))
    .and_then(Value::as_u64)
    .filter(|&v| v > 0)
    .map(|v| v as usize)
    .ok_or_else(|| ReadError::StructuralCorruption(format!("missing dimension {key:?}")))
}

fn grid_rows<'a>(
  root: &'a Value,
  key: &str,
  height: usize,
) -> Result<&'a [Value], ReadError> {
  optional_grid(root, key, height)?
    .ok_or_else(|| ReadError::StructuralCorruption(format!("missing {key:?} grid")))
}

fn optional_grid<'a>(
  root: &'a Value,
  key: &str,
  height: usize,
) -> Result<Option<&'a [Value]>, ReadError> {
  let Some(value) = root.get(key) else {
    return Ok(None);
  };
  let rows = value.as_array().ok_or_else(|| {
    ReadError::StructuralCorruption(format!("{key:?} is not an array"))
  })?;
  if rows.len() != height {
    return Err(ReadError::StructuralCorruption(format!(
      "{key:?} has {} rows for a height of {height}",
      rows.len()
    )));
  }
  Ok(Some(rows))
}

fn row_cells<'a>(
  row_value: &'a Value,
  width: usize,
  row: usize,
) -> Result<&'a [Value], ReadError> {
  let cells = row_value.as_array().ok_or_else(|| {
    ReadError::StructuralCorruption(format!("grid row {row} is not an array"))
  })?;
  if cells.len() != width {
    return Err(ReadError::StructuralCorruption(format!(
      "grid row {row} has {} cells for a width of {width}",
      cells.len()
    )));
  }
  Ok(cells)
}

/// A label-grid entry is either the label itself or `{"cell": label,
/// "style": {...}}`.
fn split_entry(entry: &Value) -> (&Value, Option<&Value>) {
  match entry.get("cell") {
    Some(label) => (label, entry.get("style")),
    None => (entry, None),
  }
}

fn is_block(label: &Value) -> bool {
  label.is_null() || label.as_str() == Some(BLOCK)
}

fn apply_style(cell: &mut Cell, style: &Value) {
  if style.get("shapebg").and_then(Value::as_str) == Some("circle") {
    cell.circled = true;
  }
  if let Some(barred) = style.get("barred").and_then(Value::as_str) {
    cell.bars = Bars {
      top: barred.contains('T'),
      right: barred.contains('R'),
      bottom: barred.contains('B'),
      left: barred.contains('L'),
    };
  }
  if let Some(color) = style.get("color").and_then(Value::as_str) {
    cell.color = Some(color.to_string());
  }
  if let Some(marks) = style.get("mark").and_then(Value::as_object) {
    for (r, keys) in MARK_KEYS.iter().enumerate() {
      for (c, key) in keys.iter().enumerate() {
        if let Some(text) = marks.get(*key).and_then(Value::as_str) {
          cell.marks[r][c] = Some(text.to_string());
        }
      }
    }
  }
}

/// Accepts the three clue shapes seen in the wild: a bare hint string, a
/// `[number, hint]` pair, or an object with optional number and cells.
fn parse_clue(clue: &Value) -> Result<(Option<u32>, String, Option<Zone>), ReadError> {
  if let Some(hint) = clue.as_str() {
    return Ok((None, html::decode(hint), None));
  }
  if let Some(pair) = clue.as_array() {
    match pair.as_slice() {
      [number, hint] => {
        let hint = hint.as_str().ok_or_else(|| {
          ReadError::StructuralCorruption(format!("clue pair hint is not a string: {hint}"))
        })?;
        return Ok((number.as_u64().map(|n| n as u32), html::decode(hint), None));
      }
      _ => {
        return Err(ReadError::StructuralCorruption(format!(
          "clue array is not a [number, hint] pair: {clue}"
        )));
      }
    }
  }

  let number = clue.get("number").and_then(Value::as_u64).map(|n| n as u32);
  let hint = clue
    .get("clue")
    .and_then(Value::as_str)
    .map(html::decode)
    .unwrap_or_default();
  let cells = match clue.get("cells").and_then(Value::as_array) {
    None => None,
    Some(cells) => {
      let positions = cells
        .iter()
        .map(parse_pos)
        .collect::<Result<Vec<_>, _>>()?;
      Some(Zone::new(positions))
    }
  };
  Ok((number, hint, cells))
}

/// Positions on the wire are 1-based `[column, row]`.
fn parse_pos(value: &Value) -> Result<Pos, ReadError> {
  let pair = value.as_array().filter(|p| p.len() == 2).ok_or_else(|| {
    ReadError::StructuralCorruption(format!("bad position {value}"))
  })?;
  match (pair[0].as_u64(), pair[1].as_u64()) {
    (Some(col), Some(row)) if col > 0 && row > 0 => {
      Ok((row as usize - 1, col as usize - 1))
    }
    _ => Err(ReadError::StructuralCorruption(format!("bad position {value}"))),
  }
}

fn pos_json((row, col): Pos) -> Value {
  json!([col + 1, row + 1])
}

/// For files that rely on grid numbering instead of explicit cells: walk
/// from the numbered square along the list's axis until a block or a bar.
/// Lists other than Across/Down have no axis, so their clues stay zoneless.
fn infer_zone(
  puzzle: &Puzzle,
  numbered: &BTreeMap<u32, Pos>,
  list_name: &str,
  number: Option<u32>,
) -> Zone {
  let across = match list_name {
    ACROSS => true,
    DOWN => false,
    _ => return Zone::default(),
  };
  let Some(start) = number.and_then(|n| numbered.get(&n).copied()) else {
    warn!("interchange: cannot place {list_name} clue {number:?} on the grid");
    return Zone::default();
  };

  let mut positions = vec![start];
  let mut pos = start;
  loop {
    let next = if across { (pos.0, pos.1 + 1) } else { (pos.0 + 1, pos.1) };
    let Some(next_cell) = puzzle.cell_at(next) else {
      break;
    };
    let here = puzzle.cell_at(pos).map(|c| c.bars).unwrap_or_default();
    let barred = if across {
      here.right || next_cell.bars.left
    } else {
      here.bottom || next_cell.bars.top
    };
    if barred {
      break;
    }
    positions.push(next);
    pos = next;
  }
  Zone::new(positions)
}

fn read_metadata(puzzle: &mut Puzzle, root: &Value) {
  let text = |key: &str| {
    root.get(key).and_then(Value::as_str).map(str::to_string).unwrap_or_default()
  };
  puzzle.meta.title = text("title");
  puzzle.meta.author = text("author");
  puzzle.meta.copyright = text("copyright");
  puzzle.meta.source = text("publisher");
  puzzle.meta.date = text("date");
  puzzle.meta.source_url = text("url");
  puzzle.meta.notes = html::decode(&text("notes"));
  puzzle.meta.completion_message = html::decode(&text("explanation"));
}

fn read_extension(puzzle: &mut Puzzle, ext: &Value) {
  if let Some(cursor) = ext.get("cursor").and_then(|v| parse_pos(v).ok()) {
    puzzle.set_cursor(cursor);
  }
  if let Some(list) = ext.get("list").and_then(Value::as_str) {
    puzzle.set_current_list(list);
  }
  if let Some(elapsed) = ext.get("elapsed").and_then(Value::as_u64) {
    puzzle.set_elapsed_seconds(elapsed);
  }
  puzzle.meta.support_url = ext
    .get("support_url")
    .and_then(Value::as_str)
    .unwrap_or_default()
    .to_string();
  puzzle.meta.updatable =
    ext.get("updatable").and_then(Value::as_bool).unwrap_or(false);
  if let Some(checksum) = ext.get("locked").and_then(Value::as_u64) {
    puzzle.set_scrambled_checksum(Some(checksum as u16));
  }

  let history = clue_id_array(ext.get("history"));
  puzzle.set_history(history);
  for id in clue_id_array(ext.get("flagged")) {
    puzzle.set_flagged(id, true);
  }
  puzzle.set_pinned(ext.get("pinned").and_then(parse_clue_id));

  if let Some(notes) = ext.get("clue_notes").and_then(Value::as_array) {
    for entry in notes {
      let Some(id) = parse_clue_id(entry) else {
        continue;
      };
      let field = |key: &str| {
        entry.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
      };
      puzzle.set_note(
        id,
        Note {
          scratch: field("scratch"),
          text: field("text"),
          anagram_source: field("anagram_source"),
          anagram_solution: field("anagram_solution"),
        },
      );
    }
  }

  if let Some(responders) = ext.get("responders").and_then(Value::as_array) {
    for entry in responders {
      if let (Some(pos), Some(name)) = (
        entry.get("at").and_then(|v| parse_pos(v).ok()),
        entry.get("by").and_then(Value::as_str),
      ) && let Some(cell) = puzzle.cell_at_mut(pos)
      {
        cell.responder = Some(name.to_string());
      }
    }
  }

  if let Some(cheated) = ext.get("cheated").and_then(Value::as_array) {
    for entry in cheated {
      if let Ok(pos) = parse_pos(entry)
        && let Some(cell) = puzzle.cell_at_mut(pos)
      {
        cell.cheated = true;
      }
    }
  }
}

fn clue_id_array(value: Option<&Value>) -> Vec<ClueId> {
  value
    .and_then(Value::as_array)
    .map(|entries| entries.iter().filter_map(parse_clue_id).collect())
    .unwrap_or_default()
}

/// A clue reference is `{"list": name, "index": i}` (possibly with other
/// keys alongside).
fn parse_clue_id(value: &Value) -> Option<ClueId> {
  let list = value.get("list")?.as_str()?;
  let index = value.get("index")?.as_u64()?;
  Some(ClueId::new(list, index as usize))
}

fn clue_id_json(id: &ClueId) -> Value {
  json!({"list": id.list(), "index": id.index()})
}

pub fn write(puzzle: &Puzzle) -> Vec<u8> {
  // Display numbers for the label grid: any numbered clue starting at a
  // position labels that position.
  let mut numbers: BTreeMap<Pos, u32> = BTreeMap::new();
  for list in puzzle.lists() {
    for clue in list.iter() {
      if let (Some(first), Some(number)) = (clue.zone.first(), clue.number) {
        numbers.insert(first, number);
      }
    }
  }

  let mut label_rows = Vec::new();
  let mut solution_rows = Vec::new();
  let mut saved_rows = Vec::new();
  for row in 0..puzzle.height() {
    let mut labels = Vec::new();
    let mut solutions = Vec::new();
    let mut saved = Vec::new();
    for col in 0..puzzle.width() {
      match puzzle.cell_at((row, col)) {
        None => {
          labels.push(json!(BLOCK));
          solutions.push(json!(BLOCK));
          saved.push(json!(BLOCK));
        }
        Some(cell) => {
          let label = json!(numbers.get(&(row, col)).copied().unwrap_or(0));
          labels.push(match style_json(cell) {
            Some(style) => json!({"cell": label, "style": style}),
            None => label,
          });
          solutions.push(json!(cell.solution));
          saved.push(json!(cell.response));
        }
      }
    }
    label_rows.push(Value::Array(labels));
    solution_rows.push(Value::Array(solutions));
    saved_rows.push(Value::Array(saved));
  }

  let mut clues = Map::new();
  for list in puzzle.lists() {
    let entries: Vec<Value> = list
      .iter()
      .map(|clue| {
        let mut entry = Map::new();
        if let Some(number) = clue.number {
          entry.insert("number".into(), json!(number));
        }
        entry.insert("clue".into(), json!(html::encode(&clue.hint)));
        entry.insert(
          "cells".into(),
          Value::Array(clue.zone.positions().iter().copied().map(pos_json).collect()),
        );
        Value::Object(entry)
      })
      .collect();
    clues.insert(list.name().to_string(), Value::Array(entries));
  }

  let mut root = json!({
    "version": format!("http://{VERSION_HOST}/v2"),
    "kind": [format!("http://{VERSION_HOST}/{KIND_CROSSWORD}#1")],
    "dimensions": {"width": puzzle.width(), "height": puzzle.height()},
    "puzzle": label_rows,
    "solution": solution_rows,
    "saved": saved_rows,
    "clues": clues,
    "title": puzzle.meta.title,
    "author": puzzle.meta.author,
    "copyright": puzzle.meta.copyright,
    "publisher": puzzle.meta.source,
    "date": puzzle.meta.date,
    "url": puzzle.meta.source_url,
    "notes": html::encode(&puzzle.meta.notes),
    "explanation": html::encode(&puzzle.meta.completion_message),
  });
  root[EXT] = extension_json(puzzle);

  // A Value tree serializes without error.
  serde_json::to_vec_pretty(&root).unwrap_or_default()
}

fn style_json(cell: &Cell) -> Option<Value> {
  let mut style = Map::new();
  if cell.circled {
    style.insert("shapebg".into(), json!("circle"));
  }
  if cell.bars.any() {
    let mut barred = String::new();
    for (flag, ch) in [
      (cell.bars.top, 'T'),
      (cell.bars.right, 'R'),
      (cell.bars.bottom, 'B'),
      (cell.bars.left, 'L'),
    ] {
      if flag {
        barred.push(ch);
      }
    }
    style.insert("barred".into(), json!(barred));
  }
  if let Some(color) = &cell.color {
    style.insert("color".into(), json!(color));
  }
  if cell.has_marks() {
    let mut marks = Map::new();
    for (r, keys) in MARK_KEYS.iter().enumerate() {
      for (c, key) in keys.iter().enumerate() {
        if let Some(text) = &cell.marks[r][c] {
          marks.insert((*key).into(), json!(text));
        }
      }
    }
    style.insert("mark".into(), Value::Object(marks));
  }
  (!style.is_empty()).then(|| Value::Object(style))
}

fn extension_json(puzzle: &Puzzle) -> Value {
  let clue_notes: Vec<Value> = puzzle
    .notes()
    .map(|(id, note)| {
      json!({
        "list": id.list(),
        "index": id.index(),
        "scratch": note.scratch,
        "text": note.text,
        "anagram_source": note.anagram_source,
        "anagram_solution": note.anagram_solution,
      })
    })
    .collect();

  let responders: Vec<Value> = puzzle
    .positions()
    .filter_map(|pos| {
      let responder = puzzle.cell_at(pos)?.responder.as_deref()?;
      Some(json!({"at": pos_json(pos), "by": responder}))
    })
    .collect();

  let cheated: Vec<Value> = puzzle
    .positions()
    .filter(|&pos| puzzle.cell_at(pos).is_some_and(|c| c.cheated))
    .map(pos_json)
    .collect();

  json!({
    "cursor": pos_json(puzzle.cursor()),
    "list": puzzle.current_list(),
    "elapsed": puzzle.elapsed_seconds(),
    "support_url": puzzle.meta.support_url,
    "updatable": puzzle.meta.updatable,
    "locked": puzzle.scrambled_checksum(),
    "history": puzzle.history().iter().map(clue_id_json).collect::<Vec<_>>(),
    "flagged": puzzle.flagged().map(clue_id_json).collect::<Vec<_>>(),
    "pinned": puzzle.pinned().map(clue_id_json),
    "clue_notes": clue_notes,
    "responders": responders,
    "cheated": cheated,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  /// A small puzzle exercising every field the format can carry: an extra
  /// zoneless list, a diagonal zone, rebus, styles, notes, play state.
  fn kitchen_sink() -> Puzzle {
    let mut p = Puzzle::new(3, 3);
    for row in 0..3 {
      for col in 0..3 {
        if (row, col) == (1, 1) {
          continue;
        }
        p.set_cell((row, col), Cell::new("A"));
      }
    }
    p.add_clue(ACROSS, Some(1), "Top <i>row</i> & more", Zone::across_run((0, 0), 3));
    p.add_clue(ACROSS, Some(4), "Bottom row", Zone::across_run((2, 0), 3));
    p.add_clue(DOWN, Some(1), "Left\ncolumn", Zone::down_run((0, 0), 3));
    p.add_clue(DOWN, Some(3), "Right column", Zone::down_run((0, 2), 3));
    p.add_clue("Diagonal", None, "Corner to corner", Zone::new(vec![(0, 0), (1, 0), (2, 1)]));
    p.add_clue("Trivia", None, "No grid presence", Zone::default());
    p.index_zones().unwrap();

    p.cell_at_mut((0, 0)).unwrap().solution = "REBUS".into();
    p.cell_at_mut((0, 0)).unwrap().response = "REB".into();
    p.cell_at_mut((0, 1)).unwrap().circled = true;
    p.cell_at_mut((0, 2)).unwrap().color = Some("#ffcc00".into());
    p.cell_at_mut((2, 0)).unwrap().bars =
      Bars { top: true, ..Bars::default() };
    p.cell_at_mut((2, 2)).unwrap().marks[0][2] = Some("7".into());
    p.cell_at_mut((1, 0)).unwrap().cheated = true;
    p.cell_at_mut((1, 2)).unwrap().responder = Some("sam".into());

    p.meta.title = "Sink".into();
    p.meta.author = "A. Setter".into();
    p.meta.copyright = "© 2024".into();
    p.meta.source = "Unit Tests".into();
    p.meta.date = "2024-06-01".into();
    p.meta.source_url = "https://example.com/xw".into();
    p.meta.support_url = "https://example.com/help".into();
    p.meta.updatable = true;
    p.meta.completion_message = "Done & dusted".into();
    p.meta.notes = "Line one\nline two".into();

    p.set_cursor((2, 0));
    p.set_current_list("Diagonal");
    p.set_elapsed_seconds(99);
    p.push_history(ClueId::across(0));
    p.push_history(ClueId::new("Diagonal", 0));
    p.set_flagged(ClueId::down(1), true);
    p.set_pinned(Some(ClueId::new("Trivia", 0)));
    p.set_note(
      ClueId::down(0),
      Note {
        scratch: "A??".into(),
        text: "anagram?".into(),
        anagram_source: "TAC".into(),
        anagram_solution: "CAT".into(),
      },
    );
    p
  }

  #[test]
  fn full_round_trip() {
    let original = kitchen_sink();
    let restored = read(&write(&original)).unwrap();
    assert_eq!(restored, original);
  }

  #[test]
  fn locked_puzzle_round_trips() {
    let mut original = kitchen_sink();
    original.set_scrambled_checksum(Some(0xBEEF));
    let restored = read(&write(&original)).unwrap();
    assert_eq!(restored.scrambled_checksum(), Some(0xBEEF));
    assert_eq!(restored, original);
  }

  #[test]
  fn zones_are_inferred_from_grid_numbers() {
    let root = json!({
      "version": "http://ipuz.org/v2",
      "kind": ["http://ipuz.org/crossword#1"],
      "dimensions": {"width": 3, "height": 2},
      "puzzle": [[1, 2, 3], [4, 0, 0]],
      "solution": [["C", "A", "T"], ["O", "R", "E"]],
      "clues": {
        "Across": [[1, "Feline"], [4, "Mineral source"]],
        "Down": [[1, "Company abbr."], [2, "Pirate's cry"], [3, "Golf peg"]]
      }
    });
    let p = read(serde_json::to_vec(&root).unwrap().as_slice()).unwrap();

    let across_1 = p.list(ACROSS).unwrap().by_number(1).unwrap();
    assert_eq!(across_1.zone.positions(), [(0, 0), (0, 1), (0, 2)]);
    let down_2 = p.list(DOWN).unwrap().by_number(2).unwrap();
    assert_eq!(down_2.zone.positions(), [(0, 1), (1, 1)]);
    assert_eq!(p.cell_at((1, 2)).unwrap().solution, "E");
  }

  #[test]
  fn html_in_clues_is_decoded() {
    let root = json!({
      "version": "http://ipuz.org/v2",
      "kind": ["http://ipuz.org/crossword#1"],
      "dimensions": {"width": 2, "height": 1},
      "puzzle": [[1, 0]],
      "clues": {
        "Across": [{"number": 1, "clue": "Tom <i>&amp;</i> Jerry,<br>e.g."}]
      }
    });
    let p = read(serde_json::to_vec(&root).unwrap().as_slice()).unwrap();
    assert_eq!(
      p.clue_for(&ClueId::across(0)).unwrap().hint,
      "Tom & Jerry,\ne.g."
    );
  }

  #[test]
  fn non_matching_json_is_a_format_mismatch() {
    assert!(matches!(read(b"[1, 2, 3]"), Err(ReadError::FormatMismatch)));
    assert!(matches!(
      read(br#"{"version": "other", "kind": []}"#),
      Err(ReadError::FormatMismatch)
    ));
    assert!(matches!(read(b"not json"), Err(ReadError::FormatMismatch)));
  }

  #[test]
  fn bad_grid_shape_is_structural() {
    let root = json!({
      "version": "http://ipuz.org/v2",
      "kind": ["http://ipuz.org/crossword#1"],
      "dimensions": {"width": 3, "height": 2},
      "puzzle": [[1, 2, 3]]
    });
    let result = read(serde_json::to_vec(&root).unwrap().as_slice());
    assert!(matches!(result, Err(ReadError::StructuralCorruption(_))));
  }
}
