//! Readers for two provider-specific JSON dialects, plus the payload
//! de-obfuscation helper their delivery channels need.
//!
//! Neither dialect is self-describing the way the interchange format is;
//! both are recognized by their characteristic top-level keys. Writing is
//! not supported, saves go through the interchange format.

use crate::errors::ReadError;
use crate::html;
use crate::puzzle::{ACROSS, Cell, DOWN, Pos, Puzzle, Zone};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use log::warn;
use serde_json::Value;

/// Some providers ship the JSON payload base64-encoded and reversed
/// end-to-end. This undoes that; the result is fed to a reader as usual.
pub fn decode_reversed_base64(text: &str) -> Result<Vec<u8>, ReadError> {
  let reversed: String = text.trim().chars().rev().collect();
  STANDARD
    .decode(reversed)
    .map_err(|e| ReadError::Encoding(format!("bad base64 payload: {e}")))
}

/// The cell-list dialect: a flat `boxes` array of cells with 1-based x/y
/// coordinates, and `placedWords` referencing boxes by index.
pub fn read_cell_list(data: &[u8]) -> Result<Puzzle, ReadError> {
  let root: Value =
    serde_json::from_slice(data).map_err(|_| ReadError::FormatMismatch)?;
  let (Some(boxes), Some(words)) = (
    root.get("boxes").and_then(Value::as_array),
    root.get("placedWords").and_then(Value::as_array),
  ) else {
    return Err(ReadError::FormatMismatch);
  };

  let mut cells: Vec<(Pos, Cell)> = Vec::with_capacity(boxes.len());
  for (i, entry) in boxes.iter().enumerate() {
    let (Some(x), Some(y)) = (
      entry.get("x").and_then(Value::as_u64).filter(|&v| v > 0),
      entry.get("y").and_then(Value::as_u64).filter(|&v| v > 0),
    ) else {
      return Err(ReadError::StructuralCorruption(format!(
        "box {i} has no usable coordinates"
      )));
    };
    let mut cell =
      Cell::new(entry.get("letter").and_then(Value::as_str).unwrap_or_default());
    cell.circled = entry.get("circled").and_then(Value::as_bool).unwrap_or(false);
    cells.push(((y as usize - 1, x as usize - 1), cell));
  }

  let width = root
    .get("width")
    .and_then(Value::as_u64)
    .map(|v| v as usize)
    .unwrap_or_else(|| cells.iter().map(|((_, c), _)| c + 1).max().unwrap_or(0));
  let height = root
    .get("height")
    .and_then(Value::as_u64)
    .map(|v| v as usize)
    .unwrap_or_else(|| cells.iter().map(|((r, _), _)| r + 1).max().unwrap_or(0));
  if width == 0 || height == 0 {
    return Err(ReadError::StructuralCorruption("empty box list".to_string()));
  }

  let mut puzzle = Puzzle::new(width, height);
  let positions: Vec<Pos> = cells.iter().map(|&(pos, _)| pos).collect();
  for (pos, cell) in cells {
    puzzle.set_cell(pos, cell);
  }

  for (i, word) in words.iter().enumerate() {
    let across = word.get("across").and_then(Value::as_bool).unwrap_or(true);
    let number = word.get("clueNumber").and_then(Value::as_u64).map(|n| n as u32);
    let hint = word
      .get("clue")
      .and_then(Value::as_str)
      .map(html::decode)
      .unwrap_or_default();
    let indices = word.get("boxes").and_then(Value::as_array).ok_or_else(|| {
      ReadError::StructuralCorruption(format!("placed word {i} has no boxes"))
    })?;
    let zone: Vec<Pos> = indices
      .iter()
      .map(|index| {
        index
          .as_u64()
          .and_then(|index| positions.get(index as usize).copied())
          .ok_or_else(|| {
            ReadError::StructuralCorruption(format!(
              "placed word {i} references box {index} out of range"
            ))
          })
      })
      .collect::<Result<_, _>>()?;
    puzzle.add_clue(if across { ACROSS } else { DOWN }, number, hint, Zone::new(zone));
  }
  puzzle.index_zones()?;

  read_meta_strings(&mut puzzle, &root);
  Ok(puzzle)
}

/// The entry-list dialect: no grid at all, just word entries carrying
/// direction, start position, length and solution. The grid is the union
/// of the entries.
pub fn read_entry_list(data: &[u8]) -> Result<Puzzle, ReadError> {
  let root: Value =
    serde_json::from_slice(data).map_err(|_| ReadError::FormatMismatch)?;
  let (Some(entries), Some(dimensions)) =
    (root.get("entries").and_then(Value::as_array), root.get("dimensions"))
  else {
    return Err(ReadError::FormatMismatch);
  };

  let dim = |key: &str| {
    dimensions
      .get(key)
      .and_then(Value::as_u64)
      .filter(|&v| v > 0)
      .map(|v| v as usize)
      .ok_or_else(|| {
        ReadError::StructuralCorruption(format!("missing dimension {key:?}"))
      })
  };
  let mut puzzle = Puzzle::new(dim("cols")?, dim("rows")?);

  for (i, entry) in entries.iter().enumerate() {
    let across = match entry.get("direction").and_then(Value::as_str) {
      Some("across") => true,
      Some("down") => false,
      other => {
        return Err(ReadError::StructuralCorruption(format!(
          "entry {i} has direction {other:?}"
        )));
      }
    };
    let length = entry.get("length").and_then(Value::as_u64).unwrap_or(0) as usize;
    let start = entry.get("position").and_then(|p| {
      let x = p.get("x")?.as_u64().filter(|&v| v > 0)?;
      let y = p.get("y")?.as_u64().filter(|&v| v > 0)?;
      Some((y as usize - 1, x as usize - 1))
    });
    let (Some(start), 1..) = (start, length) else {
      return Err(ReadError::StructuralCorruption(format!(
        "entry {i} has no usable position or length"
      )));
    };

    let zone = if across {
      Zone::across_run(start, length)
    } else {
      Zone::down_run(start, length)
    };
    let solution: Vec<char> = entry
      .get("solution")
      .and_then(Value::as_str)
      .unwrap_or_default()
      .chars()
      .collect();
    if !solution.is_empty() && solution.len() != length {
      warn!("entries: entry {i} solution length {} for {length} cells", solution.len());
    }

    for (offset, &pos) in zone.positions().iter().enumerate() {
      if puzzle.cell_at(pos).is_none() {
        puzzle.set_cell(pos, Cell::default());
      }
      if let (Some(&ch), Some(cell)) =
        (solution.get(offset), puzzle.cell_at_mut(pos))
      {
        let letter = ch.to_string();
        if !cell.solution.is_empty() && cell.solution != letter {
          warn!(
            "entries: conflicting solutions at ({}, {}): {:?} vs {letter:?}",
            pos.0, pos.1, cell.solution
          );
        }
        cell.solution = letter;
      }
    }

    let number = entry.get("number").and_then(Value::as_u64).map(|n| n as u32);
    let hint = entry
      .get("clue")
      .and_then(Value::as_str)
      .map(html::decode)
      .unwrap_or_default();
    puzzle.add_clue(if across { ACROSS } else { DOWN }, number, hint, zone);
  }
  puzzle.index_zones()?;

  // This dialect names its metadata differently.
  puzzle.meta.title =
    root.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
  puzzle.meta.author =
    root.get("creator").and_then(Value::as_str).unwrap_or_default().to_string();
  puzzle.meta.date =
    root.get("date").and_then(Value::as_str).unwrap_or_default().to_string();
  Ok(puzzle)
}

fn read_meta_strings(puzzle: &mut Puzzle, root: &Value) {
  let text = |key: &str| {
    root.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
  };
  puzzle.meta.title = text("title");
  puzzle.meta.author = text("author");
  puzzle.meta.copyright = text("copyright");
  puzzle.meta.source = text("publisher");
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn cell_list_fixture() -> Vec<u8> {
    let root = json!({
      "width": 3,
      "height": 2,
      "title": "Boxes",
      "author": "A. Setter",
      "boxes": [
        {"x": 1, "y": 1, "letter": "C"},
        {"x": 2, "y": 1, "letter": "A", "circled": true},
        {"x": 3, "y": 1, "letter": "T"},
        {"x": 1, "y": 2, "letter": "O"},
        {"x": 3, "y": 2, "letter": "E"}
      ],
      "placedWords": [
        {"across": true, "clueNumber": 1, "boxes": [0, 1, 2], "clue": "Feline"},
        {"across": false, "clueNumber": 1, "boxes": [0, 3], "clue": "Co. abbr."},
        {"across": false, "clueNumber": 3, "boxes": [2, 4], "clue": "Golf peg &amp; more"}
      ]
    });
    serde_json::to_vec(&root).unwrap()
  }

  #[test]
  fn cell_list_parses() {
    let p = read_cell_list(&cell_list_fixture()).unwrap();
    assert_eq!((p.width(), p.height()), (3, 2));
    assert!(p.cell_at((1, 1)).is_none());
    assert!(p.cell_at((0, 1)).unwrap().circled);
    assert_eq!(p.cell_at((1, 2)).unwrap().solution, "E");
    assert_eq!(p.meta.title, "Boxes");

    let down_3 = p.list(DOWN).unwrap().by_number(3).unwrap();
    assert_eq!(down_3.hint, "Golf peg & more");
    assert_eq!(down_3.zone.positions(), [(0, 2), (1, 2)]);
  }

  #[test]
  fn cell_list_bad_box_reference_is_structural() {
    let mut root: Value = serde_json::from_slice(&cell_list_fixture()).unwrap();
    root["placedWords"][0]["boxes"] = json!([0, 1, 99]);
    let result = read_cell_list(&serde_json::to_vec(&root).unwrap());
    assert!(matches!(result, Err(ReadError::StructuralCorruption(_))));
  }

  fn entry_list_fixture() -> Vec<u8> {
    let root = json!({
      "name": "Entries",
      "creator": "A. Setter",
      "dimensions": {"cols": 3, "rows": 3},
      "entries": [
        {"number": 1, "direction": "across", "length": 3,
         "position": {"x": 1, "y": 1}, "solution": "CAT", "clue": "Feline"},
        {"number": 1, "direction": "down", "length": 3,
         "position": {"x": 1, "y": 1}, "solution": "COW", "clue": "Bovine"},
        {"number": 3, "direction": "down", "length": 3,
         "position": {"x": 3, "y": 1}, "solution": "TEE", "clue": "Golf peg"}
      ]
    });
    serde_json::to_vec(&root).unwrap()
  }

  #[test]
  fn entry_list_builds_the_grid_union() {
    let p = read_entry_list(&entry_list_fixture()).unwrap();
    assert_eq!((p.width(), p.height()), (3, 3));
    // Never covered by an entry: stays a block.
    assert!(p.cell_at((1, 1)).is_none());
    assert_eq!(p.cell_at((2, 0)).unwrap().solution, "W");
    assert_eq!(p.cell_at((0, 0)).unwrap().solution, "C");
    assert_eq!(p.meta.title, "Entries");

    let across_1 = p.list(ACROSS).unwrap().by_number(1).unwrap();
    assert_eq!(across_1.zone.positions(), [(0, 0), (0, 1), (0, 2)]);
  }

  #[test]
  fn wrong_json_is_a_format_mismatch() {
    assert!(matches!(read_cell_list(b"{}"), Err(ReadError::FormatMismatch)));
    assert!(matches!(read_entry_list(b"{}"), Err(ReadError::FormatMismatch)));
    assert!(matches!(
      read_entry_list(&cell_list_fixture()),
      Err(ReadError::FormatMismatch)
    ));
  }

  #[test]
  fn reversed_base64_round_trips() {
    let payload = br#"{"entries": []}"#;
    let obfuscated: String = STANDARD.encode(payload).chars().rev().collect();
    assert_eq!(decode_reversed_base64(&obfuscated).unwrap(), payload);
  }
}
