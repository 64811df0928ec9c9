//! Reader for the XML crossword-applet dialect.
//!
//! The shape is a `rectangular-puzzle` document: a `grid` of `cell`
//! elements addressed by 1-based x/y attributes, `word` elements defining
//! zones by id, and `clues` blocks whose clues reference word ids. Only
//! reading is supported; saves go through the interchange JSON format.

use crate::errors::ReadError;
use crate::html;
use crate::puzzle::{Cell, Pos, Puzzle, Zone};
use log::warn;
use roxmltree::{Document, Node};
use std::collections::BTreeMap;

pub fn read(data: &[u8]) -> Result<Puzzle, ReadError> {
  let text = std::str::from_utf8(data).map_err(|_| ReadError::FormatMismatch)?;
  let doc = Document::parse(text).map_err(|_| ReadError::FormatMismatch)?;
  let root = doc
    .descendants()
    .find(|n| n.has_tag_name_local("rectangular-puzzle"))
    .ok_or(ReadError::FormatMismatch)?;

  let grid = root
    .descendants()
    .find(|n| n.has_tag_name_local("grid"))
    .ok_or_else(|| ReadError::StructuralCorruption("no grid element".to_string()))?;
  let width = numeric_attr(&grid, "width")?;
  let height = numeric_attr(&grid, "height")?;
  let mut puzzle = Puzzle::new(width, height);

  for cell_node in grid.children().filter(|n| n.has_tag_name_local("cell")) {
    let pos = cell_pos(&cell_node)?;
    if cell_node.attribute("type") == Some("block") {
      continue;
    }
    let mut cell = Cell::new(cell_node.attribute("solution").unwrap_or_default());
    if let Some(state) = cell_node.attribute("solve-state") {
      cell.response = state.to_string();
    }
    cell.circled = cell_node.attribute("background-shape") == Some("circle");
    cell.color = cell_node.attribute("background-color").map(str::to_string);
    cell.bars.top = cell_node.attribute("top-bar") == Some("true");
    cell.bars.right = cell_node.attribute("right-bar") == Some("true");
    cell.bars.bottom = cell_node.attribute("bottom-bar") == Some("true");
    cell.bars.left = cell_node.attribute("left-bar") == Some("true");
    puzzle.set_cell(pos, cell);
  }

  let mut numbers: BTreeMap<Pos, u32> = BTreeMap::new();
  for cell_node in grid.children().filter(|n| n.has_tag_name_local("cell")) {
    if let (Ok(pos), Some(number)) = (
      cell_pos(&cell_node),
      cell_node.attribute("number").and_then(|n| n.parse().ok()),
    ) {
      numbers.insert(pos, number);
    }
  }

  let mut words: BTreeMap<String, Zone> = BTreeMap::new();
  for word in root.descendants().filter(|n| n.has_tag_name_local("word")) {
    let Some(id) = word.attribute("id") else {
      continue;
    };
    words.insert(id.to_string(), word_zone(&word)?);
  }

  for clues in root.descendants().filter(|n| n.has_tag_name_local("clues")) {
    let list_name = clues
      .children()
      .find(|n| n.has_tag_name_local("title"))
      .map(|t| collect_text(&t))
      .unwrap_or_default();
    let list_name = list_name.trim();
    if list_name.is_empty() {
      return Err(ReadError::StructuralCorruption(
        "clue list without a title".to_string(),
      ));
    }

    for clue in clues.children().filter(|n| n.has_tag_name_local("clue")) {
      let zone = match clue.attribute("word").and_then(|id| words.get(id)) {
        Some(zone) => zone.clone(),
        None => {
          warn!("applet: clue references missing word {:?}", clue.attribute("word"));
          Zone::default()
        }
      };
      let number = clue
        .attribute("number")
        .and_then(|n| n.parse().ok())
        .or_else(|| zone.first().and_then(|pos| numbers.get(&pos).copied()));
      let hint = html::decode(collect_text(&clue).trim());
      puzzle.add_clue(list_name, number, hint, zone);
    }
  }
  puzzle.index_zones()?;

  if let Some(metadata) =
    root.descendants().find(|n| n.has_tag_name_local("metadata"))
  {
    let field = |name: &str| {
      metadata
        .children()
        .find(|n| n.has_tag_name_local(name))
        .map(|n| collect_text(&n).trim().to_string())
        .unwrap_or_default()
    };
    puzzle.meta.title = field("title");
    puzzle.meta.author = field("creator");
    puzzle.meta.copyright = field("copyright");
    puzzle.meta.notes = field("description");
  }

  Ok(puzzle)
}

/// The markup inside titles and clues is presentational; only the text
/// matters.
fn collect_text(node: &Node) -> String {
  node.descendants().filter_map(|n| n.text()).collect()
}

fn numeric_attr(node: &Node, name: &str) -> Result<usize, ReadError> {
  node
    .attribute(name)
    .and_then(|v| v.parse::<usize>().ok())
    .filter(|&v| v > 0)
    .ok_or_else(|| {
      ReadError::StructuralCorruption(format!(
        "element {:?} needs a positive {name} attribute",
        node.tag_name().name()
      ))
    })
}

/// Cell coordinates are 1-based, x across.
fn cell_pos(node: &Node) -> Result<Pos, ReadError> {
  let x = numeric_attr(node, "x")?;
  let y = numeric_attr(node, "y")?;
  Ok((y - 1, x - 1))
}

/// A word is either `<word x="1-5" y="3"/>` with range attributes, or a
/// container of `<cells>` children with their own x/y.
fn word_zone(word: &Node) -> Result<Zone, ReadError> {
  let mut positions = Vec::new();
  if word.attribute("x").is_some() {
    extend_positions(&mut positions, word)?;
  }
  for cells in word.children().filter(|n| n.has_tag_name_local("cells")) {
    extend_positions(&mut positions, &cells)?;
  }
  Ok(Zone::new(positions))
}

fn extend_positions(positions: &mut Vec<Pos>, node: &Node) -> Result<(), ReadError> {
  let xs = parse_range(node, "x")?;
  let ys = parse_range(node, "y")?;
  match (xs.len(), ys.len()) {
    (_, 1) => positions.extend(xs.iter().map(|&x| (ys[0] - 1, x - 1))),
    (1, _) => positions.extend(ys.iter().map(|&y| (y - 1, xs[0] - 1))),
    _ => {
      return Err(ReadError::StructuralCorruption(format!(
        "word spans a {}x{} rectangle, expected a line",
        xs.len(),
        ys.len()
      )));
    }
  }
  Ok(())
}

/// Range attributes are either a single number or `"low-high"` inclusive.
fn parse_range(node: &Node, name: &str) -> Result<Vec<usize>, ReadError> {
  let value = node.attribute(name).ok_or_else(|| {
    ReadError::StructuralCorruption(format!("word cells missing {name} attribute"))
  })?;
  let bad = || ReadError::StructuralCorruption(format!("bad range {value:?}"));
  match value.split_once('-') {
    None => Ok(vec![value.parse().map_err(|_| bad())?]),
    Some((low, high)) => {
      let low: usize = low.parse().map_err(|_| bad())?;
      let high: usize = high.parse().map_err(|_| bad())?;
      if low == 0 || high < low {
        return Err(bad());
      }
      Ok((low..=high).collect())
    }
  }
}

/// Tag-name comparison that ignores the document's namespace.
trait LocalName {
  fn has_tag_name_local(&self, name: &str) -> bool;
}

impl LocalName for Node<'_, '_> {
  fn has_tag_name_local(&self, name: &str) -> bool {
    self.is_element() && self.tag_name().name() == name
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::puzzle::{ACROSS, ClueId, DOWN};

  const FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<crossword-compiler-applet xmlns="http://crossword.info/xml/crossword-compiler-applet">
 <rectangular-puzzle xmlns="http://crossword.info/xml/rectangular-puzzle">
  <metadata>
   <title>Applet Fixture</title>
   <creator>A. Setter</creator>
   <copyright>&#169; 2024</copyright>
   <description>Nothing to see</description>
  </metadata>
  <crossword>
   <grid width="3" height="3">
    <cell x="1" y="1" solution="C" number="1"/>
    <cell x="2" y="1" solution="A" number="2" background-shape="circle"/>
    <cell x="3" y="1" solution="T" number="3"/>
    <cell x="1" y="2" solution="O" number="4"/>
    <cell x="2" y="2" type="block"/>
    <cell x="3" y="2" solution="E" top-bar="true"/>
    <cell x="1" y="3" solution="W" number="5" solve-state="W"/>
    <cell x="2" y="3" solution="E"/>
    <cell x="3" y="3" solution="D"/>
   </grid>
   <word id="1" x="1-3" y="1"/>
   <word id="2" x="1-3" y="3"/>
   <word id="3" x="1" y="1-3"/>
   <word id="4" x="3" y="1-3"/>
   <clues ordering="normal">
    <title><b>Across</b></title>
    <clue word="1" number="1">Feline</clue>
    <clue word="2" number="5">Hitched</clue>
   </clues>
   <clues ordering="normal">
    <title><b>Down</b></title>
    <clue word="3" number="1">Bovine</clue>
    <clue word="4" number="3">Golf &amp; tee</clue>
   </clues>
  </crossword>
 </rectangular-puzzle>
</crossword-compiler-applet>"#;

  #[test]
  fn parses_grid_and_clues() {
    let p = read(FIXTURE.as_bytes()).unwrap();
    assert_eq!((p.width(), p.height()), (3, 3));
    assert!(p.cell_at((1, 1)).is_none());
    assert_eq!(p.cell_at((0, 0)).unwrap().solution, "C");
    assert!(p.cell_at((0, 1)).unwrap().circled);
    assert!(p.cell_at((1, 2)).unwrap().bars.top);
    assert_eq!(p.cell_at((2, 0)).unwrap().response, "W");

    let across_1 = p.list(ACROSS).unwrap().by_number(1).unwrap();
    assert_eq!(across_1.hint, "Feline");
    assert_eq!(across_1.zone.positions(), [(0, 0), (0, 1), (0, 2)]);
    let down_3 = p.list(DOWN).unwrap().by_number(3).unwrap();
    assert_eq!(down_3.hint, "Golf & tee");
    assert_eq!(down_3.zone.positions(), [(0, 2), (1, 2), (2, 2)]);
  }

  #[test]
  fn reads_metadata() {
    let p = read(FIXTURE.as_bytes()).unwrap();
    assert_eq!(p.meta.title, "Applet Fixture");
    assert_eq!(p.meta.author, "A. Setter");
    assert_eq!(p.meta.copyright, "© 2024");
    assert_eq!(p.meta.notes, "Nothing to see");
  }

  #[test]
  fn indexes_zone_membership() {
    let p = read(FIXTURE.as_bytes()).unwrap();
    let ids = p.clues_at((0, 0));
    assert!(ids.contains(&ClueId::across(0)));
    assert!(ids.contains(&ClueId::down(0)));
  }

  #[test]
  fn other_xml_is_a_format_mismatch() {
    assert!(matches!(read(b"plain text"), Err(ReadError::FormatMismatch)));
    assert!(matches!(
      read(b"<svg><rect/></svg>"),
      Err(ReadError::FormatMismatch)
    ));
  }

  #[test]
  fn zone_over_a_block_is_structural() {
    let broken = FIXTURE.replace(r#"<word id="3" x="1" y="1-3"/>"#, r#"<word id="3" x="2" y="1-3"/>"#);
    assert!(matches!(
      read(broken.as_bytes()),
      Err(ReadError::StructuralCorruption(_))
    ));
  }
}
