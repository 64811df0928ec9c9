//! The grid/clue/zone data model: pure data plus derived queries, no I/O.
//!
//! A [Puzzle] is constructed wholesale by a codec reader (or programmatically
//! by an external builder), mutated in place by the [Board](crate::board::Board)
//! for the lifetime of a solving session, and serialized at checkpoints.

use crate::errors::ReadError;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Debug, Display};

/// A position in a grid: (row, column). Ordered row-first, which is also
/// grid reading order.
pub type Pos = (usize, usize);

/// Name of the canonical across clue list.
pub const ACROSS: &str = "Across";
/// Name of the canonical down clue list.
pub const DOWN: &str = "Down";

/// Identifies one clue within one named list.
///
/// The index is the clue's stable position within its list. Display numbers
/// are not part of the identity: they are nullable and need not be unique
/// across lists, so they are only good for display and lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClueId {
  list: String,
  index: usize,
}

impl ClueId {
  pub fn new(list: impl Into<String>, index: usize) -> Self {
    Self { list: list.into(), index }
  }

  pub fn across(index: usize) -> Self {
    Self::new(ACROSS, index)
  }

  pub fn down(index: usize) -> Self {
    Self::new(DOWN, index)
  }

  pub fn list(&self) -> &str {
    &self.list
  }

  pub fn index(&self) -> usize {
    self.index
  }
}

impl Display for ClueId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}[{}]", self.list, self.index)
  }
}

/// The ordered sequence of positions a clue spans, in answer order.
///
/// A zone need not be a straight line (diagonal and curved "path" puzzles
/// are allowed) and may be empty (a clue with no on-grid presence).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Zone(Vec<Pos>);

impl Zone {
  pub fn new(positions: Vec<Pos>) -> Self {
    Self(positions)
  }

  /// A horizontal run of `len` cells starting at `pos`.
  pub fn across_run((row, col): Pos, len: usize) -> Self {
    Self((0..len).map(|i| (row, col + i)).collect())
  }

  /// A vertical run of `len` cells starting at `pos`.
  pub fn down_run((row, col): Pos, len: usize) -> Self {
    Self((0..len).map(|i| (row + i, col)).collect())
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn positions(&self) -> &[Pos] {
    &self.0
  }

  pub fn contains(&self, pos: Pos) -> bool {
    self.0.contains(&pos)
  }

  /// The offset of `pos` within this zone, if the zone passes through it.
  pub fn index_of(&self, pos: Pos) -> Option<usize> {
    self.0.iter().position(|&p| p == pos)
  }

  pub fn first(&self) -> Option<Pos> {
    self.0.first().copied()
  }

  pub fn last(&self) -> Option<Pos> {
    self.0.last().copied()
  }
}

/// One clue: where it lives, what it shows, and the cells it spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clue {
  list: String,
  index: usize,
  /// Display number. Not all clues are numbered.
  pub number: Option<u32>,
  /// The hint text, as plain text (markup is stripped at the codec
  /// boundary, only line breaks survive).
  pub hint: String,
  pub zone: Zone,
}

impl Clue {
  pub fn id(&self) -> ClueId {
    ClueId::new(self.list.clone(), self.index)
  }

  pub fn list(&self) -> &str {
    &self.list
  }

  /// Stable position within the clue's list, independent of number.
  pub fn index(&self) -> usize {
    self.index
  }
}

/// An ordered collection of clues for one list name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClueList {
  name: String,
  clues: Vec<Clue>,
}

impl ClueList {
  fn new(name: String) -> Self {
    Self { name, clues: Vec::new() }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn len(&self) -> usize {
    self.clues.len()
  }

  pub fn is_empty(&self) -> bool {
    self.clues.is_empty()
  }

  pub fn get(&self, index: usize) -> Option<&Clue> {
    self.clues.get(index)
  }

  pub fn iter(&self) -> impl Iterator<Item = &Clue> {
    self.clues.iter()
  }

  /// Looks a clue up by its display number.
  pub fn by_number(&self, number: u32) -> Option<&Clue> {
    self.clues.iter().find(|c| c.number == Some(number))
  }

  /// The indices of clues that actually appear on the grid.
  pub fn zoned(&self) -> Vec<usize> {
    self
      .clues
      .iter()
      .enumerate()
      .filter(|(_, c)| !c.zone.is_empty())
      .map(|(i, _)| i)
      .collect()
  }

  /// The first zoned index after `from`, or the first zoned index overall
  /// when wrapping is requested and nothing follows.
  pub fn next_zoned(&self, from: usize, wrap: bool) -> Option<usize> {
    let zoned = self.zoned();
    match zoned.iter().find(|&&i| i > from) {
      Some(&i) => Some(i),
      None if wrap => zoned.first().copied(),
      None => None,
    }
  }

  /// The last zoned index before `from`, or the last zoned index overall
  /// when wrapping is requested and nothing precedes.
  pub fn prev_zoned(&self, from: usize, wrap: bool) -> Option<usize> {
    let zoned = self.zoned();
    match zoned.iter().rev().find(|&&i| i < from) {
      Some(&i) => Some(i),
      None if wrap => zoned.last().copied(),
      None => None,
    }
  }

  fn get_mut(&mut self, index: usize) -> Option<&mut Clue> {
    self.clues.get_mut(index)
  }
}

/// Barred-grid edge flags for one cell. Barred grids separate words with
/// explicit edge barriers instead of blocked cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bars {
  pub top: bool,
  pub right: bool,
  pub bottom: bool,
  pub left: bool,
}

impl Bars {
  pub fn any(&self) -> bool {
    self.top || self.right || self.bottom || self.left
  }
}

/// The 3×3 grid of optional short text annotations some puzzle styles put
/// in cell corners and edges. `marks[0][0]` is the top-left corner,
/// `marks[1][1]` the center.
pub type Marks = [[Option<String>; 3]; 3];

/// One present cell of the grid. Absent grid coordinates (blocks) have no
/// `Cell` at all.
///
/// The solution and response are strings rather than chars so that rebus
/// entries work; for an ordinary cell both are single characters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
  pub solution: String,
  pub response: String,
  /// Whether a hint was used to fill this letter.
  pub cheated: bool,
  /// Who filled the letter, for shared/collaborative play.
  pub responder: Option<String>,
  pub circled: bool,
  pub bars: Bars,
  /// Optional foreground color tag, e.g. a hex string.
  pub color: Option<String>,
  pub marks: Marks,
  clue_ids: BTreeSet<ClueId>,
}

impl Cell {
  pub fn new(solution: impl Into<String>) -> Self {
    Self { solution: solution.into(), ..Self::default() }
  }

  pub fn has_response(&self) -> bool {
    !self.response.is_empty()
  }

  /// Whether the response matches the solution.
  pub fn is_correct(&self) -> bool {
    self.response == self.solution
  }

  /// The clues this cell belongs to. Maintained by [Puzzle::index_zones],
  /// always consistent with the zones that contain this cell's position.
  pub fn clue_ids(&self) -> &BTreeSet<ClueId> {
    &self.clue_ids
  }

  /// First character of the solution, for codecs that can only carry one.
  pub fn solution_char(&self) -> Option<char> {
    self.solution.chars().next()
  }

  pub fn response_char(&self) -> Option<char> {
    self.response.chars().next()
  }

  pub fn has_marks(&self) -> bool {
    self.marks.iter().flatten().any(|m| m.is_some())
  }
}

/// Free-form per-clue solver scratch state: pencil marks, an annotation,
/// and an anagram-solving aid pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Note {
  pub scratch: String,
  pub text: String,
  pub anagram_source: String,
  pub anagram_solution: String,
}

impl Note {
  pub fn is_empty(&self) -> bool {
    self.scratch.is_empty()
      && self.text.is_empty()
      && self.anagram_source.is_empty()
      && self.anagram_solution.is_empty()
  }
}

/// Descriptive puzzle metadata. Fields a source format does not offer stay
/// empty rather than being defaulted speculatively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
  pub title: String,
  pub author: String,
  pub source: String,
  pub copyright: String,
  pub date: String,
  pub source_url: String,
  pub support_url: String,
  /// Whether the source may publish updated versions of this puzzle.
  pub updatable: bool,
  pub completion_message: String,
  /// Puzzle-level notepad text, distinct from per-clue [Note]s.
  pub notes: String,
}

/// A crossword puzzle: the cell grid, the clue lists, and all play state.
///
/// Two puzzles are equal iff the grid dimensions, every cell's full state,
/// every clue list's contents, every note, the flag set, history, cursor,
/// direction and metadata are equal. That equality is the basis for the
/// codec round-trip tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Puzzle {
  width: usize,
  height: usize,
  cells: Vec<Option<Cell>>,
  lists: BTreeMap<String, ClueList>,
  notes: BTreeMap<ClueId, Note>,
  flagged: BTreeSet<ClueId>,
  history: Vec<ClueId>,
  cursor: Pos,
  current_list: String,
  elapsed_seconds: u64,
  pinned: Option<ClueId>,
  pub meta: Metadata,
  /// Present while the solution is still scrambled: the checksum of the
  /// unscrambled letters, used to verify a candidate unlock key.
  scrambled_checksum: Option<u16>,
}

impl Puzzle {
  /// An all-absent grid of the given dimensions.
  pub fn new(width: usize, height: usize) -> Self {
    Self {
      width,
      height,
      cells: vec![None; width * height],
      lists: BTreeMap::new(),
      notes: BTreeMap::new(),
      flagged: BTreeSet::new(),
      history: Vec::new(),
      cursor: (0, 0),
      current_list: ACROSS.to_string(),
      elapsed_seconds: 0,
      pinned: None,
      meta: Metadata::default(),
      scrambled_checksum: None,
    }
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn height(&self) -> usize {
    self.height
  }

  /// An iterator over all positions, from left to right and top to bottom.
  pub fn positions(&self) -> impl Iterator<Item = Pos> + use<> {
    let (w, h) = (self.width, self.height);
    (0..h).flat_map(move |r| (0..w).map(move |c| (r, c)))
  }

  fn offset(&self, (row, col): Pos) -> Option<usize> {
    (row < self.height && col < self.width).then(|| row * self.width + col)
  }

  /// The cell at `pos`, or `None` when the coordinate is absent (a block)
  /// or out of range.
  pub fn cell_at(&self, pos: Pos) -> Option<&Cell> {
    self.cells[self.offset(pos)?].as_ref()
  }

  pub fn cell_at_mut(&mut self, pos: Pos) -> Option<&mut Cell> {
    let offset = self.offset(pos)?;
    self.cells[offset].as_mut()
  }

  pub fn set_cell(&mut self, pos: Pos, cell: Cell) {
    if let Some(offset) = self.offset(pos) {
      self.cells[offset] = Some(cell);
    }
  }

  pub fn remove_cell(&mut self, pos: Pos) {
    if let Some(offset) = self.offset(pos) {
      self.cells[offset] = None;
    }
  }

  /// The clues whose zones pass through `pos`.
  pub fn clues_at(&self, pos: Pos) -> BTreeSet<ClueId> {
    self.cell_at(pos).map(|c| c.clue_ids.clone()).unwrap_or_default()
  }

  pub fn clue_for(&self, id: &ClueId) -> Option<&Clue> {
    self.lists.get(id.list())?.get(id.index())
  }

  pub fn clue_for_mut(&mut self, id: &ClueId) -> Option<&mut Clue> {
    self.lists.get_mut(id.list())?.get_mut(id.index())
  }

  pub fn zone_length(&self, id: &ClueId) -> usize {
    self.clue_for(id).map(|c| c.zone.len()).unwrap_or(0)
  }

  pub fn list(&self, name: &str) -> Option<&ClueList> {
    self.lists.get(name)
  }

  pub fn lists(&self) -> impl Iterator<Item = &ClueList> {
    self.lists.values()
  }

  pub fn list_names(&self) -> impl Iterator<Item = &str> {
    self.lists.keys().map(String::as_str)
  }

  /// Appends a clue to the named list (creating the list if needed) and
  /// returns its identity. Call [index_zones](Self::index_zones) once all
  /// clues are in.
  pub fn add_clue(
    &mut self,
    list: &str,
    number: Option<u32>,
    hint: impl Into<String>,
    zone: Zone,
  ) -> ClueId {
    let clue_list = self
      .lists
      .entry(list.to_string())
      .or_insert_with(|| ClueList::new(list.to_string()));
    let index = clue_list.clues.len();
    clue_list.clues.push(Clue {
      list: list.to_string(),
      index,
      number,
      hint: hint.into(),
      zone,
    });
    ClueId::new(list, index)
  }

  /// Rebuilds every cell's clue-membership set from the zones.
  ///
  /// Fails with [ReadError::StructuralCorruption] if any zone references an
  /// absent cell — codec readers surface that as a format error.
  pub fn index_zones(&mut self) -> Result<(), ReadError> {
    for cell in self.cells.iter_mut().flatten() {
      cell.clue_ids.clear();
    }

    let memberships: Vec<(Pos, ClueId)> = self
      .lists
      .values()
      .flat_map(|list| list.iter())
      .flat_map(|clue| {
        let id = clue.id();
        clue.zone.positions().iter().map(move |&p| (p, id.clone()))
      })
      .collect();

    for (pos, id) in memberships {
      match self.offset(pos).and_then(|o| self.cells[o].as_mut()) {
        Some(cell) => {
          cell.clue_ids.insert(id);
        }
        None => {
          return Err(ReadError::StructuralCorruption(format!(
            "clue {id} references absent cell ({}, {})",
            pos.0, pos.1
          )));
        }
      }
    }
    Ok(())
  }

  /// Assigns display numbers in reading order of zone start positions.
  /// Every clue starting at the same position shares one number. Zoneless
  /// clues keep whatever number (or lack of one) they already have.
  pub fn number_clues_by_position(&mut self) {
    let mut starts: BTreeMap<Pos, Vec<ClueId>> = BTreeMap::new();
    for list in self.lists.values() {
      for clue in list.iter() {
        if let Some(first) = clue.zone.first() {
          starts.entry(first).or_default().push(clue.id());
        }
      }
    }

    // BTreeMap iteration order over Pos is reading order.
    for (number, ids) in (1u32..).zip(starts.values()) {
      for id in ids {
        if let Some(clue) = self.clue_for_mut(id) {
          clue.number = Some(number);
        }
      }
    }
  }

  pub fn cursor(&self) -> Pos {
    self.cursor
  }

  /// Moves the cursor. A target without a present cell is ignored.
  pub fn set_cursor(&mut self, pos: Pos) {
    if self.cell_at(pos).is_some() {
      self.cursor = pos;
    }
  }

  /// The name of the clue list the cursor is currently working in
  /// ("Across", "Down", or a puzzle-specific extra list).
  pub fn current_list(&self) -> &str {
    &self.current_list
  }

  pub fn set_current_list(&mut self, name: impl Into<String>) {
    self.current_list = name.into();
  }

  pub fn history(&self) -> &[ClueId] {
    &self.history
  }

  /// Appends to the visit history unless `id` is already the most recent
  /// entry.
  pub fn push_history(&mut self, id: ClueId) {
    if self.history.last() != Some(&id) {
      self.history.push(id);
    }
  }

  pub fn set_history(&mut self, history: Vec<ClueId>) {
    self.history = history;
  }

  pub fn note_for(&self, id: &ClueId) -> Option<&Note> {
    self.notes.get(id)
  }

  /// Stores a note for the clue; an empty note clears the entry.
  pub fn set_note(&mut self, id: ClueId, note: Note) {
    if note.is_empty() {
      self.notes.remove(&id);
    } else {
      self.notes.insert(id, note);
    }
  }

  pub fn notes(&self) -> impl Iterator<Item = (&ClueId, &Note)> {
    self.notes.iter()
  }

  pub fn is_flagged(&self, id: &ClueId) -> bool {
    self.flagged.contains(id)
  }

  pub fn set_flagged(&mut self, id: ClueId, flagged: bool) {
    if flagged {
      self.flagged.insert(id);
    } else {
      self.flagged.remove(&id);
    }
  }

  pub fn flagged(&self) -> impl Iterator<Item = &ClueId> {
    self.flagged.iter()
  }

  /// The clue kept visible/editable outside the main grid flow, if any.
  pub fn pinned(&self) -> Option<&ClueId> {
    self.pinned.as_ref()
  }

  pub fn set_pinned(&mut self, id: Option<ClueId>) {
    self.pinned = id;
  }

  pub fn elapsed_seconds(&self) -> u64 {
    self.elapsed_seconds
  }

  pub fn set_elapsed_seconds(&mut self, seconds: u64) {
    self.elapsed_seconds = seconds;
  }

  /// Whether the solution is still scrambled under a numeric key.
  pub fn is_locked(&self) -> bool {
    self.scrambled_checksum.is_some()
  }

  pub fn scrambled_checksum(&self) -> Option<u16> {
    self.scrambled_checksum
  }

  pub fn set_scrambled_checksum(&mut self, checksum: Option<u16>) {
    self.scrambled_checksum = checksum;
  }

  /// Whether every present cell has a response.
  pub fn is_filled(&self) -> bool {
    self.cells.iter().flatten().all(Cell::has_response)
  }

  /// Whether the puzzle is fully filled in and matches the solution.
  /// Always false while the solution is locked.
  pub fn is_solved(&self) -> bool {
    !self.is_locked() && self.cells.iter().flatten().all(Cell::is_correct)
  }

  /// Portion of present cells with any response, 0–100.
  pub fn percent_filled(&self) -> u8 {
    self.percent_of(Cell::has_response)
  }

  /// Portion of present cells filled correctly, 0–100.
  pub fn percent_complete(&self) -> u8 {
    self.percent_of(Cell::is_correct)
  }

  fn percent_of(&self, pred: impl Fn(&Cell) -> bool) -> u8 {
    let total = self.cells.iter().flatten().count();
    if total == 0 {
      return 0;
    }
    let hit = self.cells.iter().flatten().filter(|c| pred(c)).count();
    (hit * 100 / total) as u8
  }
}

impl Display for Puzzle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for row in 0..self.height {
      for col in 0..self.width {
        match self.cell_at((row, col)) {
          None => write!(f, "■")?,
          Some(cell) => match cell.response_char() {
            Some(ch) => write!(f, "{ch}")?,
            None => write!(f, " ")?,
          },
        }
      }
      writeln!(f)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn two_by_two() -> Puzzle {
    let mut p = Puzzle::new(2, 2);
    for pos in [(0, 0), (0, 1), (1, 0), (1, 1)] {
      p.set_cell(pos, Cell::new("A"));
    }
    p.add_clue(ACROSS, None, "Top row", Zone::across_run((0, 0), 2));
    p.add_clue(ACROSS, None, "Bottom row", Zone::across_run((1, 0), 2));
    p.add_clue(DOWN, None, "Left column", Zone::down_run((0, 0), 2));
    p.add_clue(DOWN, None, "Right column", Zone::down_run((0, 1), 2));
    p.index_zones().unwrap();
    p.number_clues_by_position();
    p
  }

  #[test]
  fn zone_indexing_sets_memberships() {
    let p = two_by_two();
    let ids = p.clues_at((0, 0));
    assert!(ids.contains(&ClueId::across(0)));
    assert!(ids.contains(&ClueId::down(0)));
    assert_eq!(ids.len(), 2);

    let ids = p.clues_at((1, 1));
    assert!(ids.contains(&ClueId::across(1)));
    assert!(ids.contains(&ClueId::down(1)));
  }

  #[test]
  fn numbering_follows_reading_order() {
    let p = two_by_two();
    assert_eq!(p.clue_for(&ClueId::across(0)).unwrap().number, Some(1));
    assert_eq!(p.clue_for(&ClueId::down(0)).unwrap().number, Some(1));
    assert_eq!(p.clue_for(&ClueId::down(1)).unwrap().number, Some(2));
    assert_eq!(p.clue_for(&ClueId::across(1)).unwrap().number, Some(3));
  }

  #[test]
  fn zone_referencing_absent_cell_is_structural() {
    let mut p = Puzzle::new(2, 2);
    p.set_cell((0, 0), Cell::new("A"));
    p.add_clue(ACROSS, None, "Bad", Zone::across_run((0, 0), 2));
    assert!(matches!(
      p.index_zones(),
      Err(ReadError::StructuralCorruption(_))
    ));
  }

  #[test]
  fn history_skips_immediate_duplicates() {
    let mut p = two_by_two();
    p.push_history(ClueId::across(0));
    p.push_history(ClueId::across(0));
    p.push_history(ClueId::down(0));
    p.push_history(ClueId::across(0));
    assert_eq!(
      p.history(),
      [ClueId::across(0), ClueId::down(0), ClueId::across(0)]
    );
  }

  #[test]
  fn zoned_navigation_wraps() {
    let mut p = two_by_two();
    p.add_clue(ACROSS, None, "Pure trivia", Zone::default());
    let list = p.list(ACROSS).unwrap();
    assert_eq!(list.zoned(), [0, 1]);
    assert_eq!(list.next_zoned(0, false), Some(1));
    assert_eq!(list.next_zoned(1, false), None);
    assert_eq!(list.next_zoned(1, true), Some(0));
    assert_eq!(list.next_zoned(2, true), Some(0));
    assert_eq!(list.prev_zoned(0, false), None);
    assert_eq!(list.prev_zoned(0, true), Some(1));
  }

  #[test]
  fn empty_note_clears_entry() {
    let mut p = two_by_two();
    let id = ClueId::across(0);
    p.set_note(id.clone(), Note { scratch: "AB".into(), ..Note::default() });
    assert!(p.note_for(&id).is_some());
    p.set_note(id.clone(), Note::default());
    assert!(p.note_for(&id).is_none());
  }

  #[test]
  fn percentages() {
    let mut p = two_by_two();
    assert_eq!(p.percent_filled(), 0);
    p.cell_at_mut((0, 0)).unwrap().response = "A".into();
    p.cell_at_mut((0, 1)).unwrap().response = "X".into();
    assert_eq!(p.percent_filled(), 50);
    assert_eq!(p.percent_complete(), 25);
    assert!(!p.is_solved());
  }
}
