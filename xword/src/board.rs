//! The navigation engine: cursor, direction, movement strategy, and the
//! mutation operations a solving session performs on a [Puzzle].
//!
//! The engine has no error paths of its own. Out-of-range positions and
//! absent-cell targets are no-ops, because the UI collaborator only ever
//! requests reachable positions.

use crate::puzzle::{ACROSS, Clue, ClueId, DOWN, Pos, Puzzle, Zone};
use std::fmt::{self, Debug};

/// Where the cursor goes after a successful letter entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MovementStrategy {
  /// Advance along the current axis and stop at the grid edge.
  #[default]
  NextOnAxis,
  /// Advance along the axis and wrap to the start of the same word when
  /// the end of the word is reached.
  WrapCurrentWord,
  /// Advance to the next clue (possibly switching direction) when the word
  /// ends, wrapping across the whole puzzle after the last clue.
  NextClue,
  /// Advance to the parallel position in the next clue of the same
  /// direction.
  ParallelClue,
}

/// A concrete on-grid word: a clue identity plus the zone it spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
  pub clue_id: ClueId,
  pub zone: Zone,
}

/// What changed, pushed to listeners after every mutation.
///
/// `whole_board` signals a bulk change (e.g. a fresh puzzle load) requiring
/// a full re-render; otherwise only `current_word ∪ previous_word` need be
/// refreshed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardChange {
  pub whole_board: bool,
  pub current_word: Option<Word>,
  pub previous_word: Option<Word>,
}

/// Observer of board state. Notified synchronously, in registration order,
/// on the caller's thread.
pub trait BoardListener {
  fn board_changed(&mut self, change: &BoardChange);
}

/// Handle returned by [Board::subscribe]; pass it back to
/// [Board::unsubscribe] on teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken(u64);

/// A position the cursor could advance to, with the clue list the word
/// context should switch to when it is not the current one.
#[derive(Debug, Clone)]
struct Candidate {
  pos: Pos,
  list: Option<String>,
}

/// A [Puzzle] under play: cursor state, movement configuration, and the
/// listener registry. Single-threaded and synchronous; one active session
/// mutates one puzzle.
pub struct Board {
  puzzle: Puzzle,
  strategy: MovementStrategy,
  skip_completed_letters: bool,
  dont_delete_crossing: bool,
  listeners: Vec<(ListenerToken, Box<dyn BoardListener>)>,
  next_token: u64,
}

impl Debug for Board {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Board")
      .field("puzzle", &self.puzzle)
      .field("strategy", &self.strategy)
      .field("skip_completed_letters", &self.skip_completed_letters)
      .field("dont_delete_crossing", &self.dont_delete_crossing)
      .field("listeners", &self.listeners.len())
      .finish()
  }
}

impl Board {
  pub fn new(puzzle: Puzzle) -> Self {
    let mut board = Self {
      puzzle,
      strategy: MovementStrategy::default(),
      skip_completed_letters: false,
      dont_delete_crossing: false,
      listeners: Vec::new(),
      next_token: 0,
    };
    board.place_cursor_on_first_cell();
    board
  }

  pub fn puzzle(&self) -> &Puzzle {
    &self.puzzle
  }

  pub fn into_puzzle(self) -> Puzzle {
    self.puzzle
  }

  /// Swaps in a different puzzle and signals a whole-board change.
  pub fn set_puzzle(&mut self, puzzle: Puzzle) {
    self.puzzle = puzzle;
    self.place_cursor_on_first_cell();
    let current = self.current_word();
    self.notify(BoardChange { whole_board: true, current_word: current, previous_word: None });
  }

  pub fn strategy(&self) -> MovementStrategy {
    self.strategy
  }

  pub fn set_strategy(&mut self, strategy: MovementStrategy) {
    self.strategy = strategy;
  }

  pub fn skip_completed_letters(&self) -> bool {
    self.skip_completed_letters
  }

  pub fn set_skip_completed_letters(&mut self, skip: bool) {
    self.skip_completed_letters = skip;
  }

  pub fn dont_delete_crossing(&self) -> bool {
    self.dont_delete_crossing
  }

  pub fn set_dont_delete_crossing(&mut self, dont: bool) {
    self.dont_delete_crossing = dont;
  }

  pub fn subscribe(&mut self, listener: Box<dyn BoardListener>) -> ListenerToken {
    let token = ListenerToken(self.next_token);
    self.next_token += 1;
    self.listeners.push((token, listener));
    token
  }

  /// Detaches a listener. Returns false if the token was already gone.
  pub fn unsubscribe(&mut self, token: ListenerToken) -> bool {
    let before = self.listeners.len();
    self.listeners.retain(|(t, _)| *t != token);
    self.listeners.len() != before
  }

  fn notify(&mut self, change: BoardChange) {
    for (_, listener) in self.listeners.iter_mut() {
      listener.board_changed(&change);
    }
  }

  fn place_cursor_on_first_cell(&mut self) {
    if self.puzzle.cell_at(self.puzzle.cursor()).is_some() {
      self.adjust_list();
      return;
    }
    if let Some(pos) = {
      let p = &self.puzzle;
      p.positions().find(|&pos| p.cell_at(pos).is_some())
    } {
      self.puzzle.set_cursor(pos);
      self.adjust_list();
    }
  }

  /// The word the cursor is in, for the current direction. Recomputed from
  /// the zones on every call, never cached.
  pub fn current_word(&self) -> Option<Word> {
    self.word_through(self.puzzle.cursor(), self.puzzle.current_list())
  }

  pub fn current_clue(&self) -> Option<&Clue> {
    let id = self.current_clue_id()?;
    self.puzzle.clue_for(&id)
  }

  fn current_clue_id(&self) -> Option<ClueId> {
    self
      .word_through(self.puzzle.cursor(), self.puzzle.current_list())
      .map(|w| w.clue_id)
  }

  /// The lowest-indexed clue of `list` whose zone passes through `pos`.
  fn word_through(&self, pos: Pos, list: &str) -> Option<Word> {
    let id = self
      .puzzle
      .clues_at(pos)
      .into_iter()
      .find(|id| id.list() == list)?;
    let zone = self.puzzle.clue_for(&id)?.zone.clone();
    Some(Word { clue_id: id, zone })
  }

  /// Writes the (possibly multi-character) response into the cell at the
  /// cursor, then advances per the movement strategy. The cheated flag is
  /// left as it was.
  pub fn play_letter(&mut self, text: &str) {
    let pos = self.puzzle.cursor();
    let previous = self.current_word();

    {
      let Some(cell) = self.puzzle.cell_at_mut(pos) else { return };
      let response = text.to_uppercase();
      // Rebus symmetry: a multi-character response is only allowed where
      // the solution is also multi-character.
      if cell.solution.chars().count() <= 1 {
        cell.response = response.chars().take(1).collect();
      } else {
        cell.response = response;
      }
    }

    self.advance_cursor();
    if let Some(id) = self.current_clue_id() {
      self.puzzle.push_history(id);
    }
    let current = self.current_word();
    self.notify(BoardChange { whole_board: false, current_word: current, previous_word: previous });
  }

  /// Blanks the current cell, or walks back first when it is already
  /// blank. With `dont_delete_crossing` set, a letter shared with another
  /// fully-filled word is kept, but the cursor still retreats.
  pub fn delete_letter(&mut self) {
    let previous = self.current_word();
    let mut retreated = false;

    let blank_here = self
      .puzzle
      .cell_at(self.puzzle.cursor())
      .is_none_or(|c| !c.has_response());
    if blank_here {
      self.retreat_cursor();
      retreated = true;
    }

    let pos = self.puzzle.cursor();
    if self.dont_delete_crossing && self.crossing_word_filled(pos) {
      if !retreated {
        self.retreat_cursor();
      }
    } else if let Some(cell) = self.puzzle.cell_at_mut(pos) {
      cell.response.clear();
      cell.responder = None;
    }

    let current = self.current_word();
    self.notify(BoardChange { whole_board: false, current_word: current, previous_word: previous });
  }

  /// Whether some other word through `pos` is completely filled in.
  fn crossing_word_filled(&self, pos: Pos) -> bool {
    let current = self.current_clue_id();
    self
      .puzzle
      .clues_at(pos)
      .iter()
      .filter(|id| Some(*id) != current.as_ref())
      .any(|id| {
        self
          .puzzle
          .clue_for(id)
          .map(|clue| {
            !clue.zone.is_empty()
              && clue.zone.positions().iter().all(|&p| {
                self.puzzle.cell_at(p).is_some_and(|c| c.has_response())
              })
          })
          .unwrap_or(false)
      })
  }

  /// Fills the current cell from the solution and marks it cheated.
  pub fn reveal_letter(&mut self) {
    let previous = self.current_word();
    let pos = self.puzzle.cursor();
    if self.puzzle.is_locked() {
      return;
    }
    if let Some(cell) = self.puzzle.cell_at_mut(pos) {
      cell.response = cell.solution.clone();
      cell.cheated = true;
    }
    let current = self.current_word();
    self.notify(BoardChange { whole_board: false, current_word: current, previous_word: previous });
  }

  /// Fills every cell of the current word from the solution, marking the
  /// cells it changes as cheated.
  pub fn reveal_word(&mut self) {
    if self.puzzle.is_locked() {
      return;
    }
    let Some(word) = self.current_word() else { return };
    for &pos in word.zone.positions() {
      if let Some(cell) = self.puzzle.cell_at_mut(pos) {
        if !cell.is_correct() {
          cell.response = cell.solution.clone();
          cell.cheated = true;
        }
      }
    }
    let current = self.current_word();
    self.notify(BoardChange {
      whole_board: false,
      current_word: current,
      previous_word: Some(word),
    });
  }

  pub fn move_up(&mut self) {
    self.physical_move(|b, pos| b.next_up_neighbor(pos));
  }

  pub fn move_down(&mut self) {
    self.physical_move(|b, pos| b.next_down_neighbor(pos));
  }

  pub fn move_left(&mut self) {
    self.physical_move(|b, pos| b.next_left_neighbor(pos));
  }

  pub fn move_right(&mut self) {
    self.physical_move(|b, pos| b.next_right_neighbor(pos));
  }

  /// One physical grid step, skipping absent cells, stopping at the edge.
  /// Repeated moves past the edge are no-ops, not errors.
  fn physical_move(&mut self, step: impl Fn(&Self, Pos) -> Option<Pos>) {
    let previous = self.current_word();
    let Some(pos) = step(self, self.puzzle.cursor()) else { return };
    self.puzzle.set_cursor(pos);
    self.adjust_list();
    let current = self.current_word();
    self.notify(BoardChange { whole_board: false, current_word: current, previous_word: previous });
  }

  /// The next present cell above `pos`, if any.
  fn next_up_neighbor(&self, (mut row, col): Pos) -> Option<Pos> {
    while row > 0 {
      row -= 1;
      if self.puzzle.cell_at((row, col)).is_some() {
        return Some((row, col));
      }
    }
    None
  }

  fn next_down_neighbor(&self, (mut row, col): Pos) -> Option<Pos> {
    while row + 1 < self.puzzle.height() {
      row += 1;
      if self.puzzle.cell_at((row, col)).is_some() {
        return Some((row, col));
      }
    }
    None
  }

  fn next_left_neighbor(&self, (row, mut col): Pos) -> Option<Pos> {
    while col > 0 {
      col -= 1;
      if self.puzzle.cell_at((row, col)).is_some() {
        return Some((row, col));
      }
    }
    None
  }

  fn next_right_neighbor(&self, (row, mut col): Pos) -> Option<Pos> {
    while col + 1 < self.puzzle.width() {
      col += 1;
      if self.puzzle.cell_at((row, col)).is_some() {
        return Some((row, col));
      }
    }
    None
  }

  /// Swaps the direction between the lists that have a valid word through
  /// the cursor. A no-op when only one list has a word there.
  pub fn toggle_selection(&mut self) {
    let pos = self.puzzle.cursor();
    let previous = self.current_word();

    let mut lists: Vec<String> = Vec::new();
    for id in self.puzzle.clues_at(pos) {
      if !lists.iter().any(|l| l == id.list()) {
        lists.push(id.list().to_string());
      }
    }
    if lists.len() < 2 {
      return;
    }

    let current = self.puzzle.current_list().to_string();
    let next = match lists.iter().position(|l| *l == current) {
      Some(i) => lists[(i + 1) % lists.len()].clone(),
      None => lists[0].clone(),
    };
    self.puzzle.set_current_list(next);

    let current = self.current_word();
    self.notify(BoardChange { whole_board: false, current_word: current, previous_word: previous });
  }

  /// Sets the cursor to `pos`; with a clue id, also sets the word context
  /// to that clue (a click may land in a pinned clue's projection rather
  /// than the main grid). Returns the previously current word so a
  /// listener can diff old and new highlighted regions.
  pub fn set_highlight_letter(&mut self, pos: Pos, clue_id: Option<&ClueId>) -> Option<Word> {
    let previous = self.current_word();
    if self.puzzle.cell_at(pos).is_none() {
      return previous;
    }
    self.puzzle.set_cursor(pos);
    match clue_id {
      Some(id) if self.puzzle.clue_for(id).is_some() => {
        self.puzzle.set_current_list(id.list().to_string());
      }
      _ => self.adjust_list(),
    }
    if let Some(id) = self.current_clue_id() {
      self.puzzle.push_history(id);
    }
    let current = self.current_word();
    self.notify(BoardChange {
      whole_board: false,
      current_word: current,
      previous_word: previous.clone(),
    });
    previous
  }

  /// Appends to the visit history unless the clue is already the most
  /// recent entry.
  pub fn update_history(&mut self, id: ClueId) {
    self.puzzle.push_history(id);
  }

  /// When the current list has no word through the cursor, switch to the
  /// first list that does.
  fn adjust_list(&mut self) {
    let pos = self.puzzle.cursor();
    if self.word_through(pos, self.puzzle.current_list()).is_some() {
      return;
    }
    if let Some(id) = self.puzzle.clues_at(pos).into_iter().next() {
      self.puzzle.set_current_list(id.list().to_string());
    }
  }

  /// Moves the cursor after a letter was played.
  ///
  /// With `skip_completed_letters`, already-filled cells ahead are passed
  /// over, but never past the end of the strategy's target: if every
  /// reachable cell ahead is full, the cursor stays where it is.
  fn advance_cursor(&mut self) {
    let candidates = self.advance_candidates();
    let next = if self.skip_completed_letters {
      candidates
        .iter()
        .find(|c| self.puzzle.cell_at(c.pos).is_some_and(|cell| !cell.has_response()))
        .cloned()
    } else {
      candidates.first().cloned()
    };
    if let Some(candidate) = next {
      self.puzzle.set_cursor(candidate.pos);
      match candidate.list {
        Some(list) => self.puzzle.set_current_list(list),
        None => self.adjust_list(),
      }
    }
  }

  /// The ordered, bounded sequence of positions the strategy would visit
  /// after the cursor. A candidate carries a list name when landing on it
  /// moves the word context into another clue list.
  fn advance_candidates(&self) -> Vec<Candidate> {
    let pos = self.puzzle.cursor();
    let word = self.current_word();

    match self.strategy {
      MovementStrategy::NextOnAxis => self.axis_candidates(pos, &word),
      MovementStrategy::WrapCurrentWord => {
        let Some(word) = word else { return Vec::new() };
        let zone = word.zone.positions();
        let Some(at) = word.zone.index_of(pos) else { return Vec::new() };
        // One full loop around the word, excluding the cursor itself.
        (1..zone.len())
          .map(|i| Candidate { pos: zone[(at + i) % zone.len()], list: None })
          .collect()
      }
      MovementStrategy::NextClue => self.next_clue_candidates(pos, &word),
      MovementStrategy::ParallelClue => {
        let Some(word) = word else { return Vec::new() };
        let list = self.puzzle.list(word.clue_id.list());
        let Some(list) = list else { return Vec::new() };
        let Some(next) = list.next_zoned(word.clue_id.index(), true) else {
          return Vec::new();
        };
        let Some(clue) = list.get(next) else { return Vec::new() };
        let offset = word.zone.index_of(pos).unwrap_or(0);
        let zone = clue.zone.positions();
        if zone.is_empty() {
          return Vec::new();
        }
        vec![Candidate {
          pos: zone[offset.min(zone.len() - 1)],
          list: Some(word.clue_id.list().to_string()),
        }]
      }
    }
  }

  /// Successive positions along the current axis up to the grid edge. For
  /// a non-axis list (an arbitrary-zone extra list), the remainder of the
  /// zone stands in for the axis.
  fn axis_candidates(&self, pos: Pos, word: &Option<Word>) -> Vec<Candidate> {
    let step: Option<fn(&Self, Pos) -> Option<Pos>> = match self.puzzle.current_list() {
      ACROSS => Some(Self::next_right_neighbor),
      DOWN => Some(Self::next_down_neighbor),
      _ => None,
    };

    match step {
      Some(step) => {
        let mut out = Vec::new();
        let mut at = pos;
        while let Some(next) = step(self, at) {
          out.push(Candidate { pos: next, list: None });
          at = next;
        }
        out
      }
      None => match word {
        Some(word) => match word.zone.index_of(pos) {
          Some(at) => word.zone.positions()[at + 1..]
            .iter()
            .map(|&p| Candidate { pos: p, list: None })
            .collect(),
          None => Vec::new(),
        },
        None => Vec::new(),
      },
    }
  }

  /// The rest of the current word, then every later clue's zone in global
  /// order, wrapping across the whole puzzle once.
  fn next_clue_candidates(&self, pos: Pos, word: &Option<Word>) -> Vec<Candidate> {
    let mut out = Vec::new();

    let order: Vec<ClueId> = self
      .puzzle
      .lists()
      .flat_map(|list| {
        list
          .zoned()
          .into_iter()
          .map(|i| ClueId::new(list.name(), i))
          .collect::<Vec<_>>()
      })
      .collect();
    if order.is_empty() {
      return out;
    }

    let start = match word {
      Some(word) => {
        if let Some(at) = word.zone.index_of(pos) {
          out.extend(
            word.zone.positions()[at + 1..]
              .iter()
              .map(|&p| Candidate { pos: p, list: None }),
          );
        }
        order.iter().position(|id| *id == word.clue_id).unwrap_or(0)
      }
      None => 0,
    };

    for i in 1..=order.len() {
      let id = &order[(start + i) % order.len()];
      if let Some(clue) = self.puzzle.clue_for(id) {
        out.extend(clue.zone.positions().iter().map(|&p| Candidate {
          pos: p,
          list: Some(id.list().to_string()),
        }));
      }
    }
    out
  }

  /// One step backward along the current axis (left for across, up for
  /// down, zone predecessor for other lists). Stops at the edge.
  fn retreat_cursor(&mut self) {
    let pos = self.puzzle.cursor();
    let prev = match self.puzzle.current_list() {
      ACROSS => self.next_left_neighbor(pos),
      DOWN => self.next_up_neighbor(pos),
      _ => self.current_word().and_then(|word| {
        let at = word.zone.index_of(pos)?;
        at.checked_sub(1).map(|i| word.zone.positions()[i])
      }),
    };
    if let Some(prev) = prev {
      self.puzzle.set_cursor(prev);
    }
  }
}
