//! The legacy solution lock: a reversible transform over the solution
//! letters keyed by a short numeric code, historically used to withhold
//! answers until unlock.
//!
//! The transform follows the public documentation of the binary
//! crossword-exchange format. The working string is the column-major
//! sequence of solution letters over present cells only. For each digit k
//! of the four-digit key, in order: every letter is caesar-shifted by the
//! key digits applied cyclically, the string is rotated left by k, and the
//! two halves are interleaved. Unscrambling applies the inverses in reverse
//! order. The checksum stored with a locked puzzle is the region checksum
//! of the *unscrambled* letters, so a candidate key can be verified without
//! knowing the answers.

use crate::errors::ReadError;
use crate::io::checksum::checksum_region;
use crate::puzzle::{Pos, Puzzle};
use log::debug;

/// Inclusive bounds of the key space. Real keys use digits 1–9 only.
const KEY_MIN: u16 = 1000;
const KEY_MAX: u16 = 9999;

fn key_digits(key: u16) -> [u8; 4] {
  [
    ((key / 1000) % 10) as u8,
    ((key / 100) % 10) as u8,
    ((key / 10) % 10) as u8,
    (key % 10) as u8,
  ]
}

/// Present-cell positions in column-major order, the traversal the lock
/// transform is defined over.
fn column_major_cells(puzzle: &Puzzle) -> Vec<Pos> {
  let mut cells = Vec::new();
  for col in 0..puzzle.width() {
    for row in 0..puzzle.height() {
      if puzzle.cell_at((row, col)).is_some() {
        cells.push((row, col));
      }
    }
  }
  cells
}

/// The solution letters at `cells`, which must all be single characters
/// A–Z — the transform is not defined for anything else.
fn solution_letters(puzzle: &Puzzle, cells: &[Pos]) -> Result<Vec<u8>, ReadError> {
  let mut letters = Vec::with_capacity(cells.len());
  for &pos in cells {
    let Some(cell) = puzzle.cell_at(pos) else { continue };
    match cell.solution_char() {
      Some(ch) if cell.solution.len() == 1 && ch.is_ascii_uppercase() => {
        letters.push(ch as u8);
      }
      _ => {
        return Err(ReadError::StructuralCorruption(format!(
          "cell ({}, {}) solution {:?} cannot take part in scrambling",
          pos.0, pos.1, cell.solution
        )));
      }
    }
  }
  if letters.is_empty() {
    return Err(ReadError::StructuralCorruption(
      "no letters to scramble".to_string(),
    ));
  }
  Ok(letters)
}

fn shift(letters: &mut [u8], digits: [u8; 4]) {
  for (i, letter) in letters.iter_mut().enumerate() {
    let offset = (*letter - b'A' + digits[i % 4]) % 26;
    *letter = b'A' + offset;
  }
}

fn unshift(letters: &mut [u8], digits: [u8; 4]) {
  for (i, letter) in letters.iter_mut().enumerate() {
    let offset = (*letter - b'A' + 26 - digits[i % 4] % 26) % 26;
    *letter = b'A' + offset;
  }
}

/// Interleaves the two halves: back half first, one from each in turn.
fn shuffle(letters: &[u8]) -> Vec<u8> {
  let mid = letters.len() / 2;
  let mut out = Vec::with_capacity(letters.len());
  for i in 0..mid {
    out.push(letters[mid + i]);
    out.push(letters[i]);
  }
  if letters.len() % 2 != 0 {
    out.push(letters[letters.len() - 1]);
  }
  out
}

/// Inverse of [shuffle]: odd positions, then even positions.
fn unshuffle(letters: &[u8]) -> Vec<u8> {
  let mut out = Vec::with_capacity(letters.len());
  out.extend(letters.iter().skip(1).step_by(2));
  out.extend(letters.iter().step_by(2));
  out
}

fn scramble_letters(mut letters: Vec<u8>, key: u16) -> Vec<u8> {
  let digits = key_digits(key);
  for &k in &digits {
    shift(&mut letters, digits);
    let cut = k as usize % letters.len();
    letters.rotate_left(cut);
    letters = shuffle(&letters);
  }
  letters
}

fn unscramble_letters(mut letters: Vec<u8>, key: u16) -> Vec<u8> {
  let digits = key_digits(key);
  for &k in digits.iter().rev() {
    letters = unshuffle(&letters);
    let cut = k as usize % letters.len();
    letters.rotate_right(cut);
    unshift(&mut letters, digits);
  }
  letters
}

fn apply_letters(puzzle: &mut Puzzle, cells: &[Pos], letters: &[u8]) {
  for (&pos, &letter) in cells.iter().zip(letters) {
    if let Some(cell) = puzzle.cell_at_mut(pos) {
      cell.solution = (letter as char).to_string();
    }
  }
}

/// Locks the puzzle's solution under `key`, recording the checksum a
/// future unlock will be verified against. Key digits must all be 1–9.
pub fn scramble(puzzle: &mut Puzzle, key: u16) -> Result<(), ReadError> {
  if puzzle.is_locked() {
    return Err(ReadError::StructuralCorruption(
      "solution is already scrambled".to_string(),
    ));
  }
  if !(KEY_MIN..=KEY_MAX).contains(&key) || key_digits(key).contains(&0) {
    return Err(ReadError::StructuralCorruption(format!(
      "scramble keys are four digits 1-9, got {key}"
    )));
  }

  let cells = column_major_cells(puzzle);
  let letters = solution_letters(puzzle, &cells)?;
  let checksum = checksum_region(&letters, 0);
  let scrambled = scramble_letters(letters, key);
  apply_letters(puzzle, &cells, &scrambled);
  puzzle.set_scrambled_checksum(Some(checksum));
  Ok(())
}

/// Attempts to unlock the solution with a user-supplied candidate key.
///
/// All-or-nothing: on a checksum mismatch the solutions are left untouched
/// and [ReadError::DescrambleFailure] is returned. Unlocking an already
/// unlocked puzzle is a no-op.
pub fn try_unscramble(puzzle: &mut Puzzle, key: u16) -> Result<(), ReadError> {
  let Some(expected) = puzzle.scrambled_checksum() else {
    return Ok(());
  };

  let cells = column_major_cells(puzzle);
  let letters = solution_letters(puzzle, &cells)?;
  let candidate = unscramble_letters(letters, key);
  if checksum_region(&candidate, 0) != expected {
    return Err(ReadError::DescrambleFailure);
  }

  debug!("unscrambled solution with key {key}");
  apply_letters(puzzle, &cells, &candidate);
  puzzle.set_scrambled_checksum(None);
  Ok(())
}

/// Tries every key in the fixed keyspace until one produces a matching
/// checksum. Reports the winning key, or [ReadError::DescrambleFailure]
/// with the grid untouched when none matches.
pub fn brute_force_unscramble(puzzle: &mut Puzzle) -> Result<u16, ReadError> {
  let Some(expected) = puzzle.scrambled_checksum() else {
    return Err(ReadError::DescrambleFailure);
  };

  let cells = column_major_cells(puzzle);
  let letters = solution_letters(puzzle, &cells)?;

  for key in KEY_MIN..=KEY_MAX {
    if key_digits(key).contains(&0) {
      continue;
    }
    let candidate = unscramble_letters(letters.clone(), key);
    if checksum_region(&candidate, 0) == expected {
      debug!("brute force found key {key}");
      apply_letters(puzzle, &cells, &candidate);
      puzzle.set_scrambled_checksum(None);
      return Ok(key);
    }
  }
  Err(ReadError::DescrambleFailure)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::puzzle::{ACROSS, Cell, DOWN, Zone};

  fn lockable_puzzle() -> Puzzle {
    let mut p = Puzzle::new(3, 3);
    let letters = ["C", "A", "T", "O", "R", "E", "W", "E", "D"];
    for (i, letter) in letters.iter().enumerate() {
      p.set_cell((i / 3, i % 3), Cell::new(*letter));
    }
    for row in 0..3 {
      p.add_clue(ACROSS, None, "across", Zone::across_run((row, 0), 3));
    }
    for col in 0..3 {
      p.add_clue(DOWN, None, "down", Zone::down_run((0, col), 3));
    }
    p.index_zones().unwrap();
    p.number_clues_by_position();
    p
  }

  fn solutions(p: &Puzzle) -> Vec<String> {
    p.positions()
      .filter_map(|pos| p.cell_at(pos).map(|c| c.solution.clone()))
      .collect()
  }

  #[test]
  fn shuffle_round_trips() {
    for s in [b"ABCD".to_vec(), b"ABCDE".to_vec(), b"AB".to_vec()] {
      assert_eq!(unshuffle(&shuffle(&s)), s);
    }
  }

  #[test]
  fn shift_round_trips() {
    let digits = key_digits(9364);
    let mut letters = b"HELLOWORLDXYZ".to_vec();
    let original = letters.clone();
    shift(&mut letters, digits);
    assert_ne!(letters, original);
    unshift(&mut letters, digits);
    assert_eq!(letters, original);
  }

  #[test]
  fn correct_key_unlocks() {
    let mut p = lockable_puzzle();
    let original = solutions(&p);

    scramble(&mut p, 4321).unwrap();
    assert!(p.is_locked());
    assert_ne!(solutions(&p), original);

    try_unscramble(&mut p, 4321).unwrap();
    assert!(!p.is_locked());
    assert_eq!(solutions(&p), original);
  }

  #[test]
  fn wrong_key_leaves_grid_untouched() {
    let mut p = lockable_puzzle();
    scramble(&mut p, 4321).unwrap();
    let scrambled = solutions(&p);

    let result = try_unscramble(&mut p, 1234);
    assert!(matches!(result, Err(ReadError::DescrambleFailure)));
    assert!(p.is_locked());
    assert_eq!(solutions(&p), scrambled);
  }

  #[test]
  fn brute_force_finds_a_matching_key() {
    let mut p = lockable_puzzle();
    let expected = checksum_region(
      &solution_letters(&p, &column_major_cells(&p)).unwrap(),
      0,
    );
    scramble(&mut p, 8642).unwrap();

    brute_force_unscramble(&mut p).unwrap();
    assert!(!p.is_locked());
    let unlocked = checksum_region(
      &solution_letters(&p, &column_major_cells(&p)).unwrap(),
      0,
    );
    assert_eq!(unlocked, expected);
  }

  #[test]
  fn invalid_keys_are_rejected() {
    let mut p = lockable_puzzle();
    assert!(scramble(&mut p, 999).is_err());
    assert!(scramble(&mut p, 1077).is_err());
    assert!(!p.is_locked());
  }

  #[test]
  fn rebus_solutions_cannot_be_locked() {
    let mut p = lockable_puzzle();
    p.cell_at_mut((0, 0)).unwrap().solution = "REBUS".into();
    assert!(matches!(
      scramble(&mut p, 4321),
      Err(ReadError::StructuralCorruption(_))
    ));
  }
}
