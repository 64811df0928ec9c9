//! This crate is meant to be used as the foundation for a crossword puzzle app.
//! It provides no UI itself: it gives you the puzzle model, a solving-session
//! engine, and codecs for the common puzzle file formats.
//!
//! Load a puzzle with [io::read_any] (or a specific reader under [io] if you
//! already know the format), wrap it in a [Board] to drive a solving session,
//! and save play state with the [io::meta] streams or the interchange JSON
//! writer.

pub mod board;
pub mod errors;
pub mod html;
pub mod io;
pub mod puzzle;

pub use board::{Board, BoardChange, BoardListener, ListenerToken, MovementStrategy, Word};
pub use errors::ReadError;
pub use puzzle::{ACROSS, Cell, Clue, ClueId, ClueList, DOWN, Note, Puzzle, Zone};
