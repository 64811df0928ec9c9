use std::env;
use std::fs;
use xword::io;
use xword::{Puzzle, ReadError};

fn parse_file(path: &str) -> Result<Puzzle, ReadError> {
  let data = fs::read(path)?;
  io::read_any(&data)
}

/// A simple CLI for testing format detection and parsing
fn main() -> Result<(), ReadError> {
  let args: Vec<String> = env::args().collect();

  let path = &args[1];
  if fs::metadata(path)?.is_dir() {
    let mut success = 0;
    let mut failure = 0;

    for entry in fs::read_dir(path)? {
      let puzzle_path = entry?.path();
      if let Some(p) = puzzle_path.to_str() {
        match parse_file(p) {
          Ok(puzzle) => {
            println!("Parsed '{}' successfully from {}", puzzle.meta.title, p);
            success += 1;
          }
          Err(e) => {
            println!("Failed with {e:?} from {p}");
            failure += 1;
          }
        }
      }
    }
    dbg!(success, failure);
  } else {
    match parse_file(path) {
      Ok(puzzle) => {
        println!("Parsed '{}' by '{}'", puzzle.meta.title, puzzle.meta.author);
        print!("{puzzle}");
      }
      Err(e) => {
        println!("Failed with: {e:?}");
      }
    }
  }

  Ok(())
}
