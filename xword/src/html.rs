//! The HTML subset used by text fields in the interchange formats.
//!
//! Clue hints and metadata sometimes arrive with inline markup. Only a
//! line-break tag survives decoding (as `\n`); all other markup is stripped
//! to plain text with entities unescaped. Encoding is symmetric, so
//! `decode(encode(s)) == s` for any plain string `s`.

use quick_xml::escape::{escape, unescape};
use std::borrow::Cow;

/// Strips an HTML-subset string down to plain text.
///
/// `<br>` (in any of its spellings) becomes `\n`, every other tag is
/// dropped, and entities are unescaped. A stray `&` that does not form a
/// valid entity is kept as-is.
pub fn decode(html: &str) -> String {
  let mut text = String::with_capacity(html.len());
  let mut rest = html;

  while let Some(lt) = rest.find('<') {
    text.push_str(&rest[..lt]);
    match rest[lt..].find('>') {
      Some(gt) => {
        let tag = &rest[lt + 1..lt + gt];
        if is_line_break(tag) {
          text.push('\n');
        }
        rest = &rest[lt + gt + 1..];
      }
      None => {
        // Unterminated tag; treat the rest as literal text.
        text.push_str(&rest[lt..]);
        rest = "";
      }
    }
  }
  text.push_str(rest);

  match unescape(&text) {
    Ok(unescaped) => unescaped.into_owned(),
    Err(_) => text,
  }
}

/// Re-encodes plain text for an HTML-subset field: entities are escaped
/// and `\n` becomes `<br />`.
pub fn encode(plain: &str) -> String {
  let escaped: Cow<str> = escape(plain);
  escaped.replace('\n', "<br />")
}

/// Whether the inside of a tag is some spelling of a line break:
/// `br`, `br/`, `br /`, `BR`, or a closing `/br`.
fn is_line_break(tag: &str) -> bool {
  let t = tag.trim().trim_start_matches('/').trim_end_matches('/').trim();
  t.eq_ignore_ascii_case("br")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn strips_markup_and_keeps_breaks() {
    assert_eq!(decode("<b>Bold</b> move"), "Bold move");
    assert_eq!(decode("line one<br>line two"), "line one\nline two");
    assert_eq!(decode("line one<br />line two"), "line one\nline two");
    assert_eq!(decode("line one<BR/>line two"), "line one\nline two");
    assert_eq!(decode("<i>1 + 1 &lt; 3</i>"), "1 + 1 < 3");
  }

  #[test]
  fn unterminated_tag_is_literal() {
    assert_eq!(decode("3 < 5"), "3 < 5");
  }

  #[test]
  fn encode_decode_round_trip() {
    for s in ["plain", "two\nlines", "a & b < c", "tag <br> inside"] {
      assert_eq!(decode(&encode(s)), s);
    }
  }
}
