use crate::prelude::*;

/// Telegram refuses messages longer than this.
pub const MESSAGE_LIMIT: usize = 4096;

/// `October 19, 2026`
pub fn format_long_date(date: NaiveDate) -> String {
  date.format("%B %-d, %Y").to_string()
}

/// `2026-10-19`
pub fn format_short_date(date: NaiveDate) -> String {
  date.format("%Y-%m-%d").to_string()
}

pub fn parse_date(input: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
    Error::InvalidArgs(format!("Invalid date '{}', expected YYYY-MM-DD", input))
  })
}

pub fn plural(count: usize, word: &str) -> String {
  if count == 1 { format!("{count} {word}") } else { format!("{count} {word}s") }
}

/// Split text on line boundaries into chunks of at most `limit` bytes
/// (`0` means [`MESSAGE_LIMIT`]). Never returns an empty list.
pub fn chunk_message(text: &str, limit: usize) -> Vec<String> {
  let limit = if limit == 0 { MESSAGE_LIMIT } else { limit };
  let mut chunks = Vec::new();
  let mut current = String::new();

  for line in text.split_inclusive('\n') {
    if !current.is_empty() && current.len() + line.len() > limit {
      chunks.push(std::mem::take(&mut current));
    }

    if line.len() > limit {
      // a single oversized line gets hard-split on char boundaries
      let mut rest = line;
      while rest.len() > limit {
        let mut cut = limit;
        while !rest.is_char_boundary(cut) {
          cut -= 1;
        }
        chunks.push(rest[..cut].to_string());
        rest = &rest[cut..];
      }
      current.push_str(rest);
    } else {
      current.push_str(line);
    }
  }

  if !current.is_empty() || chunks.is_empty() {
    chunks.push(current);
  }
  chunks
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_dates() {
    let date = NaiveDate::from_ymd_opt(2026, 10, 9).unwrap();
    assert_eq!(format_long_date(date), "October 9, 2026");
    assert_eq!(format_short_date(date), "2026-10-09");
    assert_eq!(parse_date(" 2026-10-09 ").unwrap(), date);
    assert!(parse_date("09.10.2026").is_err());
  }

  #[test]
  fn test_chunk_message() {
    assert_eq!(chunk_message("", 0), vec![String::new()]);
    assert_eq!(chunk_message("a\nb\n", 0), vec!["a\nb\n".to_string()]);

    let chunks = chunk_message("aaaa\nbbbb\ncc", 6);
    assert_eq!(chunks, vec!["aaaa\n", "bbbb\n", "cc"]);

    let chunks = chunk_message("abcdefgh", 3);
    assert_eq!(chunks, vec!["abc", "def", "gh"]);
  }

  #[test]
  fn test_plural() {
    assert_eq!(plural(1, "Image"), "1 Image");
    assert_eq!(plural(3, "Image"), "3 Images");
  }
}
