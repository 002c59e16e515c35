//! Front-section + body parser.
//!
//! Pipeline:
//!   raw &str
//!     └─ split_front_section()   → (front lines, body)
//!          └─ parse_metadata_line() → (key, value)
//!               └─ assign_field()    → accumulate Frontmatter
//!
//! Tolerates CRLF line endings and a leading UTF-8 BOM for real-world
//! robustness. A file with no opening `---` fence is all body.

use chrono::{DateTime, NaiveDate, Utc};
use labnote_core::{frontmatter::Frontmatter, note::NoteStatus};

use crate::error::{Error, Result};

/// The result of parsing one note file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
  pub frontmatter: Frontmatter,
  pub body:        String,
}

/// Parse a note file into structured frontmatter and the raw body.
pub fn parse_note_file(text: &str) -> Result<ParsedDocument> {
  let text = text.strip_prefix('\u{feff}').unwrap_or(text);

  let Some((front_lines, body)) = split_front_section(text)? else {
    return Ok(ParsedDocument {
      frontmatter: Frontmatter::default(),
      body:        text.to_string(),
    });
  };

  let mut frontmatter = Frontmatter::default();
  for (line_no, line) in front_lines {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
      continue;
    }
    let (key, value) = parse_metadata_line(line_no, trimmed)?;
    if value.is_empty() {
      continue;
    }
    assign_field(&mut frontmatter, key, value)?;
  }

  Ok(ParsedDocument { frontmatter, body })
}

// ─── Front-section extraction ────────────────────────────────────────────────

type FrontLines<'a> = Vec<(usize, &'a str)>;

/// If the file opens with a `---` fence, return its metadata lines (with
/// 1-based line numbers) and the body after the closing fence. `Ok(None)`
/// means the file has no front section at all.
fn split_front_section(text: &str) -> Result<Option<(FrontLines<'_>, String)>> {
  let mut lines = text.split('\n');
  let Some(first) = lines.next() else {
    return Ok(None);
  };
  if !is_fence(first) {
    return Ok(None);
  }

  let mut front = Vec::new();
  let mut offset = first.len() + 1;
  for (i, raw) in lines.enumerate() {
    if is_fence(raw) {
      let body_start = offset + raw.len() + 1;
      let body = if body_start >= text.len() {
        String::new()
      } else {
        text[body_start..].to_string()
      };
      return Ok(Some((front, body)));
    }
    // line 1 is the opening fence
    front.push((i + 2, raw.strip_suffix('\r').unwrap_or(raw)));
    offset += raw.len() + 1;
  }

  Err(Error::UnterminatedFrontSection)
}

fn is_fence(line: &str) -> bool {
  line.strip_suffix('\r').unwrap_or(line).trim_end() == "---"
}

// ─── Metadata lines ──────────────────────────────────────────────────────────

fn parse_metadata_line(line_no: usize, line: &str) -> Result<(&str, &str)> {
  let Some(colon) = line.find(':') else {
    return Err(Error::MalformedLine {
      line: line_no,
      text: line.to_string(),
    });
  };
  let key = line[..colon].trim();
  let value = line[colon + 1..].trim();
  if key.is_empty() {
    return Err(Error::MalformedLine {
      line: line_no,
      text: line.to_string(),
    });
  }
  Ok((key, value))
}

fn assign_field(fm: &mut Frontmatter, key: &str, value: &str) -> Result<()> {
  match key.to_ascii_lowercase().as_str() {
    "title" => fm.title = Some(unquote(value).to_string()),
    "slug" => fm.slug = Some(unquote(value).to_string()),
    "tags" => fm.tags = parse_tag_list(value),
    "category" => fm.category = Some(unquote(value).to_string()),
    "author" => fm.author = Some(unquote(value).to_string()),
    "published_at" | "date" => {
      fm.published_at = Some(parse_timestamp(key, value)?);
    }
    "status" => fm.status = Some(parse_status(value)?),
    other => {
      fm.extra
        .insert(other.to_string(), loose_value(unquote(value)));
    }
  }
  Ok(())
}

/// `[a, b]` bracket lists and bare comma lists both work.
fn parse_tag_list(value: &str) -> Vec<String> {
  let inner = value
    .strip_prefix('[')
    .and_then(|v| v.strip_suffix(']'))
    .unwrap_or(value);
  inner
    .split(',')
    .map(|t| unquote(t.trim()).to_string())
    .filter(|t| !t.is_empty())
    .collect()
}

/// RFC 3339, or a bare `YYYY-MM-DD` interpreted as midnight UTC.
fn parse_timestamp(key: &str, value: &str) -> Result<DateTime<Utc>> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
    return Ok(dt.with_timezone(&Utc));
  }
  if let Ok(date) = value.parse::<NaiveDate>()
    && let Some(dt) = date.and_hms_opt(0, 0, 0)
  {
    return Ok(dt.and_utc());
  }
  Err(Error::InvalidValue {
    key:   key.to_string(),
    value: value.to_string(),
  })
}

fn parse_status(value: &str) -> Result<NoteStatus> {
  match value.to_ascii_lowercase().as_str() {
    "draft" => Ok(NoteStatus::Draft),
    "published" => Ok(NoteStatus::Published),
    "archived" => Ok(NoteStatus::Archived),
    _ => Err(Error::InvalidValue {
      key:   "status".to_string(),
      value: value.to_string(),
    }),
  }
}

/// Unknown keys keep bool/number scalars typed; everything else is a string.
fn loose_value(value: &str) -> serde_json::Value {
  match value {
    "true" => serde_json::Value::Bool(true),
    "false" => serde_json::Value::Bool(false),
    _ => {
      if let Ok(n) = value.parse::<i64>() {
        serde_json::Value::from(n)
      } else if let Ok(f) = value.parse::<f64>() {
        serde_json::Value::from(f)
      } else {
        serde_json::Value::String(value.to_string())
      }
    }
  }
}

fn unquote(value: &str) -> &str {
  let v = value.trim();
  if v.len() >= 2
    && ((v.starts_with('"') && v.ends_with('"'))
      || (v.starts_with('\'') && v.ends_with('\'')))
  {
    &v[1..v.len() - 1]
  } else {
    v
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn full_document() {
    let doc = parse_note_file(
      "---\n\
       title: Launch Notes\n\
       slug: launch-notes\n\
       tags: [rocketry, telemetry]\n\
       category: research\n\
       author: m.ash\n\
       published_at: 2024-03-01T09:30:00Z\n\
       status: published\n\
       featured: true\n\
       ---\n\
       First paragraph.\n",
    )
    .unwrap();

    let fm = &doc.frontmatter;
    assert_eq!(fm.title.as_deref(), Some("Launch Notes"));
    assert_eq!(fm.slug.as_deref(), Some("launch-notes"));
    assert_eq!(fm.tags, ["rocketry", "telemetry"]);
    assert_eq!(fm.category.as_deref(), Some("research"));
    assert_eq!(fm.author.as_deref(), Some("m.ash"));
    assert_eq!(fm.status, Some(NoteStatus::Published));
    assert_eq!(fm.extra["featured"], serde_json::json!(true));
    assert_eq!(doc.body, "First paragraph.\n");
  }

  #[test]
  fn no_front_section_is_all_body() {
    let doc = parse_note_file("Just a body.\nTwo lines.").unwrap();
    assert!(doc.frontmatter.is_empty());
    assert_eq!(doc.body, "Just a body.\nTwo lines.");
  }

  #[test]
  fn unterminated_fence_errors() {
    let err = parse_note_file("---\ntitle: Oops\n").unwrap_err();
    assert!(matches!(err, Error::UnterminatedFrontSection));
  }

  #[test]
  fn malformed_line_reports_line_number() {
    let err =
      parse_note_file("---\ntitle: Ok\nnot a pair\n---\nbody").unwrap_err();
    assert!(matches!(err, Error::MalformedLine { line: 3, .. }));
  }

  #[test]
  fn comma_list_tags_without_brackets() {
    let doc = parse_note_file("---\ntags: a, b , c\n---\n").unwrap();
    assert_eq!(doc.frontmatter.tags, ["a", "b", "c"]);
  }

  #[test]
  fn date_only_published_at() {
    let doc = parse_note_file("---\ndate: 2023-11-05\n---\nx").unwrap();
    let dt = doc.frontmatter.published_at.unwrap();
    assert_eq!(dt.to_rfc3339(), "2023-11-05T00:00:00+00:00");
  }

  #[test]
  fn invalid_status_errors() {
    let err = parse_note_file("---\nstatus: live\n---\n").unwrap_err();
    assert!(matches!(err, Error::InvalidValue { .. }));
  }

  #[test]
  fn crlf_and_quoted_values() {
    let doc =
      parse_note_file("---\r\ntitle: \"Quoted Title\"\r\n---\r\nbody\r\n")
        .unwrap();
    assert_eq!(doc.frontmatter.title.as_deref(), Some("Quoted Title"));
    assert_eq!(doc.body, "body\r\n");
  }

  #[test]
  fn empty_values_are_skipped() {
    let doc = parse_note_file("---\ncategory:\ntitle: T\n---\n").unwrap();
    assert_eq!(doc.frontmatter.category, None);
    assert_eq!(doc.frontmatter.title.as_deref(), Some("T"));
  }

  #[test]
  fn empty_body_after_fence() {
    let doc = parse_note_file("---\ntitle: T\n---").unwrap();
    assert_eq!(doc.body, "");
  }
}
