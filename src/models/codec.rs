//! Record codec: a YAML metadata block between `---` marker lines, a blank
//! separator line, then the body verbatim.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::models::Snippet;

pub const RECORD_DELIMITER: &str = "---";

/// Statically typed metadata block. Unknown fields are rejected, missing ones
/// take their zero value.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Frontmatter<'a> {
    id: Cow<'a, str>,
    title: Cow<'a, str>,
    #[serde(deserialize_with = "null_as_default")]
    tags: Cow<'a, [String]>,
    #[serde(deserialize_with = "null_as_default")]
    language: Cow<'a, str>,
    is_favorite: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'a> Frontmatter<'a> {
    fn borrowed(snippet: &'a Snippet) -> Self {
        Self {
            id: Cow::Borrowed(&snippet.id),
            title: Cow::Borrowed(&snippet.title),
            tags: Cow::Borrowed(&snippet.tags),
            language: Cow::Borrowed(&snippet.language),
            is_favorite: snippet.is_favorite,
            created_at: snippet.created_at,
            updated_at: snippet.updated_at,
        }
    }

    fn into_snippet(self, body: String) -> Snippet {
        Snippet {
            id: self.id.into_owned(),
            title: self.title.into_owned(),
            tags: self.tags.into_owned(),
            language: self.language.into_owned(),
            is_favorite: self.is_favorite,
            created_at: self.created_at,
            updated_at: self.updated_at,
            body,
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end() == RECORD_DELIMITER
}

/// Parses a record into a snippet. Does not validate the result.
pub fn decode(text: &str) -> StoreResult<Snippet> {
    let mut lines = text.split_inclusive('\n');

    let first = match lines.next() {
        Some(line) if is_delimiter(line) => line,
        _ => {
            return Err(StoreError::MalformedRecord(format!(
                "record does not start with `{}`",
                RECORD_DELIMITER
            )));
        }
    };

    let meta_start = first.len();
    let mut cursor = meta_start;
    let mut block_end = None;
    for line in lines {
        if is_delimiter(line) {
            block_end = Some((cursor, cursor + line.len()));
            break;
        }
        cursor += line.len();
    }
    let (meta_end, body_start) = block_end.ok_or(StoreError::UnterminatedRecord)?;

    let metadata = &text[meta_start..meta_end];
    let frontmatter: Frontmatter<'static> = if metadata.trim().is_empty() {
        Frontmatter::default()
    } else {
        serde_yaml::from_str(metadata).map_err(StoreError::MetadataParse)?
    };

    let rest = &text[body_start..];
    let body = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    Ok(frontmatter.into_snippet(body.to_string()))
}

/// Like [`decode`], for raw file contents.
pub fn decode_bytes(bytes: &[u8]) -> StoreResult<Snippet> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| StoreError::MalformedRecord(format!("record is not valid UTF-8: {}", e)))?;
    decode(text)
}

/// Serializes a valid snippet into its record text.
pub fn encode(snippet: &Snippet) -> StoreResult<String> {
    snippet.validate()?;

    let metadata = serde_yaml::to_string(&Frontmatter::borrowed(snippet))
        .map_err(StoreError::MetadataEncode)?;

    let mut out = String::with_capacity(metadata.len() + snippet.body.len() + 16);
    out.push_str(RECORD_DELIMITER);
    out.push('\n');
    out.push_str(&metadata);
    if !metadata.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(RECORD_DELIMITER);
    out.push_str("\n\n");
    out.push_str(&snippet.body);
    Ok(out)
}
