use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

/// Characters that are unsafe in file names on at least one platform, plus spaces.
static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[/\\:*?"<>| ]"#).expect("valid filename regex"));

const PREVIEW_WIDTH: usize = 100;
/// Longest sanitized title, in bytes, that goes into a file name.
const MAX_FILE_TITLE_BYTES: usize = 100;

/// A stored snippet: structured metadata plus a free-text body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Snippet {
    pub id: String,
    pub title: String,
    pub tags: Vec<String>,
    /// Empty means unset.
    pub language: String,
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Not part of the metadata block; stored as the remainder of the file.
    pub body: String,
}

impl Snippet {
    /// Creates a snippet with a fresh id, both timestamps set to now, and no tags or body.
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7().to_string(),
            title: title.into(),
            tags: Vec::new(),
            language: String::new(),
            is_favorite: false,
            created_at: now,
            updated_at: now,
            body: String::new(),
        }
    }

    pub fn with_body(title: impl Into<String>, body: impl Into<String>) -> Self {
        let mut snippet = Self::new(title);
        snippet.body = body.into();
        snippet
    }

    /// Checks the fields required before a snippet may be persisted or indexed.
    pub fn validate(&self) -> StoreResult<()> {
        if self.id.is_empty() {
            return Err(StoreError::Validation {
                field: "id",
                reason: "ID cannot be empty",
            });
        }
        if self.title.is_empty() {
            return Err(StoreError::Validation {
                field: "title",
                reason: "Title cannot be empty",
            });
        }
        Ok(())
    }

    /// Refreshes `updated_at`. Never moves it before `created_at`.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.created_at);
    }

    /// `<sanitized-title>_<YYYYMMDD_HHMMSS>` from the title and `updated_at`.
    pub fn file_stem(&self) -> String {
        format!(
            "{}_{}",
            sanitize_title(&self.title),
            self.updated_at.format("%Y%m%d_%H%M%S")
        )
    }

    /// File name for this snippet's record.
    ///
    /// Informational only: lookups always go through the id stored inside the record.
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.file_stem(), extension)
    }

    /// Case-insensitive exact tag membership.
    pub fn has_tag(&self, tag: &str) -> bool {
        let wanted = tag.to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase() == wanted)
    }

    /// First line of the body, shortened for one-line listings.
    pub fn preview(&self) -> String {
        let first = self.body.lines().next().unwrap_or_default();
        if first.chars().count() > PREVIEW_WIDTH {
            let cut: String = first.chars().take(PREVIEW_WIDTH).collect();
            format!("{}...", cut)
        } else {
            first.to_string()
        }
    }
}

/// Replaces every filesystem-unsafe character (and spaces) with an underscore,
/// cut to at most 100 bytes on a character boundary.
pub fn sanitize_title(title: &str) -> String {
    let mut sanitized = UNSAFE_FILENAME_CHARS.replace_all(title, "_").into_owned();
    if sanitized.len() > MAX_FILE_TITLE_BYTES {
        let mut end = MAX_FILE_TITLE_BYTES;
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        sanitized.truncate(end);
    }
    sanitized
}
