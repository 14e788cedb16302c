use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A catalog entry, keyed by ISBN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Book {
    /// Primary key, supplied by the client at creation time
    pub isbn: String,
    pub amazon_url: String,
    pub author: String,
    pub language: String,
    pub pages: i64,
    pub publisher: String,
    pub title: String,
    pub year: i64,
}

/// Payload for creating a book. All fields, including the key.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBook {
    pub isbn: String,
    pub amazon_url: String,
    pub author: String,
    pub language: String,
    pub pages: i64,
    pub publisher: String,
    pub title: String,
    pub year: i64,
}

/// Payload for updating a book. Every mutable field must be resupplied;
/// the key travels in the path and never in the body.
#[derive(Debug, Clone, Deserialize)]
pub struct BookChanges {
    pub amazon_url: String,
    pub author: String,
    pub language: String,
    pub pages: i64,
    pub publisher: String,
    pub title: String,
    pub year: i64,
}

/// Equality filter for listing books. Only entity fields are accepted;
/// anything else is rejected at query deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BookFilter {
    pub isbn: Option<String>,
    pub amazon_url: Option<String>,
    pub author: Option<String>,
    pub language: Option<String>,
    pub pages: Option<i64>,
    pub publisher: Option<String>,
    pub title: Option<String>,
    pub year: Option<i64>,
}
