//! Storage access for book rows.
//!
//! The repository is the sole owner of SQL against the `books` table. It
//! holds nothing but the pool, so every call is independently safe to run
//! concurrently; serialization is delegated to the storage engine.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use thiserror::Error;

use super::models::{Book, BookChanges, BookFilter, NewBook};

/// Typed failures raised at the repository boundary. Transport-agnostic;
/// mapped to status codes by the route layer.
#[derive(Error, Debug)]
pub enum RepoError {
    #[error("there is no book with isbn '{0}'")]
    NotFound(String),

    #[error("a book with isbn '{0}' already exists")]
    Duplicate(String),

    #[error("database failure: {0}")]
    Database(#[from] sqlx::Error),
}

const COLUMNS: &str = "isbn, amazon_url, author, language, pages, publisher, title, year";

/// Repository over an injected connection pool.
#[derive(Clone)]
pub struct BookRepository {
    pool: SqlitePool,
}

impl BookRepository {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Return all books, optionally narrowed by the given filter. Title
    /// filters by substring, everything else by equality. An empty result
    /// is not an error.
    pub async fn find_all(&self, filter: &BookFilter) -> Result<Vec<Book>, RepoError> {
        let mut query =
            QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM books WHERE 1 = 1"));

        if let Some(isbn) = &filter.isbn {
            query.push(" AND isbn = ").push_bind(isbn.clone());
        }
        if let Some(amazon_url) = &filter.amazon_url {
            query.push(" AND amazon_url = ").push_bind(amazon_url.clone());
        }
        if let Some(author) = &filter.author {
            query.push(" AND author = ").push_bind(author.clone());
        }
        if let Some(language) = &filter.language {
            query.push(" AND language = ").push_bind(language.clone());
        }
        if let Some(pages) = filter.pages {
            query.push(" AND pages = ").push_bind(pages);
        }
        if let Some(publisher) = &filter.publisher {
            query.push(" AND publisher = ").push_bind(publisher.clone());
        }
        if let Some(title) = &filter.title {
            query
                .push(" AND title LIKE ")
                .push_bind(format!("%{title}%"));
        }
        if let Some(year) = filter.year {
            query.push(" AND year = ").push_bind(year);
        }

        query.push(" ORDER BY title");

        let books = query
            .build_query_as::<Book>()
            .fetch_all(&self.pool)
            .await?;

        Ok(books)
    }

    /// Return the book with the given key, or `NotFound`. The primary key
    /// guarantees at most one row.
    pub async fn find_one(&self, isbn: &str) -> Result<Book, RepoError> {
        let book =
            sqlx::query_as::<_, Book>(&format!("SELECT {COLUMNS} FROM books WHERE isbn = ?"))
                .bind(isbn)
                .fetch_optional(&self.pool)
                .await?;

        book.ok_or_else(|| RepoError::NotFound(isbn.to_string()))
    }

    /// Insert a new book, mirroring back the stored row. A duplicate key is
    /// reported by the engine's uniqueness enforcement, not detected here.
    pub async fn create(&self, new_book: &NewBook) -> Result<Book, RepoError> {
        let inserted = sqlx::query_as::<_, Book>(&format!(
            "INSERT INTO books ({COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING {COLUMNS}"
        ))
        .bind(&new_book.isbn)
        .bind(&new_book.amazon_url)
        .bind(&new_book.author)
        .bind(&new_book.language)
        .bind(new_book.pages)
        .bind(&new_book.publisher)
        .bind(&new_book.title)
        .bind(new_book.year)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Duplicate(new_book.isbn.clone())
            }
            _ => RepoError::Database(err),
        })?;

        Ok(inserted)
    }

    /// Update every mutable field of the row with the given key, returning
    /// the post-update row. RETURNING makes the zero-row case observable in
    /// the same statement, so no existence pre-check is needed.
    pub async fn update(&self, isbn: &str, changes: &BookChanges) -> Result<Book, RepoError> {
        let updated = sqlx::query_as::<_, Book>(&format!(
            "UPDATE books \
             SET amazon_url = ?, author = ?, language = ?, pages = ?, \
                 publisher = ?, title = ?, year = ? \
             WHERE isbn = ? \
             RETURNING {COLUMNS}"
        ))
        .bind(&changes.amazon_url)
        .bind(&changes.author)
        .bind(&changes.language)
        .bind(changes.pages)
        .bind(&changes.publisher)
        .bind(&changes.title)
        .bind(changes.year)
        .bind(isbn)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| RepoError::NotFound(isbn.to_string()))
    }

    /// Delete the row with the given key. Zero affected rows is `NotFound`,
    /// so a repeated delete fails rather than silently succeeding.
    pub async fn remove(&self, isbn: &str) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM books WHERE isbn = ?")
            .bind(isbn)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound(isbn.to_string()));
        }

        Ok(())
    }
}
