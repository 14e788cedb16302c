pub mod models;
pub mod repository;
pub mod routes;
pub mod schema;

use async_trait::async_trait;
use axum::Router;
use bookshelf_kernel::{InitCtx, Migration, Module};
use sqlx::SqlitePool;

/// DDL for the books table. The primary key on `isbn` is what enforces the
/// uniqueness invariant; the repository never checks it client-side.
pub(crate) const CREATE_BOOKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS books (
    isbn       TEXT PRIMARY KEY,
    amazon_url TEXT NOT NULL,
    author     TEXT NOT NULL,
    language   TEXT NOT NULL,
    pages      INTEGER NOT NULL,
    publisher  TEXT NOT NULL,
    title      TEXT NOT NULL,
    year       INTEGER NOT NULL
);
"#;

/// Books module: CRUD over the book catalog
pub struct BooksModule;

impl BooksModule {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self, db: SqlitePool) -> Router {
        routes::router(db)
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_create_books",
            up: CREATE_BOOKS_TABLE,
        }]
    }
}

/// Create a new instance of the books module
pub fn create_module() -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule::new())
}
