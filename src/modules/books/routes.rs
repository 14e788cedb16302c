//! HTTP handlers for the books module.
//!
//! Mutating requests pass through the validation gate before the payload is
//! decoded into a typed model; repository failures are converted to status
//! codes here and nowhere deeper.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;

use bookshelf_http::error::AppError;

use super::models::{BookChanges, BookFilter, NewBook};
use super::repository::{BookRepository, RepoError};
use super::schema::{self, Violation};

/// Build the module router. The repository is the only handler state.
pub fn router(db: SqlitePool) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/health", get(health_check))
        .route("/{isbn}", get(get_book).put(update_book).delete(remove_book))
        .with_state(BookRepository::new(db))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "books module is healthy"
}

/// GET / => `{books: [...]}`
async fn list_books(
    State(repo): State<BookRepository>,
    Query(filter): Query<BookFilter>,
) -> Result<Json<Value>, AppError> {
    let books = repo.find_all(&filter).await?;
    Ok(Json(json!({ "books": books })))
}

/// GET /{isbn} => `{book: ...}`
async fn get_book(
    State(repo): State<BookRepository>,
    Path(isbn): Path<String>,
) -> Result<Json<Value>, AppError> {
    let book = repo.find_one(&isbn).await?;
    Ok(Json(json!({ "book": book })))
}

/// POST / => 201 `{book: ...}`
async fn create_book(
    State(repo): State<BookRepository>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    schema::validate_create(&payload).map_err(validation_failure)?;

    let new_book: NewBook = decode(payload)?;
    let book = repo.create(&new_book).await?;

    tracing::info!(isbn = %book.isbn, "book created");

    Ok((StatusCode::CREATED, Json(json!({ "book": book }))))
}

/// PUT /{isbn} => `{book: ...}`
async fn update_book(
    State(repo): State<BookRepository>,
    Path(isbn): Path<String>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, AppError> {
    schema::validate_update(&payload).map_err(validation_failure)?;

    let changes: BookChanges = decode(payload)?;
    let book = repo.update(&isbn, &changes).await?;

    tracing::info!(isbn = %book.isbn, "book updated");

    Ok(Json(json!({ "book": book })))
}

/// DELETE /{isbn} => `{message: "Book deleted"}`
async fn remove_book(
    State(repo): State<BookRepository>,
    Path(isbn): Path<String>,
) -> Result<Json<Value>, AppError> {
    repo.remove(&isbn).await?;

    tracing::info!(%isbn, "book deleted");

    Ok(Json(json!({ "message": "Book deleted" })))
}

/// A payload that passed the gate decodes into its typed model; a failure
/// here is a server bug, not client input.
fn decode<T: serde::de::DeserializeOwned>(payload: Value) -> Result<T, AppError> {
    serde_json::from_value(payload)
        .map_err(|err| AppError::Internal(anyhow::Error::new(err).context("payload decode")))
}

fn validation_failure(violations: Vec<Violation>) -> AppError {
    let message = violations
        .iter()
        .map(|v| format!("{} {}", v.field, v.error))
        .collect::<Vec<_>>()
        .join("; ");
    let details = violations
        .into_iter()
        .map(|v| json!({ "field": v.field, "error": v.error }))
        .collect();

    AppError::validation(details, message)
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(isbn) => {
                Self::not_found(format!("There is no book with an isbn '{isbn}'"))
            }
            RepoError::Duplicate(isbn) => Self::conflict(
                vec![json!({ "field": "isbn", "error": "already exists" })],
                format!("A book with isbn '{isbn}' already exists"),
            ),
            RepoError::Database(err) => Self::Internal(anyhow::Error::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        Router,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use bookshelf_kernel::settings::DatabaseSettings;

    async fn test_app() -> Router {
        let settings = DatabaseSettings {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        };
        let pool = bookshelf_db::connect(&settings).await.unwrap();

        sqlx::raw_sql(crate::modules::books::CREATE_BOOKS_TABLE)
            .execute(&pool)
            .await
            .unwrap();

        Router::new().nest("/books", super::router(pool))
    }

    fn sample_payload() -> Value {
        json!({
            "isbn": "1234567890",
            "amazon_url": "https://a.co/test",
            "author": "Carl Diggler",
            "language": "english",
            "pages": 413,
            "publisher": "Scholastic Books",
            "title": "On the Origin of Fake Test Data",
            "year": 2015
        })
    }

    fn update_payload() -> Value {
        json!({
            "amazon_url": "https://a.co/test",
            "author": "Carl Sagan",
            "language": "esperanto",
            "pages": 525600,
            "publisher": "Columbia Pictures",
            "title": "New Title",
            "year": 1873
        })
    }

    fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn seed_book(app: &Router) {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/books", &sample_payload()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn create_read_update_delete_scenario() {
        let app = test_app().await;

        // Create echoes the book back with 201.
        let response = app
            .clone()
            .oneshot(json_request("POST", "/books", &sample_payload()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["book"]["isbn"], "1234567890");
        assert_eq!(body["book"]["pages"], 413);

        // Update without an isbn key succeeds and changes fields.
        let response = app
            .clone()
            .oneshot(json_request("PUT", "/books/1234567890", &update_payload()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["book"]["author"], "Carl Sagan");
        assert_eq!(body["book"]["title"], "New Title");
        assert_eq!(body["book"]["isbn"], "1234567890");

        // Delete acknowledges with a message.
        let response = app
            .clone()
            .oneshot(empty_request("DELETE", "/books/1234567890"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body, json!({ "message": "Book deleted" }));

        // The book is gone.
        let response = app
            .oneshot(empty_request("GET", "/books/1234567890"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_rejects_numeric_string_pages() {
        let app = test_app().await;

        let mut payload = sample_payload();
        payload["pages"] = json!("612");

        let response = app
            .oneshot(json_request("POST", "/books", &payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "validation_error");
        assert_eq!(body["error"]["details"][0]["field"], "pages");
    }

    #[tokio::test]
    async fn create_rejects_unknown_field() {
        let app = test_app().await;

        let mut payload = sample_payload();
        payload["extra_property"] = json!("HEY WHAT'S THIS DOING HERE");

        let response = app
            .oneshot(json_request("POST", "/books", &payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_rejects_partial_payload() {
        let app = test_app().await;

        let response = app
            .oneshot(json_request("POST", "/books", &json!({"author": "Rick Astley"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_duplicate_isbn_is_a_conflict() {
        let app = test_app().await;
        seed_book(&app).await;

        let response = app
            .oneshot(json_request("POST", "/books", &sample_payload()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "conflict");
    }

    #[tokio::test]
    async fn list_returns_all_books() {
        let app = test_app().await;
        seed_book(&app).await;

        let response = app.oneshot(empty_request("GET", "/books")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["books"].as_array().unwrap().len(), 1);
        assert_eq!(body["books"][0]["isbn"], "1234567890");
    }

    #[tokio::test]
    async fn list_filters_by_title_substring() {
        let app = test_app().await;
        seed_book(&app).await;

        let response = app
            .clone()
            .oneshot(empty_request("GET", "/books?title=Origin"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["books"].as_array().unwrap().len(), 1);

        let response = app
            .oneshot(empty_request("GET", "/books?author=Nobody"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["books"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_rejects_unrecognized_filter_field() {
        let app = test_app().await;

        let response = app
            .oneshot(empty_request("GET", "/books?shelf=top"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn get_missing_isbn_is_not_found() {
        let app = test_app().await;

        let response = app
            .oneshot(empty_request("GET", "/books/5555555555"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn update_rejects_isbn_in_body() {
        let app = test_app().await;
        seed_book(&app).await;

        // Even a matching isbn value is rejected; the key lives in the path.
        let mut payload = update_payload();
        payload["isbn"] = json!("1234567890");

        let response = app
            .oneshot(json_request("PUT", "/books/1234567890", &payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"]["details"][0]["field"], "isbn");
    }

    #[tokio::test]
    async fn update_rejects_partial_payload() {
        let app = test_app().await;
        seed_book(&app).await;

        let response = app
            .oneshot(json_request("PUT", "/books/1234567890", &json!({"pages": 500})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_rejects_numeric_string_year() {
        let app = test_app().await;
        seed_book(&app).await;

        let mut payload = update_payload();
        payload["year"] = json!("1873");

        let response = app
            .oneshot(json_request("PUT", "/books/1234567890", &payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_missing_isbn_is_not_found() {
        let app = test_app().await;

        let response = app
            .oneshot(json_request("PUT", "/books/5555555555", &update_payload()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn module_mounts_through_the_registry() {
        let settings = bookshelf_kernel::settings::Settings::default();
        let db_settings = DatabaseSettings {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        };
        let pool = bookshelf_db::connect(&db_settings).await.unwrap();

        let mut registry = bookshelf_kernel::ModuleRegistry::new();
        crate::modules::register_all(&mut registry);

        bookshelf_db::run_migrations(&pool, &registry.collect_migrations())
            .await
            .unwrap();

        let app = bookshelf_http::build_router(&registry, &settings, pool);

        let response = app
            .clone()
            .oneshot(empty_request("GET", "/healthz"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(empty_request("GET", "/books/health"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(json_request("POST", "/books", &sample_payload()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn delete_missing_isbn_is_not_found() {
        let app = test_app().await;

        let response = app
            .oneshot(empty_request("DELETE", "/books/5555555555"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
