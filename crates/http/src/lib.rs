//! HTTP server facade for bookshelf with Axum and shared error handling.

use anyhow::Context;
use axum::{routing::get, Router};
use sqlx::SqlitePool;

use bookshelf_kernel::ModuleRegistry;

pub mod error;
pub mod router;

use router::RouterBuilder;

/// Start the HTTP server with the given module registry
pub async fn start_server(
    registry: &ModuleRegistry,
    settings: &bookshelf_kernel::settings::Settings,
    db: SqlitePool,
) -> anyhow::Result<()> {
    tracing::info!(
        "starting HTTP server on {}:{}",
        settings.server.host,
        settings.server.port
    );

    let app = build_router(registry, settings, db);

    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", settings.server.host, settings.server.port))
            .await
            .with_context(|| "failed to bind to address")?;

    tracing::info!(
        "HTTP server listening on http://{}:{}",
        settings.server.host,
        settings.server.port
    );

    axum::serve(listener, app)
        .await
        .with_context(|| "HTTP server failed")?;

    Ok(())
}

/// Build the main HTTP router with all module routes mounted
pub fn build_router(
    registry: &ModuleRegistry,
    settings: &bookshelf_kernel::settings::Settings,
    db: SqlitePool,
) -> Router {
    let mut router_builder = RouterBuilder::new()
        .with_tracing()
        .with_cors()
        .with_request_id()
        .with_timeout(settings.server.request_timeout_ms)
        .route("/healthz", get(health_check));

    for module in registry.modules() {
        let module_name = module.name();
        let module_router = module.routes(db.clone());

        tracing::info!(
            module = module_name,
            "mounting module routes under /{}",
            module_name
        );
        router_builder = router_builder.mount_module(module_name, module_router);
    }

    router_builder.build()
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
