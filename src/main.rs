mod modules;

use anyhow::Context;
use bookshelf_kernel::settings::Settings;
use bookshelf_kernel::{InitCtx, ModuleRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::try_init().ok();

    let settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.url,
        "bookshelf-app bootstrap starting"
    );

    let pool = bookshelf_db::connect(&settings.database).await?;

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry);

    let migrations = registry.collect_migrations();
    bookshelf_db::run_migrations(&pool, &migrations)
        .await
        .with_context(|| "failed to run module migrations")?;

    {
        let ctx = InitCtx {
            settings: &settings,
            db: &pool,
        };
        registry.init_modules(&ctx).await?;
    }

    tracing::info!("bookshelf-app bootstrap complete");

    bookshelf_http::start_server(&registry, &settings, pool).await
}
