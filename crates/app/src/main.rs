use clap::Parser;
use migration::{Migrator, MigratorTrait};

mod cli;
mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = cli::Cli::parse();
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "dots={level},engine={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let url = args
        .database_url
        .clone()
        .unwrap_or_else(|| settings.database.url());
    let db = sea_orm::Database::connect(url).await?;
    Migrator::up(&db, None).await?;
    tracing::debug!("migrations applied");

    let engine = engine::Engine::builder().database(db).build().await?;
    let actor = args.actor();

    match cli::run(&engine, &actor, args.command).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", cli::error_body(&err));
            std::process::exit(1);
        }
    }
}
