//! Implementation of the `creatorpulse crawl --user <id>` command.

use creatorpulse_core::crawl;
use creatorpulse_core::storage;

pub async fn execute(config_path: &str, user_id: &str) -> anyhow::Result<()> {
    let db_dir_path = std::path::PathBuf::from(storage::expand_tilde(config_path));
    let db_dir = db_dir_path.parent().unwrap_or_else(|| std::path::Path::new("."));
    let db_path = db_dir.join("creatorpulse.db");

    let pool = storage::init_db(&db_path.to_string_lossy()).await?;
    let outcome = crawl::crawl_user(&pool, user_id).await?;

    if outcome.skipped {
        println!("crawl skipped for {user_id}: a batch is already running");
        return Ok(());
    }

    println!("crawled {} source(s) for {user_id}:", outcome.sources.len());
    for source in &outcome.sources {
        match &source.error {
            Some(err) => println!("  {} - error: {err}", source.source_id),
            None => println!(
                "  {} - {} fetched, {} new",
                source.source_id, source.items_fetched, source.items_new
            ),
        }
    }

    Ok(())
}
