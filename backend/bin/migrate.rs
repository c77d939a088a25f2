use ridepool::{get_db_pool, utils};
use ridepool::DatabaseConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::init_logging();

    let db_config = DatabaseConfig::from_env()?;
    let pool = get_db_pool(&db_config).await?;

    println!("Running database migrations...");
    ridepool::store::migrations::run_migrations(&pool).await?;
    println!("Migrations completed successfully!");

    Ok(())
}
