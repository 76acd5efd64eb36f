//! Seeds a demo learner account on top of the migrated starter content.
//! Run with: cargo run --bin seed

use academy_api::config::{Config, DatabaseConfig};
use academy_api::db::Database;
use academy_api::services::hash_password;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Same DATABASE__URL the server reads.
    let config = Config::load()?;

    println!("Connecting to database...");

    let db = Database::connect(&DatabaseConfig {
        max_connections: 1,
        ..config.database
    })
    .await?;
    db.run_migrations().await?;

    println!("Connected and migrated.");

    let username = std::env::var("DEMO_USERNAME").unwrap_or_else(|_| "demo".to_string());
    let email = std::env::var("DEMO_EMAIL").unwrap_or_else(|_| "demo@academy.local".to_string());
    let password = std::env::var("DEMO_PASSWORD").unwrap_or_else(|_| "paper-trader".to_string());

    let password_hash = hash_password(&password).map_err(|e| anyhow::anyhow!("{}", e))?;

    let existing: Option<(uuid::Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE username = $1")
        .bind(&username)
        .fetch_optional(&db.pg)
        .await?;

    if existing.is_some() {
        println!("Updating existing demo user password...");
        sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE username = $2")
            .bind(&password_hash)
            .bind(&username)
            .execute(&db.pg)
            .await?;
    } else {
        println!("Creating demo user...");
        sqlx::query("INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3)")
            .bind(&username)
            .bind(&email)
            .bind(&password_hash)
            .execute(&db.pg)
            .await?;
    }

    let lessons: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lessons")
        .fetch_one(&db.pg)
        .await?;
    let questions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quiz_questions")
        .fetch_one(&db.pg)
        .await?;

    println!("\n========================================");
    println!("Demo Account Ready!");
    println!("========================================");
    println!("Username: {}", username);
    println!("Password: {}", password);
    println!("Lessons:  {}", lessons);
    println!("Quiz questions: {}", questions);
    println!("========================================");

    Ok(())
}
