//! Utility to inspect the leads table and print its structure.

use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::env;

/// Main entry point for the schema inspection utility.
///
/// Connects to the database and lists the columns, constraints and row count
/// of the `leads` table.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    let database_url = env::var("DATABASE_URL")
        .or_else(|_| env::var("DB_URL"))
        .map_err(|_| "DATABASE_URL must be set")?;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await?;

    let columns: Vec<(String, String, String)> = sqlx::query_as(
        "SELECT column_name, data_type, is_nullable FROM information_schema.columns WHERE table_name = 'leads' ORDER BY ordinal_position"
    )
    .fetch_all(&pool)
    .await?;

    if columns.is_empty() {
        println!("Table 'leads' not found. Start the server once to run migrations.");
        return Ok(());
    }

    println!("leads:");
    for (col, type_, nullable) in columns {
        let null = if nullable == "YES" { "" } else { " not null" };
        println!("  - {}: {}{}", col, type_, null);
    }

    let constraints: Vec<(String, String)> = sqlx::query_as(
        "SELECT conname, pg_get_constraintdef(oid) FROM pg_constraint WHERE conrelid = 'leads'::regclass ORDER BY conname"
    )
    .fetch_all(&pool)
    .await?;

    println!();
    println!("constraints:");
    for (name, definition) in constraints {
        println!("  - {}: {}", name, definition);
    }

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM leads")
        .fetch_one(&pool)
        .await?;
    println!();
    println!("rows: {}", count);

    Ok(())
}
