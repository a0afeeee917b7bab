//! Promotes (or creates) an admin account in the PostgreSQL store.
//!
//! ```text
//! seed <external-id> <email> [display-name]
//! ```
//! The database url comes from the usual configuration sources
//! (`COURTSIDE__DATABASE__URL`, `.env`, `config/`).

use anyhow::{bail, Context};
use chrono::Utc;
use configs::Settings;
use domains::{User, UserRepo, UserRole};
use secrecy::ExposeSecret;
use storage_adapters::postgres::PgStore;

struct Args {
    external_id: String,
    email: String,
    display_name: Option<String>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = std::env::args().skip(1);
    let (Some(external_id), Some(email)) = (args.next(), args.next()) else {
        bail!("usage: seed <external-id> <email> [display-name]");
    };
    let email = email.trim().to_lowercase();
    if !email.contains('@') {
        bail!("'{email}' is not an email address");
    }
    Ok(Args { external_id, email, display_name: args.next() })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().compact().with_target(false).init();

    let args = parse_args()?;
    let settings = Settings::load().context("loading configuration")?;
    let url = settings.database.url.as_ref().context("database.url is not set")?;

    let store = PgStore::connect(url.expose_secret(), 1, settings.database.acquire_timeout())
        .await
        .context("connecting to postgres")?;
    store.migrate().await.context("running migrations")?;
    let users = store.users();

    let now = Utc::now();
    match users.find_by_external_id(&args.external_id).await? {
        Some(mut user) => {
            user.role = UserRole::Admin;
            user.is_active = true;
            user.updated_at = now;
            users.update(&user).await?;
            tracing::info!(user_id = %user.id, email = %user.email, "promoted existing user to admin");
        }
        None => {
            let display_name = args.display_name.unwrap_or_else(|| "Administrator".to_string());
            let user = users
                .insert(User::new(&args.external_id, &args.email, display_name, UserRole::Admin, now))
                .await?;
            tracing::info!(user_id = %user.id, email = %user.email, "created admin user");
        }
    }
    Ok(())
}
