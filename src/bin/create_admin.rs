//! CLI tool to provision a back-office account.
//!
//! Usage: `create-admin <email> <password> <name> [SUPER_ADMIN|EDITOR]`
//!
//! Missing arguments are read from `JCPC_ADMIN_EMAIL`, `JCPC_ADMIN_PASSWORD`,
//! `JCPC_ADMIN_NAME` and `JCPC_ADMIN_ROLE`. The role defaults to EDITOR.
//! Configuration is loaded from `JCPC_CONFIG` or `config.yml`.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;

use jcpc::{
    config::Config,
    db::{
        self,
        repositories::{SqlxAdminRepository, SqlxSessionRepository},
    },
    models::AdminRole,
    services::{AuthService, LoginRateLimiter},
};

fn arg_or_env(args: &[String], index: usize, var: &str) -> Option<String> {
    args.get(index)
        .cloned()
        .or_else(|| std::env::var(var).ok())
        .filter(|v| !v.trim().is_empty())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jcpc=warn".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (Some(email), Some(password), Some(name)) = (
        arg_or_env(&args, 0, "JCPC_ADMIN_EMAIL"),
        arg_or_env(&args, 1, "JCPC_ADMIN_PASSWORD"),
        arg_or_env(&args, 2, "JCPC_ADMIN_NAME"),
    ) else {
        bail!("usage: create-admin <email> <password> <name> [SUPER_ADMIN|EDITOR]");
    };
    let role: AdminRole = match arg_or_env(&args, 3, "JCPC_ADMIN_ROLE") {
        Some(role) => role.parse()?,
        None => AdminRole::Editor,
    };

    let config_path = std::env::var("JCPC_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.yml"));
    let config = Config::load_with_env(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    let pool = db::create_pool(&config.database).await?;
    db::migrations::run_migrations(&pool).await?;

    let auth = AuthService::new(
        SqlxAdminRepository::boxed(pool.clone()),
        SqlxSessionRepository::boxed(pool.clone()),
        LoginRateLimiter::new(),
        config.session.ttl_days,
    );
    let admin = auth.create_admin(&email, &password, &name, role).await?;

    println!("Created {} account for {} (id {})", admin.role, admin.email, admin.id);
    Ok(())
}
