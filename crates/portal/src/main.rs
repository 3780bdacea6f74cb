//! `staybook-portal` command line entry point.
//!
//! Runs the session flows against in-memory backends and prints the result
//! as JSON, e.g.
//!
//! ```text
//! staybook-portal sign-in --portal manager --email admin@staybook.test --password demo
//! staybook-portal visit /manager/dashboard --email lodger@staybook.test --password demo
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;

use staybook_auth::Portal;
use staybook_portal::config::ENV_SEED_FILE;
use staybook_portal::{PortalApp, PortalConfig};
use staybook_session::NavigationQuery;

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in on a portal and print where the visitor lands.
    SignIn {
        #[arg(long, default_value = "commercial")]
        portal: Portal,

        #[arg(long)]
        email: String,

        #[arg(long, env = "STAYBOOK_PASSWORD", hide_env_values = true)]
        password: String,

        /// Query string of the login page, e.g. `plan=pro&billing=annual`.
        #[arg(long, default_value = "")]
        query: String,
    },

    /// Open a route and print what its guards decide.
    Visit {
        /// Path including any query string.
        path: String,

        /// Sign in as this account first.
        #[arg(long, requires = "password")]
        email: Option<String>,

        #[arg(long, env = "STAYBOOK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON fixture with accounts and profiles; built-in demo accounts when unset.
    #[arg(long, env = ENV_SEED_FILE, value_hint = clap::ValueHint::FilePath)]
    seed_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

async fn run(app: &PortalApp, command: Command) -> anyhow::Result<serde_json::Value> {
    match command {
        Command::SignIn {
            portal,
            email,
            password,
            query,
        } => {
            let screen = app.login_screen(portal);
            let query = NavigationQuery::parse(&query);
            let resolution = screen
                .sign_in(&email, &password, &query)
                .await
                .with_context(|| format!("sign-in on the {portal} portal failed"))?;
            Ok(json!({
                "portal": portal,
                "title": screen.title(),
                "user": app.session().user,
                "resolution": resolution,
            }))
        }
        Command::Visit { path, email, password } => {
            if let (Some(email), Some(password)) = (email, password) {
                let portal = Portal::from_path(&path);
                app.login_screen(portal)
                    .sign_in(&email, &password, &NavigationQuery::default())
                    .await
                    .context("sign-in before visit failed")?;
            }
            let visit = app.visit(&path).await;
            Ok(json!({
                "path": path,
                "user": app.session().user,
                "visit": visit,
            }))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    staybook_observability::init();

    let args = Args::parse();
    let mut config = PortalConfig::from_env().context("invalid configuration")?;
    if args.seed_file.is_some() {
        config.seed_file = args.seed_file;
    }

    let app = PortalApp::in_memory(config).await?;
    let result = run(&app, args.command).await;
    app.shutdown().await;

    println!("{}", serde_json::to_string_pretty(&result?)?);
    Ok(())
}
