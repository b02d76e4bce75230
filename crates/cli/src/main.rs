//! Warden CLI - database migrations and authorization management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! warden-cli migrate
//!
//! # Bootstrap the first super admin
//! warden-cli bootstrap --user-id usr_01
//!
//! # Promote an admin (actor must hold manage_admins)
//! warden-cli admin promote --user-id usr_02 --role support \
//!     --permission manage_subscriptions --actor usr_01
//!
//! # Deactivate an admin
//! warden-cli admin deactivate --user-id usr_02 --actor usr_01
//!
//! # Tail the audit log
//! warden-cli audit --limit 50
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `bootstrap` - Create the first super admin (one-time)
//! - `admin list|promote|activate|deactivate` - Manage admin records
//! - `audit` - Tail the audit log, newest first
//!
//! All admin mutations go through the same service layer as the API, so
//! permission gates and audit entries apply to operators too.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "warden-cli")]
#[command(author, version, about = "Warden CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Bootstrap the first super admin (fails once one exists)
    Bootstrap {
        /// External identity that becomes the first administrator
        #[arg(long)]
        user_id: String,
    },
    /// Manage admin records
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Tail the audit log, newest first
    Audit {
        /// Maximum number of entries to print
        #[arg(long, default_value_t = 20)]
        limit: u32,

        /// Only entries performed by this actor
        #[arg(long)]
        actor: Option<String>,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// List all admin records
    List,
    /// Create an admin record or change an existing one's role and grants
    Promote {
        /// Target external identity
        #[arg(long)]
        user_id: String,

        /// Admin role (`user`, `support`, `admin`, `super_admin`)
        #[arg(long, default_value = "support")]
        role: String,

        /// Additive permission grants beyond the role's set (repeatable)
        #[arg(long = "permission")]
        permissions: Vec<String>,

        /// Acting administrator (must hold `manage_admins`)
        #[arg(long)]
        actor: String,
    },
    /// Reactivate an admin record
    Activate {
        /// Target external identity
        #[arg(long)]
        user_id: String,

        /// Acting administrator (must hold `manage_admins`)
        #[arg(long)]
        actor: String,
    },
    /// Deactivate an admin record without deleting its history
    Deactivate {
        /// Target external identity
        #[arg(long)]
        user_id: String,

        /// Acting administrator (must hold `manage_admins`)
        #[arg(long)]
        actor: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Bootstrap { user_id } => commands::admin::bootstrap(&user_id).await?,
        Commands::Admin { action } => match action {
            AdminAction::List => commands::admin::list().await?,
            AdminAction::Promote {
                user_id,
                role,
                permissions,
                actor,
            } => commands::admin::promote(&user_id, &role, &permissions, &actor).await?,
            AdminAction::Activate { user_id, actor } => {
                commands::admin::set_active(&user_id, true, &actor).await?;
            }
            AdminAction::Deactivate { user_id, actor } => {
                commands::admin::set_active(&user_id, false, &actor).await?;
            }
        },
        Commands::Audit { limit, actor } => {
            commands::audit::tail(limit, actor.as_deref()).await?;
        }
    }
    Ok(())
}
