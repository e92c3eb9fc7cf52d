/*!
 * ManuFlow administrative CLI.
 *
 * Works directly on the SQLite database named by DATABASE_URL, through the
 * same ORM functions the API uses. Pending migrations are applied on
 * connect, so the tool can bootstrap an empty database.
 *
 * Search terms are regular expressions unless -F is given. Destructive
 * commands ask for confirmation unless -y is given.
 */

use clap::{Parser, Subcommand};

mod admin_cli {
    pub mod company_commands;
    pub mod report_commands;
    pub mod ronda_commands;
    pub mod user_commands;
    pub mod utils;
}

use admin_cli::company_commands::{CompanyAction, handle_company_command_with_conn};
use admin_cli::report_commands::{ReportAction, handle_report_command_with_conn};
use admin_cli::ronda_commands::{RondaAction, handle_ronda_command_with_conn};
use admin_cli::user_commands::{UserAction, handle_user_command_with_conn};
use admin_cli::utils::establish_connection;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[derive(Parser)]
#[command(name = "manuflow-admin")]
#[command(about = "Administrative CLI for ManuFlow database management")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Company {
        #[command(subcommand)]
        action: CompanyAction,
    },
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    Rondas {
        #[command(subcommand)]
        action: RondaAction,
    },
    Reports {
        #[command(subcommand)]
        action: ReportAction,
    },
    #[command(about = "Show build information")]
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("manuflow-admin {}", built_info::PKG_VERSION);
        println!("Built: {}", built_info::BUILT_TIME_UTC);
        if let Some(commit) = built_info::GIT_COMMIT_HASH {
            println!("Git commit: {}", commit);
        }
        return Ok(());
    }

    let mut conn = establish_connection()?;
    match cli.command {
        Commands::Company { action } => handle_company_command_with_conn(&mut conn, action)?,
        Commands::User { action } => handle_user_command_with_conn(&mut conn, action)?,
        Commands::Rondas { action } => handle_ronda_command_with_conn(&mut conn, action)?,
        Commands::Reports { action } => handle_report_command_with_conn(&mut conn, action)?,
        Commands::Version => {}
    }

    Ok(())
}
