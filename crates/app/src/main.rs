mod commands;
mod config;
mod logging;

use services::{AppServices, Clock};

use crate::commands::Prompt;
use crate::config::{Args, Command, Config, prepare_sqlite_file, print_usage};

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let env_config = Config::from_env().inspect_err(|_| print_usage())?;
    let Args { config, command } =
        Args::parse(std::env::args().skip(1), env_config).inspect_err(|_| print_usage())?;

    logging::init_tracing(&config.log_level);

    if command == Command::Help {
        print_usage();
        return Ok(());
    }

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&config.db_url)?;
    let services = AppServices::new_sqlite(&config.db_url, Clock::system()).await?;
    tracing::debug!(db_url = %config.db_url, user_id = %config.user_id, "storage ready");

    match command {
        Command::Add(new) => commands::add(&services, &config, new).await,
        Command::Correct {
            item_id,
            correction,
        } => commands::correct(&services, item_id, correction).await,
        Command::Remove { item_id } => commands::remove(&services, item_id).await,
        Command::History { item_id } => commands::history(&services, item_id).await,
        Command::List => commands::list(&services, &config).await,
        Command::Stats => commands::stats(&services, &config).await,
        Command::Due => commands::due(&services, &config).await,
        Command::Learn => commands::learn(&services, &config, &mut Prompt::stdin()).await,
        Command::Review => commands::review(&services, &config, &mut Prompt::stdin()).await,
        Command::Help => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
