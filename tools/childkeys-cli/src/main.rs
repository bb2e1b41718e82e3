//! childkeys - list the immediate child keys of realtime database nodes.
//!
//! ```text
//! childkeys https://my-db.firebaseio.com/users
//! childkeys --max-tries 3 --sort --json https://my-db.firebaseio.com/a https://my-db.firebaseio.com/b
//! ```

mod config;
mod fetch;
mod output;

use anyhow::Result;
use childkeys_observability::{init_logging, LogLevel};
use clap::Parser;

use config::ClientConfig;
use fetch::FetchArgs;
use output::Output;

/// List the child keys of database nodes without downloading their values
#[derive(Parser)]
#[command(name = "childkeys")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long)]
    json: bool,

    /// Config file path (TOML or JSON)
    #[arg(short, long)]
    config: Option<String>,

    #[command(flatten)]
    fetch: FetchArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(cli.verbose, cli.json);

    match run(&cli, &output).await {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            output.error(&format!("{:#}", e));
            std::process::exit(1);
        }
    }
}

async fn run(cli: &Cli, output: &Output) -> Result<bool> {
    let config = match cli.config.as_deref() {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = LogLevel::Debug;
    }
    if let Err(e) = init_logging(&logging) {
        output.warn(&format!("Logging disabled: {e}"));
    }

    let options = cli.fetch.options(config.fetch);
    fetch::run(&cli.fetch, options, output).await
}
