pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "dasctl")]
#[command(about = "Operator tooling for the data application service")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Compile a sub-service detail document to its WHERE clause")]
    Compile(commands::detail::DetailArgs),

    #[command(about = "Check that a sub-service detail document compiles")]
    Validate(commands::detail::DetailArgs),

    #[command(about = "Mint a bearer token for local testing")]
    Token(commands::token::TokenArgs),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Compile(args) => commands::detail::compile(args, output_format),
        Commands::Validate(args) => commands::detail::validate(args, output_format),
        Commands::Token(args) => commands::token::handle(args, output_format),
    }
}
