//! Settlement Registry CLI Client
//!
//! Command-line interface for talking to a registry host.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use settlement_registry::storage::load_seed_file;
use settlement_registry::{ClientConfig, ClientSession, Result, SettlementRecord};
use tracing_subscriber::{fmt, EnvFilter};

/// Settlement registry CLI
#[derive(Parser, Debug)]
#[command(name = "registry-cli")]
#[command(about = "CLI for the settlement registry")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:9090")]
    server: String,

    /// Reply timeout in milliseconds
    #[arg(short, long, default_value = "10000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register and print the assigned client id
    Register {
        /// Player name
        username: String,
    },

    /// Print the number of settlements on the host
    Count,

    /// List every settlement on the host
    List,

    /// Register, publish a settlement, and list the result
    Add {
        /// Player name used to register
        #[arg(short, long, default_value = "cli")]
        username: String,

        name: String,
        template: String,
        population: u32,
        robots: u32,
        #[arg(allow_hyphen_values = true)]
        latitude: f64,
        #[arg(allow_hyphen_values = true)]
        longitude: f64,
    },

    /// Print the entries of a local seed file
    Seeds {
        path: PathBuf,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = ClientConfig {
        response_timeout_ms: args.timeout_ms,
        ..ClientConfig::default()
    };
    let server = args.server;
    let connect = || ClientSession::connect_with_config(server.as_str(), config);

    match args.command {
        Commands::Register { username } => {
            let mut session = connect()?;
            let id = session.register(&username)?;
            println!("NEW_ID {}", id);
            session.close()
        }
        Commands::Count => {
            let mut session = connect()?;
            println!("{}", session.get_settlement_count()?);
            session.close()
        }
        Commands::List => {
            let mut session = connect()?;
            print_records(&session.get_records()?);
            session.close()
        }
        Commands::Add {
            username,
            name,
            template,
            population,
            robots,
            latitude,
            longitude,
        } => {
            let mut session = connect()?;
            let id = session.register(&username)?;
            let record =
                SettlementRecord::new(id, name, template, population, robots, latitude, longitude)?;
            session.send_new(&record)?;
            // Commands are handled in order, so `get` already sees the new record
            print_records(&session.get_records()?);
            session.close()
        }
        Commands::Seeds { path } => {
            for entry in load_seed_file(&path)? {
                println!("{} ({}, {})", entry.name, entry.latitude, entry.longitude);
            }
            Ok(())
        }
    }
}

fn print_records(records: &[SettlementRecord]) {
    if records.is_empty() {
        println!("(no settlements)");
    }
    for (index, record) in records.iter().enumerate() {
        println!("({}). {}", index + 1, record);
    }
}
