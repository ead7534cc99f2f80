//! Coderun - run submitted code and terminal commands with timeouts.
//!
//! Usage:
//!   coderun serve [--port 5000]                 # Start HTTP server
//!   coderun exec --language python <file>       # Run a source file once
//!   coderun sh -- <command line>                # Run a terminal command once

#[cfg(not(target_os = "linux"))]
compile_error!("This program only works on Linux.");

use clap::{Parser, Subcommand};
use coderun::config::Config;
use coderun::http_server;
use coderun::state::AppState;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process::exit;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "coderun")]
#[command(about = "Time-bounded code execution with an HTTP API")]
struct Args {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    config: Config,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(long, env = "PORT", default_value = "5000")]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: IpAddr,
    },
    /// Execute a source file once and mirror its output
    Exec {
        /// Language tag (python, javascript, java, c, cpp)
        #[arg(long, short)]
        language: String,

        /// Source file to run
        file: PathBuf,
    },
    /// Run a command line through the terminal runner
    Sh {
        /// Command line to run
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let executor = args.config.executor().unwrap_or_else(|e| fail(&e));

    match args.command {
        Commands::Serve { port, host } => {
            let runner = args.config.command_runner().unwrap_or_else(|e| fail(&e));
            let state = AppState::new(executor, runner);
            if let Err(e) = http_server::run_server(SocketAddr::new(host, port), state).await {
                fail(&format!("server: {}", e));
            }
        }
        Commands::Exec { language, file } => {
            let code = std::fs::read_to_string(&file)
                .unwrap_or_else(|e| fail(&format!("read {}: {}", file.display(), e)));
            let result = executor.execute(&code, &language).await;
            print!("{}", result.stdout);
            eprint!("{}", result.stderr);
            // Compiler and runtime diagnostics are already on stderr.
            if let (true, Some(message)) = (result.stderr.is_empty(), &result.message) {
                eprintln!("Error: {}", message);
            }
            exit(result.exit_code.unwrap_or(1));
        }
        Commands::Sh { command } => {
            let runner = args.config.command_runner().unwrap_or_else(|e| fail(&e));
            let result = runner.run(&command.join(" ")).await;
            print!("{}", result.combined_output);
            if let (false, Some(message)) = (result.succeeded, &result.message) {
                eprintln!("Error: {}", message);
            }
            exit(if result.exit_code < 0 { 1 } else { result.exit_code });
        }
    }
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {}", message);
    exit(1);
}
