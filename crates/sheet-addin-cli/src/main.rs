//! addin - run the spreadsheet add-in's actions from the command line

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use batch_proxy::{ErrorPolicy, Host, ProcessHost, ProcessHostConfig};
use clap::{Parser, Subcommand};
use sheet_addin::{open_dialog, Action, AddIn};
use sheet_host::MemoryHost;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "addin")]
#[command(author, version, about = "Spreadsheet add-in actions over a batching host")]
struct Cli {
    /// Host executable to spawn (default: an in-process host)
    #[arg(long, value_name = "PATH")]
    host_exe: Option<PathBuf>,

    /// Round-trip timeout for a spawned host, in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Fail on the first action error instead of logging it and moving on
    #[arg(long)]
    propagate: bool,

    /// Print the workbook as JSON afterwards (in-process host only)
    #[arg(long)]
    dump: bool,

    /// More logging (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create and format the expenses table
    CreateTable,

    /// Show only Education and Groceries expenses
    FilterTable,

    /// Sort expenses by merchant, descending
    SortTable,

    /// Chart the expenses
    CreateChart,

    /// Keep the header row visible while scrolling
    FreezeHeader,

    /// Protect or unprotect the active worksheet
    ToggleProtection,

    /// Invoke a registered command (e.g. toggleProtection, action)
    Command {
        /// Command name
        name: String,
    },

    /// Open the name dialog and report what it sends back
    Dialog {
        /// Name to enter in the dialog
        #[arg(short, long)]
        name: String,
    },

    /// Run every action in order
    Demo,
}

impl Commands {
    fn actions(&self) -> Vec<Action> {
        match self {
            Commands::CreateTable => vec![Action::CreateTable],
            Commands::FilterTable => vec![Action::FilterTable],
            Commands::SortTable => vec![Action::SortTable],
            Commands::CreateChart => vec![Action::CreateChart],
            Commands::FreezeHeader => vec![Action::FreezeHeader],
            Commands::ToggleProtection => vec![Action::ToggleProtection],
            Commands::Demo => Action::ALL.to_vec(),
            Commands::Command { .. } | Commands::Dialog { .. } => Vec::new(),
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let policy = if cli.propagate {
        ErrorPolicy::Propagate
    } else {
        ErrorPolicy::LogAndSwallow
    };

    match &cli.host_exe {
        Some(program) => {
            if cli.dump {
                bail!("--dump needs the in-process host; drop --host-exe");
            }
            let host = ProcessHost::start(ProcessHostConfig {
                program: program.clone(),
                args: Vec::new(),
                timeout: Duration::from_secs(cli.timeout),
            })
            .with_context(|| format!("Failed to start host {}", program.display()))?;
            let mut addin = AddIn::new(host).with_policy(policy);
            let outcome = run(&mut addin, &cli.command).await;
            addin
                .into_host()
                .shutdown()
                .await
                .context("Failed to shut down host")?;
            outcome
        }
        None => {
            let mut addin = AddIn::new(MemoryHost::new()).with_policy(policy);
            run(&mut addin, &cli.command).await?;
            if cli.dump {
                let json = serde_json::to_string_pretty(addin.host().workbook())
                    .context("Failed to serialize workbook")?;
                let mut out = io::stdout().lock();
                writeln!(out, "{json}")?;
            }
            Ok(())
        }
    }
}

async fn run<H: Host>(addin: &mut AddIn<H>, command: &Commands) -> Result<()> {
    let info = addin
        .initialize()
        .await
        .context("Host is not ready")?
        .clone();
    tracing::info!(host = ?info.host, version = %info.version, "connected");

    match command {
        Commands::Command { name } => {
            addin
                .execute_command(name)
                .await
                .with_context(|| format!("Command '{name}' failed"))?;
            println!("{name}: done");
        }
        Commands::Dialog { name } => {
            let (mut parent, child) = open_dialog();
            let name = name.clone();
            tokio::spawn(async move { child.submit_name(&name) });
            let received = parent.first_message().await?;
            println!("Dialog sent: {received}");
        }
        other => {
            for action in other.actions() {
                let done = addin
                    .run(action)
                    .await
                    .with_context(|| format!("Action {action} failed"))?;
                println!("{action}: {}", if done { "done" } else { "failed (see log)" });
            }
        }
    }
    Ok(())
}
