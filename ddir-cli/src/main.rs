use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::Level;

use ddir::diff::DiffRecord;
use ddir::error::Result;
use ddir::legacy::{self, MigrationOutcome};
use ddir::resolver::{DecisionProvider, ManualChoice, ModePolicy};
use ddir::target::{self, GlobalConfig, Target};

#[derive(Parser)]
#[command(name = "ddir")]
#[command(version)]
#[command(about = "Diff directories and resolve the differences")]
struct Cli {
    /// Source directory (defaults to the current directory)
    #[arg(short, long, global = true)]
    source: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Put the source directory under control
    Init,
    /// Work with diffs of a target
    Diff {
        #[command(subcommand)]
        command: DiffCommands,
    },
    /// Manage the targets of the source directory
    Target {
        #[command(subcommand)]
        command: TargetCommands,
    },
    /// Migrate metadata written by old versions
    Legacy {
        #[command(subcommand)]
        command: LegacyCommands,
    },
}

#[derive(Subcommand)]
enum DiffCommands {
    /// Scan both trees and store a new diff
    Create {
        /// Target name
        name: String,
    },
    /// Replay a stored diff against the filesystem
    Resolve {
        /// Target name
        name: String,
        /// Five digits, one per diff type in the order + - > < ?
        /// (0 = skip, 1 = apply, 2 = decide per record)
        #[arg(short, long)]
        modes: String,
        /// Resolve the most recent diff without asking which one
        #[arg(long)]
        latest: bool,
    },
    /// List the stored diffs of a target
    List {
        /// Target name
        name: String,
    },
}

#[derive(Subcommand)]
enum TargetCommands {
    /// Register a new target; prompts for anything omitted
    Create {
        /// Target name
        #[arg(short, long)]
        name: Option<String>,
        /// Destination directory
        #[arg(short, long)]
        path: Option<PathBuf>,
        /// Trust timestamps only, skip content hashing
        #[arg(short, long, num_args = 0..=1, default_missing_value = "true")]
        fast_mode: Option<bool>,
    },
    /// List all targets
    List,
    /// Delete a target and its stored diffs
    Delete {
        /// Target name
        name: String,
    },
}

#[derive(Subcommand)]
enum LegacyCommands {
    /// Upgrade v1 metadata to the current layout
    Migrate,
}

/// Asks on the terminal what to do with a single record
struct TerminalDecisions;

impl DecisionProvider for TerminalDecisions {
    fn decide(&mut self, record: &DiffRecord) -> ManualChoice {
        println!(
            "{} ({}): {}",
            record.diff_type,
            record.diff_type.description(),
            record.source.display()
        );

        loop {
            match prompt("apply, skip or swap direction? [a/S/w]: ").as_str() {
                "a" | "A" => return ManualChoice::Apply,
                "w" | "W" => return ManualChoice::Swap,
                "" | "s" | "S" => return ManualChoice::Skip,
                other => println!("unknown choice {other:?}"),
            }
        }
    }
}

fn prompt(question: &str) -> String {
    print!("{question}");
    io::stdout().flush().ok();

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).ok();
    line.trim().to_string()
}

fn required_prompt(question: &str) -> String {
    loop {
        let answer = prompt(question);
        if !answer.is_empty() {
            return answer;
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_max_level(Level::WARN).init();

    let cli = Cli::parse();
    let source = cli
        .source
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));

    if let Err(e) = run(&source, cli.command).await {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}

async fn run(source: &Path, command: Commands) -> Result<()> {
    match command {
        Commands::Init => {
            target::init(source).await?;
            println!("initialized {}", source.display());
            Ok(())
        }
        Commands::Diff { command } => run_diff(source, command).await,
        Commands::Target { command } => run_target(source, command).await,
        Commands::Legacy {
            command: LegacyCommands::Migrate,
        } => run_migrate(source).await,
    }
}

async fn run_diff(source: &Path, command: DiffCommands) -> Result<()> {
    match command {
        DiffCommands::Create { name } => {
            let target = target::load(source, &name).await?;
            let config = GlobalConfig::load(source).await?;

            let outcome = ddir::create_diff(source, &target, &config.ignore).await?;

            for record in &outcome.records {
                println!(
                    "{} {} {}",
                    record.diff_type.symbol(),
                    record.kind.symbol(),
                    record.source.display()
                );
            }
            for issue in &outcome.issues {
                eprintln!("warning: skipped {}: {}", issue.path.display(), issue.message);
            }
            println!(
                "{} differences written to {}",
                outcome.records.len(),
                outcome.diff_path.display()
            );
            Ok(())
        }
        DiffCommands::Resolve {
            name,
            modes,
            latest,
        } => {
            let target = target::load(source, &name).await?;
            let policy: ModePolicy = modes.parse()?;

            let Some(diff_path) = select_diff(&target, latest).await? else {
                println!("no diffs stored for target {name}");
                return Ok(());
            };

            let report =
                ddir::resolve_diff(source, &target, &diff_path, policy, &mut TerminalDecisions)
                    .await?;

            for entry in &report.outcomes {
                println!(
                    "{} {}: {:?}",
                    entry.record.diff_type.symbol(),
                    entry.record.source.display(),
                    entry.outcome
                );
            }
            println!("{}", report.summary());
            Ok(())
        }
        DiffCommands::List { name } => {
            let target = target::load(source, &name).await?;

            for meta in target::list_diffs(&target).await? {
                println!(
                    "{}  {}",
                    meta.created.format("%Y-%m-%d %H:%M:%S"),
                    meta.path.display()
                );
            }
            Ok(())
        }
    }
}

/// Pick the diff to resolve: the newest one with `--latest`, otherwise a
/// numbered choice on the terminal.
async fn select_diff(target: &Target, latest: bool) -> Result<Option<PathBuf>> {
    let diffs = target::list_diffs(target).await?;

    let Some(newest) = diffs.last() else {
        return Ok(None);
    };

    if latest || diffs.len() == 1 {
        return Ok(Some(newest.path.clone()));
    }

    for (index, meta) in diffs.iter().enumerate() {
        println!(
            "  [{}] {}  {}",
            index + 1,
            meta.created.format("%Y-%m-%d %H:%M:%S"),
            meta.path.display()
        );
    }

    loop {
        let answer = prompt(&format!("which diff? [1-{}, newest]: ", diffs.len()));
        if answer.is_empty() {
            return Ok(Some(newest.path.clone()));
        }
        match answer.parse::<usize>() {
            Ok(n) if (1..=diffs.len()).contains(&n) => {
                return Ok(Some(diffs[n - 1].path.clone()));
            }
            _ => println!("not a valid choice"),
        }
    }
}

async fn run_target(source: &Path, command: TargetCommands) -> Result<()> {
    match command {
        TargetCommands::Create {
            name,
            path,
            fast_mode,
        } => {
            let name = name.unwrap_or_else(|| required_prompt("target name: "));
            let path = path.unwrap_or_else(|| PathBuf::from(required_prompt("destination directory: ")));
            let fast_mode = fast_mode.unwrap_or_else(|| {
                matches!(prompt("fast mode? [y/N]: ").as_str(), "y" | "Y")
            });

            let created = target::create(source, &name, &path, fast_mode).await?;
            println!("created target {} for {}", created.name, created.path.display());
            Ok(())
        }
        TargetCommands::List => {
            for target in target::load_all(source).await? {
                println!(
                    "{} => {} ({})",
                    target.name,
                    target.path.display(),
                    if target.fast_mode {
                        "fast mode"
                    } else {
                        "hash mode"
                    }
                );
            }
            Ok(())
        }
        TargetCommands::Delete { name } => {
            target::delete(source, &name).await?;
            println!("deleted target {name}");
            Ok(())
        }
    }
}

async fn run_migrate(source: &Path) -> Result<()> {
    match legacy::migrate(source).await? {
        MigrationOutcome::Migrated {
            target,
            moved_diffs,
        } => {
            match target {
                Some(target) => println!(
                    "migrated: created target {} for {}, moved {} diff files",
                    target.name,
                    target.path.display(),
                    moved_diffs
                ),
                None => println!("migrated: no destination was set, no target created"),
            }
            Ok(())
        }
        MigrationOutcome::AlreadyCurrent => {
            println!("{} already uses the current layout", source.display());
            Ok(())
        }
        MigrationOutcome::NotControlled => {
            println!("{} is not under control of ddir", source.display());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_create_without_flags_falls_back_to_prompts() {
        let cli = Cli::try_parse_from(["ddir", "target", "create"]).unwrap();

        match cli.command {
            Commands::Target {
                command:
                    TargetCommands::Create {
                        name,
                        path,
                        fast_mode,
                    },
            } => {
                assert!(name.is_none());
                assert!(path.is_none());
                assert!(fast_mode.is_none());
            }
            _ => panic!("expected target create"),
        }
    }

    #[test]
    fn target_create_accepts_all_flags() {
        let cli = Cli::try_parse_from([
            "ddir",
            "target",
            "create",
            "--name",
            "usb",
            "--path",
            "/mnt/backup",
            "--fast-mode",
        ])
        .unwrap();

        match cli.command {
            Commands::Target {
                command:
                    TargetCommands::Create {
                        name,
                        path,
                        fast_mode,
                    },
            } => {
                assert_eq!(name.as_deref(), Some("usb"));
                assert_eq!(path, Some(PathBuf::from("/mnt/backup")));
                assert_eq!(fast_mode, Some(true));
            }
            _ => panic!("expected target create"),
        }
    }
}
