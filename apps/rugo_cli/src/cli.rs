//! Command-line parsing and dispatch for `rugo`.
//!
//! Built on clap's derive API. A bare file argument runs it:
//! `rugo script.rugo` is `rugo run script.rugo`.

use clap::{Parser, Subcommand};
use rugo_base::{Result, RugoError};
use rugo_compile::BuildOptions;
use std::path::PathBuf;

/// The rugo compiler and tool runner.
#[derive(Parser)]
#[command(name = "rugo")]
#[command(about = "Compile Ruby-flavored scripts to native binaries", long_about = None)]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Script to run (`rugo script.rugo` is `rugo run script.rugo`).
    pub file: Option<PathBuf>,

    /// Arguments passed to the script.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile and run a script.
    Run {
        file: PathBuf,
        /// Arguments passed to the program.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Compile a script to a native binary.
    Build {
        file: PathBuf,
        /// Output path for the binary.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Fail instead of fetching: every remote module must be pinned
        /// in the lockfile.
        #[arg(long)]
        frozen: bool,
    },

    /// Print the generated Go source without building.
    Emit { file: PathBuf },

    /// Run `rats` test blocks.
    Rats {
        /// File or directory to test (default: current directory).
        path: Option<PathBuf>,
        /// Only run tests whose name matches this regular expression.
        #[arg(long)]
        filter: Option<String>,
        /// Number of files to test in parallel.
        #[arg(short = 'j', default_value_t = 1)]
        jobs: usize,
        /// Raw TAP output.
        #[arg(long)]
        tap: bool,
        /// Print per-test timing.
        #[arg(long)]
        timing: bool,
    },

    /// Run `bench` blocks.
    Bench {
        /// File or directory to benchmark (default: current directory).
        path: Option<PathBuf>,
    },

    /// Show documentation extracted from `#` comments.
    Doc {
        /// File, optionally with a symbol: `file.rugo` or `file.rugo:greet`.
        target: Option<String>,
    },

    /// Lockfile maintenance.
    Mod {
        #[command(subcommand)]
        command: ModCommands,
    },

    /// Install rugo programs as tools on PATH.
    Tool {
        #[command(subcommand)]
        command: ToolCommands,
    },
}

#[derive(Subcommand)]
pub enum ModCommands {
    /// Drop lockfile entries no longer required.
    Tidy,
    /// Re-resolve branch-pinned remote modules.
    Update,
}

#[derive(Subcommand)]
pub enum ToolCommands {
    /// Build a script and install it into the tool directory.
    Install { file: PathBuf },
    /// List installed tools.
    List,
    /// Remove an installed tool.
    Remove { name: String },
}

/// Parses arguments and runs the selected command; returns the exit code.
pub fn run_cli() -> i32 {
    let cli = Cli::parse();
    match dispatch(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {}", err);
            if err.is_internal() {
                2
            } else {
                1
            }
        }
    }
}

fn dispatch(cli: Cli) -> Result<i32> {
    let command = match cli.command {
        Some(command) => command,
        None => match cli.file {
            Some(file) => Commands::Run {
                file,
                args: cli.args,
            },
            None => {
                return Err(RugoError::new(
                    "nothing to do; try 'rugo run <file>' or 'rugo --help'",
                ))
            }
        },
    };

    match command {
        Commands::Run { file, args } => {
            let opts = BuildOptions::default();
            rugo_compile::run_entry(&file, &opts, &args)
        }
        Commands::Build {
            file,
            output,
            frozen,
        } => {
            let opts = BuildOptions {
                frozen,
                ..Default::default()
            };
            let bin = rugo_compile::build_binary(&file, &opts, output.as_deref())?;
            println!("built {}", bin.display());
            Ok(0)
        }
        Commands::Emit { file } => {
            let emitted = rugo_compile::compile_entry(&file, &BuildOptions::default())?;
            print!("{}", emitted.go_source);
            Ok(0)
        }
        Commands::Rats {
            path,
            filter,
            jobs,
            tap,
            timing,
        } => crate::rats::run_rats(
            path.unwrap_or_else(|| PathBuf::from(".")),
            crate::rats::RatsOptions {
                filter,
                jobs: jobs.max(1),
                tap,
                timing,
            },
        ),
        Commands::Bench { path } => {
            crate::rats::run_bench(path.unwrap_or_else(|| PathBuf::from(".")))
        }
        Commands::Doc { target } => crate::doc::run_doc(target.as_deref()),
        Commands::Mod { command } => match command {
            ModCommands::Tidy => crate::modcmd::tidy(),
            ModCommands::Update => crate::modcmd::update(),
        },
        Commands::Tool { command } => match command {
            ToolCommands::Install { file } => crate::tool::install(&file),
            ToolCommands::List => crate::tool::list(),
            ToolCommands::Remove { name } => crate::tool::remove(&name),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn bare_file_parses_as_run() {
        let cli = Cli::parse_from(["rugo", "script.rugo", "--flag-for-script"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.file, Some(PathBuf::from("script.rugo")));
        assert_eq!(cli.args, vec!["--flag-for-script"]);
    }

    #[test]
    fn build_flags_parse() {
        let cli = Cli::parse_from(["rugo", "build", "app.rugo", "-o", "app", "--frozen"]);
        let Some(Commands::Build {
            output, frozen, ..
        }) = cli.command
        else {
            panic!("expected build");
        };
        assert_eq!(output, Some(PathBuf::from("app")));
        assert!(frozen);
    }

    #[test]
    fn rats_flags_parse() {
        let cli = Cli::parse_from(["rugo", "rats", "tests", "--filter", "net.*", "-j", "4", "--tap"]);
        let Some(Commands::Rats {
            path,
            filter,
            jobs,
            tap,
            timing,
        }) = cli.command
        else {
            panic!("expected rats");
        };
        assert_eq!(path, Some(PathBuf::from("tests")));
        assert_eq!(filter.as_deref(), Some("net.*"));
        assert_eq!(jobs, 4);
        assert!(tap);
        assert!(!timing);
    }
}
