//! CLI command definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Restartr - restart-on-failure orchestration for external calculations
#[derive(Parser, Debug)]
#[command(name = "restartr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Echo workflow reports to the terminal
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a workflow against a scripted engine
    Run {
        /// YAML file with the workflow inputs
        inputs: PathBuf,

        /// YAML list of scripted outcomes, one per submission
        #[arg(short, long)]
        script: PathBuf,

        /// Override the iteration cap
        #[arg(short = 'n', long)]
        max_iterations: Option<u32>,

        /// Clean remote folders on termination
        #[arg(long)]
        clean_workdir: bool,
    },

    /// Resume a stored workflow
    Resume {
        /// Workflow ID
        id: String,

        /// YAML list of scripted outcomes for the remaining submissions
        #[arg(short, long)]
        script: PathBuf,
    },

    /// Show a stored workflow
    Status {
        /// Workflow ID
        id: String,

        /// Print the full report log
        #[arg(short, long)]
        detailed: bool,
    },

    /// List stored workflows
    List {
        /// Only workflows without a result
        #[arg(short, long)]
        unfinished: bool,
    },

    /// Print the exit code table
    ExitCodes,

    /// Print registered handlers in dispatch order
    Handlers {
        /// Workflow kind (default: all)
        kind: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_required() {
        assert!(Cli::try_parse_from(["restartr"]).is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["restartr", "-v", "-c", "/etc/restartr.yml", "list"]).unwrap();
        assert!(cli.is_verbose());
        assert_eq!(cli.config, Some(PathBuf::from("/etc/restartr.yml")));
        assert!(matches!(cli.command, Commands::List { unfinished: false }));
    }

    #[test]
    fn test_run_command() {
        let cli = Cli::try_parse_from([
            "restartr",
            "run",
            "inputs.yml",
            "--script",
            "outcomes.yml",
            "-n",
            "3",
            "--clean-workdir",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                inputs,
                script,
                max_iterations,
                clean_workdir,
            } => {
                assert_eq!(inputs, PathBuf::from("inputs.yml"));
                assert_eq!(script, PathBuf::from("outcomes.yml"));
                assert_eq!(max_iterations, Some(3));
                assert!(clean_workdir);
            }
            _ => panic!("Expected run command"),
        }
    }

    #[test]
    fn test_run_requires_script() {
        assert!(Cli::try_parse_from(["restartr", "run", "inputs.yml"]).is_err());
    }

    #[test]
    fn test_resume_command() {
        let cli = Cli::try_parse_from(["restartr", "resume", "wf-1-abcd", "-s", "rest.yml"]).unwrap();
        match cli.command {
            Commands::Resume { id, script } => {
                assert_eq!(id, "wf-1-abcd");
                assert_eq!(script, PathBuf::from("rest.yml"));
            }
            _ => panic!("Expected resume command"),
        }
    }

    #[test]
    fn test_status_detailed() {
        let cli = Cli::try_parse_from(["restartr", "status", "wf-1", "--detailed"]).unwrap();
        assert!(matches!(cli.command, Commands::Status { detailed: true, .. }));
    }

    #[test]
    fn test_handlers_optional_kind() {
        let cli = Cli::try_parse_from(["restartr", "handlers"]).unwrap();
        assert!(matches!(cli.command, Commands::Handlers { kind: None }));
        let cli = Cli::try_parse_from(["restartr", "exit-codes"]).unwrap();
        assert!(matches!(cli.command, Commands::ExitCodes));
    }
}
