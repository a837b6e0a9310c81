use clap::{Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod hook;
pub mod resolve;
pub mod run;
pub mod variable;

/// Output shapes for resolved environments
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `KEY=value` lines
    Dotenv,
    Json,
    Yaml,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a command with the resolved environment layered over the current one
    #[command(name = "run-with-environment", visible_alias = "run")]
    RunWithEnvironment {
        /// The command to run
        #[arg(short = 'c', long)]
        command: String,

        /// Stage for this run only (defaults to the active stage)
        #[arg(short = 's', long)]
        stage: Option<String>,

        /// Arguments appended verbatim to the command
        #[arg(short = 'a', long, allow_hyphen_values = true)]
        args: Option<String>,
    },

    /// Run one host lifecycle hook against the descriptor
    Hook {
        /// Hook name, e.g. before:deploy:createDeploymentArtifacts
        phase: String,

        /// Write the updated descriptor back instead of printing it
        #[arg(long)]
        write: bool,

        /// Write the updated descriptor to this path
        #[arg(short, long, conflicts_with = "write")]
        output: Option<PathBuf>,

        /// Command for runWithEnvironment:run
        #[arg(short = 'c', long)]
        command: Option<String>,

        /// Arguments for runWithEnvironment:run
        #[arg(short = 'a', long, allow_hyphen_values = true)]
        args: Option<String>,
    },

    /// List the lifecycle hooks the resolver answers
    Hooks,

    /// Print the resolved environment of the active stage
    Resolve {
        /// Output format
        #[arg(long, value_enum, default_value = "dotenv")]
        format: OutputFormat,

        /// Print the deploy variables instead of the environment
        #[arg(long)]
        variables: bool,
    },

    /// Resolve a variable expression such as `credstash:db.password` or `${opt:stage}`
    Variable {
        /// Expression or text containing `${...}` expressions
        expression: String,
    },
}
