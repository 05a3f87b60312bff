use clap::{Parser, Subcommand};

/// Runs a recurring vote where everyone picks two games and one winner comes out.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON configuration file. See the manual for the supported fields.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) The JSON file holding the candidates, the votes, the voting period and the
    /// results. Setting this option overrides the path that may be specified in the configuration.
    #[clap(short, long, value_parser)]
    pub state: Option<String>,

    /// (user name) The user running the command. Administrators are listed in the configuration.
    #[clap(short, long, value_parser)]
    pub user: Option<String>,

    /// (number, optional) Seed for the random draw between tied candidates.
    #[clap(long, value_parser)]
    pub seed: Option<u64>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Shows whether voting is open, and whether the user may vote.
    Status,
    /// Opens voting (administrators only).
    Open,
    /// Closes voting and computes the winner (administrators only).
    Close,
    /// Casts a ballot for two different candidates.
    Vote {
        #[clap(value_parser)]
        candidates: Vec<String>,
    },
    /// Lists the candidates that can be voted for.
    Candidates {
        /// Also list the disabled candidates (administrators only).
        #[clap(long, takes_value = false)]
        all: bool,
    },
    /// Registers a new candidate (administrators only).
    AddCandidate {
        #[clap(value_parser)]
        name: String,
        /// Register the candidate as disabled.
        #[clap(long, takes_value = false)]
        disabled: bool,
    },
    /// Makes a candidate available on the ballot (administrators only).
    Enable {
        #[clap(value_parser)]
        name: String,
    },
    /// Removes a candidate from the ballot (administrators only).
    Disable {
        #[clap(value_parser)]
        name: String,
    },
    /// Registers the candidates listed in a CSV file (administrators only).
    Import {
        #[clap(value_parser)]
        path: String,
    },
    /// Shows the outcome of the last closed period.
    Results {
        /// (file path or 'stdout') If specified, a JSON summary of the result is written there.
        #[clap(short, long, value_parser)]
        out: Option<String>,
        /// (file path) A reference JSON summary. If provided, the command fails when the
        /// summary differs from it.
        #[clap(short, long, value_parser)]
        reference: Option<String>,
    },
    /// Records the missing result of the last closed period (administrators only).
    Retally,
}

impl Command {
    /// Whether the command may change the state file.
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Command::Status | Command::Candidates { .. } | Command::Results { .. }
        )
    }
}
