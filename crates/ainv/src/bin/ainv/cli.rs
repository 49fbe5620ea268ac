//! ainv cli interface

use ainv::walker::ParseOptions;
use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    ///
    /// This is equivalent to running { cd <directory>; ainv ... }
    #[clap(short = 'C', long = "directory", global(true))]
    pub directory: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse an inventory and print normalized hosts/groups/defaults
    #[command(alias = "p")]
    Parse(ParseCommand),

    /// Print debug information for development
    Dev(DevCommand),
}

#[derive(Parser, Debug)]
pub struct ParseCommand {
    #[clap(flatten)]
    pub input: InputArgs,

    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct InputArgs {
    /// Path to the inventory hosts file
    #[clap(default_value = "hosts")]
    pub hostsfile: PathBuf,

    /// Abort when the group tree nests deeper than this
    #[clap(long = "max-group-depth", default_value_t = ParseOptions::default().max_group_depth)]
    pub max_group_depth: usize,

    /// Abort when a vars directory nests deeper than this
    #[clap(long = "max-vars-depth", default_value_t = ParseOptions::default().max_vars_depth)]
    pub max_vars_depth: usize,
}

impl InputArgs {
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            max_group_depth: self.max_group_depth,
            max_vars_depth: self.max_vars_depth,
        }
    }
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    Json,
    #[default]
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}

#[derive(Parser, Debug)]
pub struct DevCommand {
    #[command(subcommand)]
    pub command: DevSubCommand,
}

#[derive(Subcommand, Debug)]
pub enum DevSubCommand {
    /// Print the raw group tree as parsed from the source file
    Raw {
        #[clap(default_value = "hosts")]
        hostsfile: PathBuf,
    },
    /// Print the normalized records after the walk
    Records {
        #[clap(default_value = "hosts")]
        hostsfile: PathBuf,
    },
}
