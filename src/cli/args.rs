//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Use this config file instead of searching
//! - `--dbdir <dir>`: Store directory (overrides config)
//! - `--schema <file>`: Schema definition file (overrides config)
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::core::types::{EditOp, StoreName};

/// xmldb - transactional, schema-directed XML configuration store
#[derive(Parser, Debug)]
#[command(name = "xmldb")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to load instead of the default search path
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory holding the store files
    #[arg(long, global = true, value_name = "DIR")]
    pub dbdir: Option<PathBuf>,

    /// Schema definition file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    pub schema: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Print only results and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an empty store if it does not exist
    Init {
        /// Store to create
        store: StoreName,
    },

    /// Print the contents of a store
    #[command(after_help = "\
EXAMPLES:
    # Whole store
    xmldb get candidate

    # One list entry, as JSON
    xmldb get running --query \"/interfaces/interface[name='eth0']\" --json")]
    Get {
        /// Store to read
        store: StoreName,

        /// Path query selecting what to return (default: everything)
        #[arg(long)]
        query: Option<String>,

        /// Print JSON instead of XML
        #[arg(long)]
        json: bool,
    },

    /// Apply an XML edit to a store
    #[command(after_help = "\
OPERATIONS:
    merge, replace, create, delete, remove, none

EXAMPLES:
    # Merge a fragment read from stdin
    echo '<system><hostname>r1</hostname></system>' | xmldb put candidate merge

    # Replace one list entry addressed by key
    xmldb put candidate replace --path /interfaces/interface=eth0 --file eth0.xml

    # Delete a leaf
    xmldb put candidate delete --path /system/hostname")]
    Put {
        /// Store to edit
        store: StoreName,

        /// Default operation for the edit
        op: EditOp,

        /// Key-annotated path of the node the edit applies to
        #[arg(long)]
        path: Option<String>,

        /// Read the edit from this file instead of stdin
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Copy one store over another
    Copy {
        /// Store to copy from
        from: StoreName,
        /// Store to overwrite
        to: StoreName,
    },

    /// Delete a store's backing file
    Delete {
        /// Store to delete
        store: StoreName,
    },

    /// Print whether a store exists (`true` or `false`)
    Exists {
        /// Store to check
        store: StoreName,
    },

    /// Validate the target store against the source store
    Validate {
        /// Store holding the current configuration
        #[arg(long, default_value = "running")]
        source: StoreName,

        /// Store holding the proposed configuration
        #[arg(long, default_value = "candidate")]
        target: StoreName,
    },

    /// Commit the target store into the source store
    Commit {
        /// Store receiving the configuration
        #[arg(long, default_value = "running")]
        source: StoreName,

        /// Store holding the proposed configuration
        #[arg(long, default_value = "candidate")]
        target: StoreName,
    },
}
