//! Metastore command-line tool.
//!
//! Provides the `udfcat-meta` binary, which edits the function catalog's
//! SQLite metastore directly, the way an external metastore client would.
//! Functions it creates are class-level JAR entities with no signature;
//! the catalog picks them up on its next `INVALIDATE METADATA`.

mod commands;

use std::io;
use std::process;

use clap::{Parser, Subcommand};

use udfcat_storage::SqliteMetastore;

use commands::{execute, Statement};

/// Function catalog metastore tool.
#[derive(Parser)]
#[command(name = "udfcat-meta", about = "Edit the function catalog metastore")]
struct Cli {
    /// Path to the metastore database file.
    #[arg(short, long, global = true, default_value = "udfcat.db")]
    db: String,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Create a database.
    CreateDatabase {
        name: String,

        #[arg(long)]
        if_not_exists: bool,
    },

    /// Drop a database.
    DropDatabase {
        name: String,

        /// Also drop every function in the database.
        #[arg(long)]
        cascade: bool,

        #[arg(long)]
        if_exists: bool,
    },

    /// Create a Java function from a class in a JAR.
    CreateFunction {
        #[arg(long)]
        database: String,

        #[arg(long)]
        name: String,

        /// Fully qualified UDF class name.
        #[arg(long)]
        class: String,

        /// JAR holding the class.
        #[arg(long)]
        jar: String,
    },

    /// Drop every entity of a function name.
    DropFunction {
        #[arg(long)]
        database: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        if_exists: bool,
    },

    /// Print the stored entities of a function.
    DescribeFunction {
        #[arg(long)]
        database: String,

        #[arg(long)]
        name: String,

        /// Print the raw entities as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List function names in a database.
    ShowFunctions {
        #[arg(long)]
        database: String,

        /// Name pattern: `*` wildcards, `|` alternatives.
        #[arg(long)]
        like: Option<String>,
    },
}

impl From<Commands> for Statement {
    fn from(command: Commands) -> Self {
        match command {
            Commands::CreateDatabase { name, if_not_exists } => Statement::CreateDatabase { name, if_not_exists },
            Commands::DropDatabase {
                name,
                cascade,
                if_exists,
            } => Statement::DropDatabase {
                name,
                cascade,
                if_exists,
            },
            Commands::CreateFunction {
                database,
                name,
                class,
                jar,
            } => Statement::CreateFunction {
                database,
                name,
                class,
                jar,
            },
            Commands::DropFunction {
                database,
                name,
                if_exists,
            } => Statement::DropFunction {
                database,
                name,
                if_exists,
            },
            Commands::DescribeFunction { database, name, json } => {
                Statement::DescribeFunction { database, name, json }
            }
            Commands::ShowFunctions { database, like } => Statement::ShowFunctions { database, like },
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let exit_code = run(&cli.db, cli.command.into());
    process::exit(exit_code);
}

/// Opens the metastore and executes one statement.
///
/// Returns the exit code: 0 on success, 1 if the statement was rejected,
/// 2 on an I/O or store failure.
fn run(db: &str, statement: Statement) -> i32 {
    let store = match SqliteMetastore::new(db) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: failed to open metastore '{}': {}", db, e);
            return 2;
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match execute(&store, &statement, &mut out) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}
