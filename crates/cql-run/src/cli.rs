use clap::{Parser, Subcommand};
use cql_builder::{Query, Settings};
use miette::{IntoDiagnostic, WrapErr, miette};
use std::io::{self, Read};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cql")]
#[command(version)]
#[command(after_help = "Examples:\n\n\
    To normalize a query:\n\
    $ cql fmt '[word=\"house\"&pos=\"N.*\"]'\n\n\
    To check that a query file is already normalized:\n\
    $ cql fmt --check < query.cql\n\n\
    To inspect the group tree with custom fields:\n\
    $ cql --config fields.toml tree '[tag=\"NN\"]'")]
#[command(
    about = "cql parses token-pattern corpus queries, normalizes them and shows their group structure.",
    long_about = None
)]
pub struct Cli {
    #[clap(subcommand)]
    commands: Commands,

    /// Load the field registry from a TOML file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Parse a query and print it in normalized form
    Fmt {
        /// Fail if the query is not already normalized
        #[arg(short, long)]
        check: bool,
        /// Query text, read from stdin when omitted
        query: Option<String>,
    },
    /// Print the token and group tree rebuilt from a query
    Tree {
        /// Query text, read from stdin when omitted
        query: Option<String>,
    },
    /// Report whether a query is valid for the configured fields
    Check {
        /// Query text, read from stdin when omitted
        query: Option<String>,
    },
}

impl Cli {
    pub fn run(&self) -> miette::Result<()> {
        let settings = self.settings()?;

        match &self.commands {
            Commands::Fmt { check, query } => {
                let text = read_query(query.as_deref())?;
                let formatted = load(&text, &settings)?.serialize();

                if *check && formatted != text {
                    return Err(miette!("The query is not normalized, expected: {formatted}"));
                }

                println!("{formatted}");
                Ok(())
            }
            Commands::Tree { query } => {
                let text = read_query(query.as_deref())?;
                print!("{}", load(&text, &settings)?.tree_view());
                Ok(())
            }
            Commands::Check { query } => {
                let text = read_query(query.as_deref())?;
                load(&text, &settings)?;
                println!("ok");
                Ok(())
            }
        }
    }

    fn settings(&self) -> miette::Result<Settings> {
        match &self.config {
            Some(path) => Settings::load(path)
                .into_diagnostic()
                .wrap_err_with(|| format!("Failed to load settings from {}", path.display())),
            None => Ok(Settings::default()),
        }
    }
}

fn load(text: &str, settings: &Settings) -> miette::Result<Query> {
    let query = cql_builder::parse(text, settings)?;
    log::debug!("Loaded {} tokens", query.len());
    Ok(query)
}

fn read_query(query: Option<&str>) -> miette::Result<String> {
    match query {
        Some(query) => Ok(query.to_string()),
        None => {
            let mut input = String::new();
            io::stdin().read_to_string(&mut input).into_diagnostic()?;
            Ok(input.trim_end_matches(['\r', '\n']).to_string())
        }
    }
}
