use std::path::PathBuf;

use clap::{
    Parser,
    Subcommand,
};

#[derive(Debug, Parser)]
#[command(
    name = "snapdex",
    about = "Paginated full-text search over a single-writer index"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upsert numbered sample documents (id, title, status, time)
    Seed(SeedArgs),
    /// Insert or replace one document
    Upsert(UpsertArgs),
    /// Delete a document by id
    Delete {
        /// Document id
        id: String,
    },
    /// Search one page of results
    Search(SearchArgs),
    /// Count matching documents
    Count(CountArgs),
    /// Show index statistics
    Status(StatusArgs),
}

// -- Seed --

#[derive(Debug, Parser)]
pub struct SeedArgs {
    /// Number of documents, with ids 1..=count
    #[arg(short = 'n', long, default_value = "1000")]
    pub count: u64,
}

// -- Upsert --

#[derive(Debug, Parser)]
pub struct UpsertArgs {
    /// Document id
    pub id: String,

    /// Field values as name=value (repeatable)
    #[arg(short, long = "field", value_parser = parse_assignment)]
    pub fields: Vec<(String, String)>,
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.is_empty() => {
            Ok((name.to_string(), value.to_string()))
        }
        _ => Err(format!("expected name=value, got '{s}'")),
    }
}

// -- Search --

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// The search query (a single term with * or ? is a wildcard match)
    pub query: String,

    /// Default field to search
    #[arg(short, long, default_value = "title")]
    pub field: String,

    /// Page number, starting at 1
    #[arg(short, long, default_value = "1")]
    pub page: usize,

    /// Results per page
    #[arg(short = 'n', long, default_value = "10")]
    pub page_size: usize,

    /// Order by this sortable field instead of relevance
    #[arg(short, long)]
    pub sort: Option<String>,

    /// Sort descending
    #[arg(long, requires = "sort")]
    pub desc: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Count --

#[derive(Debug, Parser)]
pub struct CountArgs {
    /// The search query
    pub query: String,

    /// Default field to search
    #[arg(short, long, default_value = "title")]
    pub field: String,
}

// -- Status --

#[derive(Debug, Parser)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parse_search_defaults() {
        let cli = Cli::parse_from(["snapdex", "search", "Document*"]);
        match cli.command {
            Command::Search(args) => {
                assert_eq!(args.query, "Document*");
                assert_eq!(args.field, "title");
                assert_eq!(args.page, 1);
                assert_eq!(args.page_size, 10);
                assert!(args.sort.is_none());
                assert!(!args.desc);
            }
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn parse_upsert_fields() {
        let cli = Cli::parse_from([
            "snapdex", "upsert", "7", "-f", "title=Hello", "--field", "time=5",
        ]);
        match cli.command {
            Command::Upsert(args) => {
                assert_eq!(args.id, "7");
                assert_eq!(args.fields, [
                    ("title".to_string(), "Hello".to_string()),
                    ("time".to_string(), "5".to_string()),
                ]);
            }
            _ => panic!("expected upsert command"),
        }
    }

    #[test]
    fn upsert_field_needs_equals() {
        assert!(
            Cli::try_parse_from(["snapdex", "upsert", "7", "-f", "title"])
                .is_err()
        );
    }

    #[test]
    fn desc_requires_sort() {
        assert!(
            Cli::try_parse_from(["snapdex", "search", "x", "--desc"]).is_err()
        );
    }
}
