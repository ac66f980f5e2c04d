use clap::{Parser, Subcommand, ValueEnum};
use horus_db::repository::{SortDirection, SortField};

#[derive(Parser)]
#[command(about, version)]
pub struct Args {
    /// Increase logging verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Caller identity flags. The registry has no user store of its own; the
/// identity is asserted by whatever wraps the CLI.
#[derive(clap::Args)]
pub struct OwnerArgs {
    /// Owner id the operation is performed as
    #[arg(long = "owner-id")]
    pub owner_id: String,

    /// Display name recorded as the package maintainer
    #[arg(long = "owner-name", default_value = "")]
    pub owner_name: String,

    /// Email recorded as the package maintainer contact
    #[arg(long = "owner-email", default_value = "")]
    pub owner_email: String,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum SortArg {
    Name,
    Downloads,
    Created,
    Updated,
}

impl From<SortArg> for SortField {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::Name => SortField::Name,
            SortArg::Downloads => SortField::Downloads,
            SortArg::Created => SortField::CreatedAt,
            SortArg::Updated => SortField::UpdatedAt,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DirectionArg {
    Asc,
    Desc,
}

impl From<DirectionArg> for SortDirection {
    fn from(direction: DirectionArg) -> Self {
        match direction {
            DirectionArg::Asc => SortDirection::Asc,
            DirectionArg::Desc => SortDirection::Desc,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Publish a package from a git repository or a local archive
    #[command(arg_required_else_help = true)]
    Publish {
        /// Repository URL to clone and publish
        #[arg(required_unless_present = "archive")]
        url: Option<String>,

        /// Publish a local gzip'd tar archive instead of cloning
        #[arg(long, conflicts_with = "url")]
        archive: Option<String>,

        #[command(flatten)]
        owner: OwnerArgs,
    },

    /// Print the catalog list document
    Catalog {
        /// Print the byte-offset index instead of the list
        #[arg(long)]
        index: bool,
    },

    /// List packages, one JSON page at a time
    List {
        /// Sort key
        #[arg(short, long, value_enum, default_value = "name")]
        sort: SortArg,

        /// Sort direction
        #[arg(short, long, value_enum, default_value = "asc")]
        direction: DirectionArg,

        /// Page number, starting at 1
        #[arg(short, long, default_value_t = 1)]
        page: i64,
    },

    /// Search packages by name, description, or tags
    Search {
        /// Search term
        term: String,

        /// Page number, starting at 1
        #[arg(short, long, default_value_t = 1)]
        page: i64,

        /// Results per page
        #[arg(long, default_value_t = 20)]
        per_page: i64,
    },

    /// Show a package and its release history
    Info {
        /// Package name
        package: String,
    },

    /// Download a package artifact
    Download {
        /// Package name
        package: String,

        /// Version to fetch
        #[arg(short = 'V', long, default_value = "latest")]
        version: String,

        /// Output path (default: <name>-<version>.tar.gz)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Remove a package and all of its versions
    Remove {
        /// Package name
        package: String,

        #[command(flatten)]
        owner: OwnerArgs,
    },

    /// Show operation counters for this process
    Status,

    /// Write a default configuration file
    DefConfig,
}
