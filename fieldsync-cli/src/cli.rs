use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use fieldsync_types::SyncDomain;

#[derive(Parser)]
#[command(
    name = "fieldsync",
    about = "FieldSync - connection diagnostics and data sync for the field sales client",
    version = env!("CARGO_PKG_VERSION"),
    author,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "FIELDSYNC_DATA_DIR", help = "Data directory (default ~/.fieldsync)")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Resolve a server and show connection and cache status")]
    Status {
        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },

    #[command(about = "Probe every configured server")]
    TestServers {
        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },

    #[command(about = "Refresh all domains, or a single one")]
    Refresh {
        #[arg(value_enum, help = "Only refresh this domain")]
        domain: Option<DomainArg>,

        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },

    #[command(about = "List locally stored entities of a domain")]
    List {
        #[arg(value_enum)]
        domain: DomainArg,

        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },

    #[command(about = "Create a contact on the active server")]
    AddContact {
        #[arg(long)]
        address: String,

        #[arg(long)]
        city: String,

        #[arg(long)]
        state: String,

        #[arg(long)]
        zip: String,

        #[arg(long)]
        owner: String,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long, help = "Fiber service is available at the address")]
        fiber: bool,
    },

    #[command(about = "Delete cached entities and reset the last sync time")]
    ClearCache,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DomainArg {
    Contacts,
    Incidents,
    Analytics,
    RollingSales,
}

impl From<DomainArg> for SyncDomain {
    fn from(arg: DomainArg) -> Self {
        match arg {
            DomainArg::Contacts => SyncDomain::Contacts,
            DomainArg::Incidents => SyncDomain::Incidents,
            DomainArg::Analytics => SyncDomain::Analytics,
            DomainArg::RollingSales => SyncDomain::RollingSales,
        }
    }
}
