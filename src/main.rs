mod cli;

use cairn::{cluster, config, db, memory, splash, time};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use cli::clusters::ClusterArgs;

#[derive(Parser)]
#[command(name = "cairn", version, about = "Memory clustering and splash analysis")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import memories with precomputed embeddings from a JSONL file
    Import {
        /// Path to the JSONL file
        file: PathBuf,
    },
    /// Cluster recent memories and list the most interesting groups
    Clusters {
        #[command(flatten)]
        options: ClusterOptions,
    },
    /// Show all members of one cluster from a fresh run
    Cluster {
        /// Cluster label as printed by `clusters`
        id: i32,
        #[command(flatten)]
        options: ClusterOptions,
    },
    /// Most and least similar memories to a stored memory
    Splash {
        /// Memory id
        id: String,
        /// Embedding space: semantic or emotional
        #[arg(long)]
        mode: Option<String>,
        /// Results per side
        #[arg(long)]
        count: Option<usize>,
    },
    /// Show memory statistics
    Stats,
}

#[derive(Args)]
struct ClusterOptions {
    /// hdbscan, dbscan, agglomerative or kmeans
    #[arg(long)]
    algorithm: Option<String>,
    /// Minimum cosine similarity for memories to be related
    #[arg(long)]
    threshold: Option<f64>,
    /// Embedding space: semantic or emotional
    #[arg(long = "embedding")]
    embedding_type: Option<String>,
    /// Cluster count for kmeans (default: sqrt of the memory count)
    #[arg(long)]
    n_clusters: Option<usize>,
    /// Hide clusters with fewer members
    #[arg(long)]
    min_size: Option<usize>,
    /// Hide clusters below this raw interestingness score
    #[arg(long)]
    min_interestingness: Option<f64>,
    /// interestingness, size or recency
    #[arg(long)]
    sort: Option<String>,
    /// Maximum clusters to show
    #[arg(long)]
    limit: Option<usize>,
}

impl From<ClusterOptions> for ClusterArgs {
    fn from(o: ClusterOptions) -> Self {
        Self {
            algorithm: o.algorithm,
            threshold: o.threshold,
            embedding_type: o.embedding_type,
            n_clusters: o.n_clusters,
            min_size: o.min_size,
            min_interestingness: o.min_interestingness,
            sort_by: o.sort,
            limit: o.limit,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = config::CairnConfig::load()?;

    // Log to stderr so stdout carries only command output.
    let filter = EnvFilter::try_new(&config.logging.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Import { file } => cli::import::import(&config, &file)?,
        Command::Clusters { options } => cli::clusters::clusters(&config, &options.into()).await?,
        Command::Cluster { id, options } => {
            cli::cluster::cluster(&config, &options.into(), id).await?
        }
        Command::Splash { id, mode, count } => {
            cli::splash::splash(&config, &id, mode.as_deref(), count).await?
        }
        Command::Stats => cli::stats::stats(&config)?,
    }

    Ok(())
}
