//! CLI `clusters` command: cluster recent memories and list the candidates.

use anyhow::{Context, Result};
use chrono::Utc;

use crate::cluster::{
    display_interestingness, rank_candidates, ClusterCandidate, ClusterFilter,
    ClusterRankingService, ClusterSort,
};
use crate::config::CairnConfig;
use crate::memory::store::recent_memories;
use crate::memory::types::EmbeddingKind;
use crate::splash::truncate_preview;
use crate::time::{format_age, format_scannable, format_span};

/// Characters of the representative memory shown per cluster.
const CENTROID_PREVIEW_CHARS: usize = 200;

/// Command-line overrides for a clustering run. `None` falls back to config.
#[derive(Debug, Default, Clone)]
pub struct ClusterArgs {
    pub algorithm: Option<String>,
    pub threshold: Option<f64>,
    pub embedding_type: Option<String>,
    pub n_clusters: Option<usize>,
    pub min_size: Option<usize>,
    pub min_interestingness: Option<f64>,
    pub sort_by: Option<String>,
    pub limit: Option<usize>,
}

/// A finished clustering run over the recent window.
pub(crate) struct ClusterRun {
    pub service: ClusterRankingService,
    pub candidates: Vec<ClusterCandidate>,
    pub memories_analyzed: usize,
    pub filter: ClusterFilter,
}

/// Load the recent window and cluster it. Runs on the blocking pool.
pub(crate) async fn run_clustering(config: &CairnConfig, args: &ClusterArgs) -> Result<ClusterRun> {
    let mut config = config.clone();
    if let Some(alg) = &args.algorithm {
        config.clustering.algorithm = alg.clone();
    }
    let service = ClusterRankingService::from_config(&config)?;

    let threshold = args
        .threshold
        .unwrap_or(config.clustering.similarity_threshold);
    let kind: EmbeddingKind = args
        .embedding_type
        .as_deref()
        .unwrap_or(&config.clustering.embedding_type)
        .parse()
        .map_err(anyhow::Error::msg)?;
    let sort_by: ClusterSort = args
        .sort_by
        .as_deref()
        .unwrap_or(&config.clustering.sort_by)
        .parse()
        .map_err(anyhow::Error::msg)?;
    let filter = ClusterFilter {
        min_cluster_size: args.min_size.unwrap_or(config.clustering.min_cluster_size),
        min_interestingness: args.min_interestingness,
        sort_by,
        limit: Some(args.limit.unwrap_or(config.clustering.limit)),
    };
    let n_clusters = args.n_clusters;

    tokio::task::spawn_blocking(move || -> Result<ClusterRun> {
        let conn = crate::db::open_database(config.resolved_db_path(), &config.embedding)?;
        let memories = recent_memories(&conn, config.clustering.max_memories)
            .context("failed to load memories")?;
        let candidates = service.cluster_memories(&memories, threshold, kind, n_clusters)?;
        Ok(ClusterRun {
            service,
            candidates,
            memories_analyzed: memories.len(),
            filter,
        })
    })
    .await?
}

fn format_score(score: f64) -> String {
    if score.is_infinite() {
        "inf".to_string()
    } else {
        format!("{score:.3}")
    }
}

/// Print one candidate's summary block.
pub(crate) fn print_candidate(candidate: &ClusterCandidate) {
    let now = Utc::now();
    println!(
        "Cluster {} ({} memories)",
        candidate.cluster_id, candidate.memory_count
    );
    println!("  Similarity:       {:.3}", candidate.similarity);
    println!(
        "  Interestingness:  {} (scaled {:.2})",
        format_score(candidate.interestingness_score),
        display_interestingness(candidate.interestingness_score)
    );
    println!(
        "  Span:             {} (latest {})",
        format_span(candidate.oldest, candidate.newest),
        format_age(candidate.newest, now)
    );
    let representative = candidate.centroid_memory();
    println!(
        "  Representative:   {} (similarity to centroid {:.3})",
        format_scannable(representative.created_at, &Utc),
        candidate.centroid_distance
    );
    println!(
        "     {}",
        truncate_preview(&representative.content, CENTROID_PREVIEW_CHARS)
    );
}

/// List ranked cluster candidates.
pub async fn clusters(config: &CairnConfig, args: &ClusterArgs) -> Result<()> {
    let run = run_clustering(config, args).await?;
    let found = run.candidates.len();
    let ranked = rank_candidates(run.candidates, &run.filter);

    println!(
        "Clustered {} memories with {}: {} cluster(s), {} shown (sorted by {})\n",
        run.memories_analyzed,
        run.service.algorithm(),
        found,
        ranked.len(),
        run.filter.sort_by
    );

    if ranked.is_empty() {
        println!(
            "No clusters with at least {} memories.",
            run.filter.min_cluster_size
        );
        return Ok(());
    }

    for candidate in &ranked {
        print_candidate(candidate);
        println!();
    }
    Ok(())
}
