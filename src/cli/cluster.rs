//! CLI `cluster` command: show every member of one cluster.

use anyhow::{bail, Result};
use chrono::Utc;

use super::clusters::{print_candidate, run_clustering, ClusterArgs};
use crate::config::CairnConfig;
use crate::time::format_readable;

/// Re-run clustering with the same parameters and print cluster `cluster_id`.
///
/// Labels are only stable for identical inputs, so the lookup goes through
/// the run that was just cached.
pub async fn cluster(config: &CairnConfig, args: &ClusterArgs, cluster_id: i32) -> Result<()> {
    let run = run_clustering(config, args).await?;
    let Some(candidate) = run.service.cached_cluster(cluster_id) else {
        let known: Vec<String> = run
            .candidates
            .iter()
            .map(|c| c.cluster_id.to_string())
            .collect();
        bail!(
            "no cluster {cluster_id} in the current run (available: {})",
            if known.is_empty() { "none".to_string() } else { known.join(", ") }
        );
    };

    print_candidate(&candidate);
    println!();

    let now = Utc::now();
    let mut members: Vec<_> = candidate.memories.iter().collect();
    members.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    for (i, memory) in members.iter().enumerate() {
        println!(
            "  {}. [{}] {}",
            i + 1,
            format_readable(memory.created_at, now, &Utc),
            memory.id
        );
        println!("     {}", memory.content);
    }
    Ok(())
}
