use anyhow::Result;

use crate::config::CairnConfig;
use crate::memory::store::memory_counts;

/// Display memory statistics in the terminal.
pub fn stats(config: &CairnConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = crate::db::open_database(&db_path, &config.embedding)?;

    let counts = memory_counts(&conn)?;

    println!("Memory Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total memories:      {}", counts.total);
    println!("  Semantic embeddings: {}", counts.with_semantic);
    println!("  Emotional embeddings: {}", counts.with_emotional);
    println!();

    if let Some((semantic, emotional)) = crate::db::migrations::get_embedding_dims(&conn)? {
        println!("Dimensions:            {semantic} semantic, {emotional} emotional");
    }
    println!("Database:              {}", db_path.display());

    if let Some(ref oldest) = counts.oldest {
        println!("Oldest memory:         {oldest}");
    }
    if let Some(ref newest) = counts.newest {
        println!("Newest memory:         {newest}");
    }

    Ok(())
}
