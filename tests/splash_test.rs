mod helpers;

use cairn::error::EngineError;
use cairn::memory::store::insert_memory;
use cairn::memory::types::{EmbeddingKind, Memory};
use cairn::splash::{format_splash_output, Relationship, SplashEngine, SplashQuery, SplashResult};

fn ids(results: &[SplashResult]) -> Vec<&str> {
    results.iter().map(|r| r.memory_id.as_str()).collect()
}

/// Ten memories fanned out from `[1,0,0]` to `[-1,0,0]` in 20 degree steps.
fn fan() -> Vec<Memory> {
    (0..10)
        .map(|i| {
            let angle = (i as f32 * 20.0).to_radians();
            helpers::memory(&format!("m{i}"), i, &[angle.cos(), angle.sin(), 0.0])
        })
        .collect()
}

#[test]
fn both_extremes_are_reported_from_the_store() {
    let conn = helpers::test_db();
    helpers::insert_all(&conn, &fan());

    let query = [1.0f32, 0.0, 0.0];
    let analysis = SplashEngine::new(&conn)
        .generate_splash(&SplashQuery::semantic(&query), EmbeddingKind::Semantic, None, 3)
        .unwrap();

    assert_eq!(analysis.total_analyzed, 10);
    assert_eq!(analysis.mode, EmbeddingKind::Semantic);
    assert_eq!(ids(&analysis.most_similar), vec!["m0", "m1", "m2"]);
    assert_eq!(ids(&analysis.least_similar), vec!["m9", "m8", "m7"]);

    assert!(analysis
        .most_similar
        .windows(2)
        .all(|w| w[0].similarity_score >= w[1].similarity_score));
    assert!(analysis
        .least_similar
        .windows(2)
        .all(|w| w[0].similarity_score <= w[1].similarity_score));
    assert!(analysis
        .most_similar
        .iter()
        .all(|r| r.relationship_type == Relationship::MostSimilar));
    assert!(analysis
        .least_similar
        .iter()
        .all(|r| r.relationship_type == Relationship::LeastSimilar));
}

#[test]
fn opposite_memories_score_negative() {
    let conn = helpers::test_db();
    helpers::insert_all(&conn, &fan());

    let query = [1.0f32, 0.0, 0.0];
    let analysis = SplashEngine::new(&conn)
        .generate_splash(&SplashQuery::semantic(&query), EmbeddingKind::Semantic, None, 2)
        .unwrap();

    let opposite = &analysis.least_similar[0];
    assert_eq!(opposite.memory_id, "m9");
    assert!((opposite.similarity_score + 1.0).abs() < 1e-5);

    let rendered = format_splash_output(&analysis);
    assert!(rendered.contains("**2 Most Similar**"));
    assert!(rendered.contains("**2 Least Similar**"));
    assert!(rendered.contains("% similar (negative)"));
    assert!(rendered.contains("Analyzed 10 memories"));
}

#[test]
fn empty_store_gives_empty_analysis() {
    let conn = helpers::test_db();
    let query = [1.0f32, 0.0, 0.0];
    let analysis = SplashEngine::new(&conn)
        .generate_splash(&SplashQuery::semantic(&query), EmbeddingKind::Semantic, None, 5)
        .unwrap();

    assert!(analysis.most_similar.is_empty());
    assert!(analysis.least_similar.is_empty());
    assert_eq!(analysis.total_analyzed, 0);
    assert_eq!(
        format_splash_output(&analysis),
        "\n**Splash Analysis**: No related memories found (first memory?)"
    );
}

#[test]
fn memories_without_the_embedding_are_excluded_not_zero_filled() {
    let conn = helpers::test_db();
    helpers::insert_all(
        &conn,
        &[
            helpers::memory("near", 0, &[1.0, 0.0, 0.0]),
            helpers::memory("far", 1, &[-1.0, 0.0, 0.0]),
            helpers::bare_memory("blank", 2),
        ],
    );

    let query = [1.0f32, 0.0, 0.0];
    let analysis = SplashEngine::new(&conn)
        .generate_splash(&SplashQuery::semantic(&query), EmbeddingKind::Semantic, None, 5)
        .unwrap();

    assert_eq!(analysis.total_analyzed, 2);
    let all: Vec<&str> = ids(&analysis.most_similar)
        .into_iter()
        .chain(ids(&analysis.least_similar))
        .collect();
    assert!(!all.contains(&"blank"));
}

#[test]
fn the_query_memory_itself_is_excluded() {
    let conn = helpers::test_db();
    let memories = fan();
    helpers::insert_all(&conn, &memories);

    let query = SplashQuery::from_memory(&memories[0]);
    let analysis = SplashEngine::new(&conn)
        .generate_splash(&query, EmbeddingKind::Semantic, Some("m0"), 1)
        .unwrap();

    assert_eq!(analysis.total_analyzed, 9);
    assert_eq!(ids(&analysis.most_similar), vec!["m1"]);
    assert_eq!(ids(&analysis.least_similar), vec!["m9"]);
}

#[test]
fn small_corpus_lists_may_overlap() {
    let memories = fan();
    let corpus = &memories[..3];
    let query = [1.0f32, 0.0, 0.0];
    let analysis = SplashEngine::new(corpus)
        .generate_splash(&SplashQuery::semantic(&query), EmbeddingKind::Semantic, None, 5)
        .unwrap();

    assert_eq!(ids(&analysis.most_similar), vec!["m0", "m1", "m2"]);
    assert_eq!(ids(&analysis.least_similar), vec!["m2", "m1", "m0"]);
}

#[test]
fn emotional_mode_requires_an_emotional_query() {
    let conn = helpers::test_db();
    helpers::insert_all(&conn, &fan());

    let query = [1.0f32, 0.0, 0.0];
    let err = SplashEngine::new(&conn)
        .generate_splash(&SplashQuery::semantic(&query), EmbeddingKind::Emotional, None, 5)
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::MissingEmbedding {
            mode: EmbeddingKind::Emotional
        }
    ));
}

#[test]
fn emotional_mode_reads_only_emotional_embeddings() {
    let conn = helpers::test_db();
    let mut joyful = helpers::memory("joy", 0, &[1.0, 0.0, 0.0]);
    joyful.emotional_embedding = Some(vec![0.9, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0]);
    let mut gloomy = helpers::memory("gloom", 1, &[1.0, 0.0, 0.0]);
    gloomy.emotional_embedding = Some(vec![0.0, 0.0, 0.0, 0.0, 0.9, 0.1, 0.0]);
    let plain = helpers::memory("plain", 2, &[1.0, 0.0, 0.0]);
    for m in [&joyful, &gloomy, &plain] {
        assert!(insert_memory(&conn, m).unwrap());
    }

    let semantic = [1.0f32, 0.0, 0.0];
    let emotional = [1.0f32, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
    let query = SplashQuery::semantic(&semantic).with_emotional(&emotional);
    let analysis = SplashEngine::new(&conn)
        .generate_splash(&query, EmbeddingKind::Emotional, None, 1)
        .unwrap();

    assert_eq!(analysis.total_analyzed, 2);
    assert_eq!(ids(&analysis.most_similar), vec!["joy"]);
    assert_eq!(ids(&analysis.least_similar), vec!["gloom"]);
    assert!(format_splash_output(&analysis).contains("Emotional resonance distribution"));
}

#[test]
fn previews_respect_the_configured_length() {
    let conn = helpers::test_db();
    let mut long = helpers::memory("long", 0, &[1.0, 0.0, 0.0]);
    long.content = "a".repeat(40);
    assert!(insert_memory(&conn, &long).unwrap());

    let query = [1.0f32, 0.0, 0.0];
    let analysis = SplashEngine::new(&conn)
        .with_preview_chars(10)
        .generate_splash(&SplashQuery::semantic(&query), EmbeddingKind::Semantic, None, 1)
        .unwrap();

    assert_eq!(analysis.most_similar[0].preview, format!("{}...", "a".repeat(10)));
    assert_eq!(analysis.most_similar[0].content.len(), 40);
}

#[test]
fn excluded_query_leaves_nearest_neighbour_and_opposite() {
    let corpus = vec![
        helpers::memory("A", 0, &[1.0, 0.0, 0.0]),
        helpers::memory("B", 1, &[0.9, 0.1, 0.0]),
        helpers::memory("C", 2, &[-1.0, 0.0, 0.0]),
    ];
    let query = [1.0f32, 0.0, 0.0];
    let analysis = SplashEngine::new(corpus.as_slice())
        .generate_splash(&SplashQuery::semantic(&query), EmbeddingKind::Semantic, Some("A"), 1)
        .unwrap();

    assert_eq!(ids(&analysis.most_similar), vec!["B"]);
    assert!((analysis.most_similar[0].similarity_score - 0.9939).abs() < 1e-3);
    assert_eq!(ids(&analysis.least_similar), vec!["C"]);
    assert!(analysis.least_similar[0].similarity_score < 0.0);
}

#[test]
fn query_width_must_match_stored_embeddings() {
    let conn = helpers::test_db();
    let mut a = helpers::memory("a", 0, &[1.0, 0.0, 0.0]);
    a.emotional_embedding = Some(vec![1.0; 7]);
    let mut b = helpers::memory("b", 1, &[1.0, 0.0, 0.0]);
    b.emotional_embedding = Some(vec![-1.0; 7]);
    helpers::insert_all(&conn, &[a, b]);

    let semantic = [1.0f32, 0.0, 0.0];
    let emotional = vec![1.0f32; 1024];
    let query = SplashQuery::semantic(&semantic).with_emotional(&emotional);
    let err = SplashEngine::new(&conn)
        .generate_splash(&query, EmbeddingKind::Emotional, None, 1)
        .unwrap_err();

    match err {
        EngineError::DimensionMismatch {
            id,
            expected,
            found,
        } => {
            assert_eq!(id, "a");
            assert_eq!(expected, 1024);
            assert_eq!(found, 7);
        }
        other => panic!("expected a dimension mismatch, got {other}"),
    }
}
