//! End-to-end scenarios against the library API, using throwaway log files.

use tempfile::TempDir;
use wordix::engine::AddOutcome;
use wordix::query::QueryOutcome;
use wordix::{parse_query, Engine, EngineConfig};

fn mem_engine(words: &[&str]) -> Engine {
    let mut engine = Engine::new(EngineConfig::default());
    for word in words {
        engine.add(word).unwrap();
    }
    engine
}

fn run(engine: &Engine, input: &str) -> QueryOutcome {
    engine.query(&parse_query(input).unwrap())
}

fn ids(engine: &Engine, input: &str) -> Vec<u32> {
    run(engine, input).hits.iter().map(|h| h.id).collect()
}

#[test]
fn scenario_similarity_prefix_suffix() {
    let engine = mem_engine(&["apple", "aple", "applet", "banana"]);

    let sim: Vec<(u32, Option<u32>)> = run(&engine, "sim apple 2")
        .hits
        .iter()
        .map(|h| (h.id, h.distance))
        .collect();
    assert_eq!(sim, vec![(0, Some(0)), (1, Some(2)), (2, Some(2))]);

    assert_eq!(ids(&engine, "exact apple"), vec![0]);
    assert_eq!(ids(&engine, "pre app"), vec![0, 2]);
    assert_eq!(ids(&engine, "suf let"), vec![2]);
}

#[test]
fn scenario_substring_length_complex() {
    let engine = mem_engine(&["cat", "car", "cart"]);

    assert_eq!(ids(&engine, "sub ca"), vec![0, 1, 2]);
    assert_eq!(ids(&engine, "len 3"), vec![0, 1]);
    assert_eq!(ids(&engine, "complex pre:c suf:t len:3-4"), vec![0, 2]);
}

#[test]
fn scenario_delete_undelete_cycle() {
    let mut engine = mem_engine(&["apple", "pear"]);

    assert!(engine.delete(0).unwrap());
    assert!(ids(&engine, "exact apple").is_empty());
    // Deleted words never surface from prefix scans either.
    assert_eq!(ids(&engine, "pre a"), Vec::<u32>::new());

    let all = engine.list_all();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, 0);
    assert!(all[0].deleted);

    assert!(engine.undelete(0).unwrap());
    assert_eq!(ids(&engine, "exact apple"), vec![0]);
    assert!(engine.validate().is_clean());
}

#[test]
fn scenario_restart_takes_snapshot_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("words.csv");
    wordix::store::generate_log(&path, 2000, 3, 10, Some(42)).unwrap();

    let prefix_queries = ["pre a", "pre ab", "pre zz", "pre qu", "sub an", "len 3-5"];

    let first = Engine::open(&path, EngineConfig::default()).unwrap();
    let expected: Vec<Vec<u32>> = prefix_queries.iter().map(|q| ids(&first, q)).collect();

    // Make the snapshot mtime strictly newer than the log even on
    // second-granularity filesystems.
    std::thread::sleep(std::time::Duration::from_millis(1100));
    first.shutdown().unwrap();
    assert!(wordix::index::snapshot::snapshot_path(&path).exists());

    let second = Engine::open(&path, EngineConfig::default()).unwrap();
    let after: Vec<Vec<u32>> = prefix_queries.iter().map(|q| ids(&second, q)).collect();
    assert_eq!(expected, after);
    assert!(second.validate().is_clean());
}

#[test]
fn scenario_exact_hit_leads_similarity() {
    // Insert in an order that buries "target" deep in the tree.
    let engine = mem_engine(&["alpha", "beta", "gamma", "target", "targets", "tarmac"]);
    let outcome = run(&engine, "sim target 2");
    assert_eq!(outcome.hits[0].id, 3);
    assert_eq!(outcome.hits[0].distance, Some(0));
}

#[test]
fn scenario_complex_not_over_corpus() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("words.csv");
    wordix::store::generate_log(&path, 1000, 3, 10, Some(7)).unwrap();

    let engine = Engine::open(
        &path,
        EngineConfig {
            use_snapshot: false,
            ..EngineConfig::default()
        },
    )
    .unwrap();

    let expected: Vec<u32> = engine
        .list_active()
        .iter()
        .filter(|r| !r.word.contains('x'))
        .map(|r| r.id)
        .collect();
    assert_eq!(ids(&engine, "complex not:x"), expected);
    assert_eq!(ids(&engine, "not x"), expected);
}

#[test]
fn law_idempotent_insert() {
    let mut engine = mem_engine(&["apple"]);
    assert_eq!(engine.add("apple").unwrap(), AddOutcome::Unchanged(0));
    assert_eq!(engine.add("pear").unwrap(), AddOutcome::Added(1));
    assert_eq!(engine.dict().len(), 2);
}

#[test]
fn law_substring_completeness() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("words.csv");
    wordix::store::generate_log(&path, 1500, 3, 9, Some(11)).unwrap();

    let mut engine = Engine::open(
        &path,
        EngineConfig {
            use_snapshot: false,
            ..EngineConfig::default()
        },
    )
    .unwrap();

    // Mix in some deletions so the lazy 2-gram postings hold dead ids.
    for id in [5, 50, 500] {
        engine.delete(id).unwrap();
    }

    for needle in ["ab", "qu", "zzz", "a", "ana"] {
        let expected: Vec<u32> = engine
            .list_active()
            .iter()
            .filter(|r| r.word.contains(needle))
            .map(|r| r.id)
            .collect();
        assert_eq!(
            ids(&engine, &format!("sub {needle}")),
            expected,
            "needle {needle}"
        );
    }
}

#[test]
fn law_similarity_completeness() {
    let engine = mem_engine(&["cat", "car", "cart", "care", "scar", "dog", "cot"]);

    for query in ["cat", "card", "dig"] {
        for max_d in 0..3u32 {
            let mut expected: Vec<(u32, u32)> = engine
                .list_active()
                .iter()
                .filter_map(|r| {
                    let d = wordix::utils::distance::damerau_levenshtein(
                        query.as_bytes(),
                        r.word.as_bytes(),
                        max_d,
                    );
                    (d <= max_d).then_some((r.id, d))
                })
                .collect();
            expected.sort_unstable_by_key(|&(id, d)| (d, id));

            let got: Vec<(u32, u32)> = run(&engine, &format!("sim {query} {max_d}"))
                .hits
                .iter()
                .map(|h| (h.id, h.distance.unwrap()))
                .collect();
            assert_eq!(got, expected, "query {query} max_d {max_d}");
        }
    }
}

#[test]
fn boundary_empty_engine() {
    let engine = Engine::new(EngineConfig::default());
    for q in [
        "exact a", "pre a", "suf a", "sub ab", "sim a 2", "len 3", "and a b", "or a", "not a",
        "complex pre:a not:b",
    ] {
        let outcome = run(&engine, q);
        assert!(outcome.hits.is_empty(), "query {q}");
    }

    let outcome = run(&engine, "id 3-9");
    assert!(outcome.hits.is_empty());
    assert!(outcome.out_of_range);
}

#[test]
fn boundary_id_range_signals() {
    let engine = mem_engine(&["a", "b", "c"]);

    let inside = run(&engine, "id 0-1");
    assert_eq!(inside.hits.len(), 2);
    assert!(!inside.out_of_range);

    let outside = run(&engine, "id 10-20");
    assert!(outside.hits.is_empty());
    assert!(outside.out_of_range);
}

#[test]
fn mutations_survive_reopen_without_snapshot() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("words.csv");
    let config = EngineConfig {
        use_snapshot: false,
        ..EngineConfig::default()
    };

    {
        let mut engine = Engine::open(&path, config.clone()).unwrap();
        for word in ["apple", "pear", "fig"] {
            engine.add(word).unwrap();
        }
        engine.delete(1).unwrap();
        engine.undelete(1).unwrap();
        engine.delete(2).unwrap();
        engine.shutdown().unwrap();
    }

    let engine = Engine::open(&path, config).unwrap();
    assert_eq!(ids(&engine, "exact pear"), vec![1]);
    assert!(ids(&engine, "exact fig").is_empty());
    assert_eq!(engine.dict().len(), 3);
    assert!(engine.validate().is_clean());

    // A rebuild from the same log is a fixed point.
    let mut engine = engine;
    engine.rebuild().unwrap();
    assert_eq!(ids(&engine, "exact pear"), vec![1]);
    assert!(engine.validate().is_clean());
}
