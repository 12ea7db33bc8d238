use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use swipetree_core::model::relation::child_ids;
use swipetree_core::{
    open_db_in_memory, parse, CardResolver, DirectoryExistenceProbe, EngineConfig,
    ExistenceProbe, Identifier, MetadataStore, PersonMeta, SqliteMetaRepository,
};

/// Resolves listed ids after their configured delay; everything else is absent.
struct DelayedProbe {
    existing: HashMap<String, u64>,
}

impl DelayedProbe {
    fn new(existing: &[(&str, u64)]) -> Self {
        Self {
            existing: existing
                .iter()
                .map(|(id, delay_ms)| (id.to_string(), *delay_ms))
                .collect(),
        }
    }
}

#[async_trait]
impl ExistenceProbe for DelayedProbe {
    async fn probe(&self, id: &Identifier) -> bool {
        match self.existing.get(&id.to_string()) {
            Some(delay_ms) => {
                tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                true
            }
            None => false,
        }
    }
}

fn children_of_140000() -> Vec<Identifier> {
    child_ids(&parse("140000").unwrap(), 9).unwrap()
}

fn ids(cards: &[swipetree_core::Card]) -> Vec<String> {
    cards.iter().map(|card| card.id.to_string()).collect()
}

#[tokio::test]
async fn resolved_cards_follow_candidate_order_not_completion_order() {
    let conn = open_db_in_memory().unwrap();
    let labels = SqliteMetaRepository::new(&conn, "swipetree");
    labels
        .put_meta(
            &parse("145000").unwrap(),
            &PersonMeta::new(Some("Eve\u{a0}".to_string()), None),
        )
        .unwrap();

    // 141000 settles last but must still come first.
    let probe = DelayedProbe::new(&[("141000", 60), ("145000", 0)]);
    let resolver = CardResolver::new(probe, &EngineConfig::default());

    let cards = resolver.resolve(&children_of_140000(), &labels).await;

    assert_eq!(ids(&cards), vec!["141000", "145000"]);
    assert_eq!(cards[0].display_name, "");
    assert_eq!(cards[1].display_name, "Eve");
    assert_eq!(cards[1].artifact_ref, "145000.jpg");
    assert!(cards.iter().all(|card| !card.placeholder));
}

#[tokio::test]
async fn probes_past_the_timeout_count_as_absent() {
    let conn = open_db_in_memory().unwrap();
    let labels = SqliteMetaRepository::new(&conn, "swipetree");
    let config = EngineConfig {
        probe_timeout_ms: 20,
        ..EngineConfig::default()
    };
    let probe = DelayedProbe::new(&[("141000", 500), ("145000", 0)]);
    let resolver = CardResolver::new(probe, &config);

    let cards = resolver.resolve(&children_of_140000(), &labels).await;

    assert_eq!(ids(&cards), vec!["145000"]);
}

#[tokio::test]
async fn empty_candidate_list_resolves_to_no_cards() {
    let conn = open_db_in_memory().unwrap();
    let labels = SqliteMetaRepository::new(&conn, "swipetree");
    let resolver = CardResolver::new(DelayedProbe::new(&[]), &EngineConfig::default());

    assert!(resolver.resolve(&[], &labels).await.is_empty());
}

#[tokio::test]
async fn directory_probe_only_accepts_regular_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("141000.jpg"), b"jpeg").unwrap();
    std::fs::write(dir.path().join("145000.jpg"), b"jpeg").unwrap();
    std::fs::write(dir.path().join("143000.png"), b"png").unwrap();
    std::fs::create_dir(dir.path().join("142000.jpg")).unwrap();

    let conn = open_db_in_memory().unwrap();
    let labels = SqliteMetaRepository::new(&conn, "swipetree");
    let probe = DirectoryExistenceProbe::new(dir.path(), "jpg");
    let resolver = CardResolver::new(probe, &EngineConfig::default());

    let cards = resolver.resolve(&children_of_140000(), &labels).await;

    assert_eq!(ids(&cards), vec!["141000", "145000"]);
    assert_eq!(
        resolver.probe().artifact_path(&parse("141000").unwrap()),
        dir.path().join("141000.jpg")
    );
}
