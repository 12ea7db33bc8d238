//! Candidate-to-card resolution.
//!
//! # Responsibility
//! - Fan out existence probes for candidate ids and join them.
//! - Label surviving candidates from the metadata store.
//!
//! # Invariants
//! - Output order is a stable subsequence of input order.
//! - Nothing is returned until every probe has settled.

use crate::config::EngineConfig;
use crate::model::card::Card;
use crate::model::identifier::Identifier;
use crate::probe::{artifact_name, probe_within, ExistenceProbe};
use crate::repo::meta_repo::MetadataStore;
use futures_util::future::join_all;
use log::debug;
use std::time::{Duration, Instant};

/// Resolves candidate ids into displayable cards.
pub struct CardResolver<P: ExistenceProbe> {
    probe: P,
    extension: String,
    timeout: Duration,
}

impl<P: ExistenceProbe> CardResolver<P> {
    pub fn new(probe: P, config: &EngineConfig) -> Self {
        Self {
            probe,
            extension: config.artifact_extension.clone(),
            timeout: config.probe_timeout(),
        }
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Artifact name the display layer loads for `id`.
    pub fn artifact_ref(&self, id: &Identifier) -> String {
        artifact_name(id, &self.extension)
    }

    /// Single bounded probe.
    pub async fn exists(&self, id: &Identifier) -> bool {
        probe_within(&self.probe, id, self.timeout).await
    }

    /// Probes all candidates concurrently; results align with input order.
    pub async fn probe_all(&self, candidates: &[Identifier]) -> Vec<bool> {
        join_all(candidates.iter().map(|id| self.exists(id))).await
    }

    /// Probes, filters and labels `candidates`.
    pub async fn resolve<M>(&self, candidates: &[Identifier], labels: &M) -> Vec<Card>
    where
        M: MetadataStore + ?Sized,
    {
        let started_at = Instant::now();
        let found = self.probe_all(candidates).await;

        let cards: Vec<Card> = candidates
            .iter()
            .zip(found)
            .filter(|(_, exists)| *exists)
            .map(|(id, _)| {
                Card::new(id.clone(), self.artifact_ref(id), labels.display_name(id))
            })
            .collect();

        debug!(
            "event=cards_resolve module=service status=ok candidates={} cards={} duration_ms={}",
            candidates.len(),
            cards.len(),
            started_at.elapsed().as_millis()
        );
        cards
    }
}
