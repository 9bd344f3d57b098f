use crate::embedding::Embedder;
use crate::error::Result;
use crate::locks::KeyedLocks;
use crate::priority::determine_priority;
use crate::similarity::cosine_similarity;
use crate::truncate_chars;
use chrono::{Duration, Utc};
use std::sync::Arc;
use triage_protocol::{Category, GroupingConfig, Message};
use triage_store::GroupStore;

/// Lock key for the semantic find-or-create section. Grouping is
/// cross-category, so any pair of concurrent scans can race on creating a
/// duplicate group; one coarse key serializes them all.
const SEMANTIC_LOCK_KEY: &str = "semantic-scan";

/// Semantic grouping strategy: a relevant message joins the best-matching
/// recent group above the similarity threshold, or founds a new one.
pub struct SimilarityGrouper {
    store: Arc<dyn GroupStore>,
    embedder: Arc<dyn Embedder>,
    config: GroupingConfig,
    locks: Arc<KeyedLocks>,
}

impl SimilarityGrouper {
    pub fn new(
        store: Arc<dyn GroupStore>,
        embedder: Arc<dyn Embedder>,
        config: GroupingConfig,
        locks: Arc<KeyedLocks>,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
            locks,
        }
    }

    /// Place a message by embedding similarity.
    ///
    /// Returns the group id, or `None` when the message is irrelevant, no
    /// embedding could be obtained, or the store failed. Failures are logged
    /// and swallowed for the same reason as in the thread grouper.
    pub async fn group_by_similarity(&self, message: &Message) -> Option<String> {
        if !message.is_relevant || message.category == Category::Irrelevant {
            return None;
        }

        // Embed before taking the lock; only the scan-and-create section
        // needs serializing.
        let embedding = match self.resolve_embedding(message).await {
            Ok(vector) => vector,
            Err(err) => {
                log::warn!(
                    "Skipping similarity grouping for message {}: {err}",
                    message.id
                );
                return None;
            }
        };

        let _guard = self.locks.acquire(SEMANTIC_LOCK_KEY).await;

        match self.group_locked(message, &embedding).await {
            Ok(group_id) => Some(group_id),
            Err(err) => {
                log::warn!(
                    "Similarity grouping failed for message {}: {err}",
                    message.id
                );
                None
            }
        }
    }

    async fn resolve_embedding(&self, message: &Message) -> Result<Vec<f32>> {
        if let Some(vector) = &message.embedding {
            return Ok(vector.clone());
        }
        Ok(self.embedder.embed(&message.text).await?)
    }

    async fn group_locked(&self, message: &Message, embedding: &[f32]) -> Result<String> {
        let candidates = self.recent_groups().await?;
        log::debug!(
            "Comparing message {} against {} recent groups",
            message.id,
            candidates.len()
        );

        // Best match across every member of every candidate group. Strict
        // greater-than keeps the first maximum encountered, scanning groups
        // in creation order and members in arrival order.
        let mut best_group: Option<String> = None;
        let mut best_similarity = 0.0f32;

        for group_id in candidates {
            for (member, _) in self.store.members_of(&group_id).await? {
                let member_vector = match &member.embedding {
                    Some(vector) => vector.clone(),
                    None => match self.embedder.embed(&member.text).await {
                        Ok(vector) => vector,
                        Err(err) => {
                            log::debug!("Skipping candidate message {}: {err}", member.id);
                            continue;
                        }
                    },
                };

                let similarity = cosine_similarity(embedding, &member_vector);
                if similarity > best_similarity {
                    best_similarity = similarity;
                    best_group = Some(group_id.clone());
                    log::debug!("New best match {similarity:.3} in group {group_id}");
                }
            }
        }

        if best_similarity >= self.config.similarity_threshold {
            if let Some(group_id) = best_group {
                self.store
                    .link_message(&message.id, &group_id, best_similarity)
                    .await?;
                log::debug!(
                    "Added message {} to group {group_id} (similarity {best_similarity:.3})",
                    message.id
                );
                return Ok(group_id);
            }
        }

        if best_similarity > 0.0 {
            log::debug!(
                "Best similarity {best_similarity:.3} below threshold {}",
                self.config.similarity_threshold
            );
        }

        self.create_group(message).await
    }

    /// Groups created within the lookback window, in creation order.
    /// A group whose timestamp cannot be parsed is retained: losing candidate
    /// matches to a formatting defect is worse than a few extra comparisons.
    async fn recent_groups(&self) -> Result<Vec<String>> {
        let cutoff = Utc::now() - Duration::hours(self.config.lookback_hours);
        let mut recent = Vec::new();
        for group in self.store.all_groups().await? {
            match group.created_at_parsed() {
                Some(created_at) if created_at < cutoff => {}
                Some(_) => recent.push(group.id),
                None => {
                    log::warn!(
                        "Could not parse created_at for group {}; keeping as candidate",
                        group.id
                    );
                    recent.push(group.id);
                }
            }
        }
        Ok(recent)
    }

    async fn create_group(&self, message: &Message) -> Result<String> {
        let title = format!(
            "{}: {}",
            message.category.title_label(),
            truncate_chars(&message.summary, 50)
        );
        let summary = format!(
            "Issue group for {} messages. {}",
            message.category, message.summary
        );
        let priority = determine_priority(message.category, message.confidence);

        let group_id = self
            .store
            .create_group(&title, &summary, message.category, priority)
            .await?;
        self.store.link_message(&message.id, &group_id, 1.0).await?;

        log::debug!("Created similarity group {group_id} for message {}", message.id);
        Ok(group_id)
    }
}
