//! # Triage Grouping
//!
//! Online clustering of classified chat messages into durable issue groups.
//! Each message is grouped once, at arrival, with no global re-clustering
//! pass: the thread grouper places messages by conversation adjacency, and
//! the similarity grouper places the rest by embedding cosine similarity
//! against a rolling window of recent groups.
//!
//! ## Architecture
//!
//! ```text
//! Message (classified)
//!     │
//!     ├──> ThreadGrouper ── thread id match ──> existing group
//!     │        └─ new thread ──> new group + sibling backfill
//!     │
//!     ├──> SimilarityGrouper (relevant, no thread)
//!     │        └─ cosine vs recent members ──> join or new group
//!     │
//!     └──> GroupLifecycle (operator actions)
//!              └─ split / merge / move / field edits
//! ```
//!
//! Storage and embedding are injected collaborators ([`triage_store::GroupStore`]
//! and [`Embedder`]); this crate owns only the decision logic.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use triage_grouping::GroupingEngine;
//! use triage_protocol::GroupingConfig;
//! use triage_store::MemoryStore;
//!
//! # async fn run(embedder: Arc<dyn triage_grouping::Embedder>) {
//! let store = Arc::new(MemoryStore::new());
//! let engine = GroupingEngine::new(store, embedder, GroupingConfig::default());
//!
//! // message already stored and classified upstream
//! # let message: triage_protocol::Message = todo!();
//! if let Some(group_id) = engine.group_message(&message).await {
//!     println!("grouped into {group_id}");
//! }
//! # }
//! ```

mod embedding;
mod error;
mod lifecycle;
mod locks;
mod priority;
mod semantic;
mod similarity;
mod thread;

pub use embedding::{EmbedError, Embedder};
pub use error::{GroupingError, Result};
pub use lifecycle::GroupLifecycle;
pub use locks::KeyedLocks;
pub use priority::determine_priority;
pub use semantic::SimilarityGrouper;
pub use similarity::cosine_similarity;
pub use thread::ThreadGrouper;

use std::sync::Arc;
use triage_protocol::{GroupingConfig, Message};
use triage_store::{GroupStore, NewMessage};

/// Truncate to a character count without splitting a code point.
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Facade wiring the two grouping strategies and the lifecycle manager to one
/// injected store and embedder.
pub struct GroupingEngine {
    store: Arc<dyn GroupStore>,
    thread: ThreadGrouper,
    semantic: SimilarityGrouper,
    lifecycle: GroupLifecycle,
}

impl GroupingEngine {
    pub fn new(
        store: Arc<dyn GroupStore>,
        embedder: Arc<dyn Embedder>,
        config: GroupingConfig,
    ) -> Self {
        let locks = Arc::new(KeyedLocks::new());
        Self {
            thread: ThreadGrouper::new(store.clone(), locks.clone()),
            semantic: SimilarityGrouper::new(store.clone(), embedder, config, locks),
            lifecycle: GroupLifecycle::new(store.clone()),
            store,
        }
    }

    /// Group one already-stored message.
    ///
    /// Thread adjacency is authoritative and tried first; when it produces no
    /// placement, semantic grouping runs for messages classification marked
    /// relevant. `None` means the message stays ungrouped, whether by decline
    /// or by a swallowed storage failure.
    pub async fn group_message(&self, message: &Message) -> Option<String> {
        if let Some(group_id) = self.thread.group_by_thread(message).await {
            return Some(group_id);
        }
        if !message.is_relevant {
            log::debug!("Message {} is irrelevant; not grouping", message.id);
            return None;
        }
        self.semantic.group_by_similarity(message).await
    }

    /// Store a classified message and group it in one call, the shape the
    /// ingestion pipeline uses. Returns the stored message id and the group
    /// it landed in, if any. Only the store step can fail; grouping failures
    /// degrade to "not grouped".
    pub async fn ingest(&self, new: NewMessage) -> Result<(String, Option<String>)> {
        let message_id = self.store.insert_message(new).await?;
        let message = self
            .store
            .message(&message_id)
            .await?
            .ok_or_else(|| triage_store::StoreError::NotFound(format!("message {message_id}")))?;

        let group_id = self.group_message(&message).await;
        Ok((message_id, group_id))
    }

    /// Manual-correction operations.
    pub fn lifecycle(&self) -> &GroupLifecycle {
        &self.lifecycle
    }
}
