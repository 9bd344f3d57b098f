//! # Triage Store
//!
//! Persistence surface for the grouping engine. The engine never talks to a
//! database directly; it goes through [`GroupStore`], an async trait mirroring
//! the operations the backing store exposes. [`MemoryStore`] is the reference
//! implementation used by the test suite.
//!
//! Invariant enforced here: a message participates in at most one membership
//! link at any instant. Lifecycle operations that re-home a message must unlink
//! before they link; a crash between the two steps leaves the message ungrouped,
//! never double-grouped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use triage_protocol::{Category, Classification, GroupUpdate, IssueGroup, Message, Priority};

mod error;
mod memory;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;

/// A classified message about to be stored; the store assigns the id.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NewMessage {
    pub thread_id: Option<String>,
    pub text: String,
    pub classification: Classification,
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
}

/// Operations the grouping engine consumes. Every method may fail with a
/// generic backend error; callers decide whether that aborts their operation.
#[async_trait]
pub trait GroupStore: Send + Sync {
    /// Store a classified message, returning its generated id.
    async fn insert_message(&self, new: NewMessage) -> Result<String>;

    /// Fetch a single message by id.
    async fn message(&self, message_id: &str) -> Result<Option<Message>>;

    /// All messages sharing a thread id, ordered by creation time ascending.
    async fn messages_in_thread(&self, thread_id: &str) -> Result<Vec<Message>>;

    /// All issue groups in creation order.
    async fn all_groups(&self) -> Result<Vec<IssueGroup>>;

    /// Members of one group with their link scores, in link-insertion order.
    async fn members_of(&self, group_id: &str) -> Result<Vec<(Message, f32)>>;

    /// Create a group, returning its generated id.
    async fn create_group(
        &self,
        title: &str,
        summary: &str,
        category: Category,
        priority: Priority,
    ) -> Result<String>;

    /// Link a message to a group. Fails with [`StoreError::AlreadyLinked`] if
    /// the message is currently linked anywhere.
    async fn link_message(&self, message_id: &str, group_id: &str, similarity_score: f32)
        -> Result<()>;

    /// Remove the link between a message and a group.
    async fn unlink_message(&self, message_id: &str, group_id: &str) -> Result<()>;

    /// Apply a field patch to a group record.
    async fn update_group(&self, group_id: &str, update: GroupUpdate) -> Result<()>;

    /// Delete a group and any links pointing at it.
    async fn delete_group(&self, group_id: &str) -> Result<()>;
}
