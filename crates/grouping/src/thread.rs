use crate::error::Result;
use crate::locks::KeyedLocks;
use crate::priority::determine_priority;
use crate::truncate_chars;
use std::sync::Arc;
use triage_protocol::Message;
use triage_store::GroupStore;

/// Structural grouping strategy: a message lands in the group that already
/// holds its conversation thread.
///
/// Thread membership is authoritative ground truth and is checked before any
/// semantic comparison. The strategy declines messages without a thread id.
pub struct ThreadGrouper {
    store: Arc<dyn GroupStore>,
    locks: Arc<KeyedLocks>,
}

impl ThreadGrouper {
    pub fn new(store: Arc<dyn GroupStore>, locks: Arc<KeyedLocks>) -> Self {
        Self { store, locks }
    }

    /// Place a message by thread adjacency.
    ///
    /// Returns the group id, or `None` when the message has no thread context
    /// or the store failed. Storage failures are logged and swallowed: a
    /// grouping failure must not block ingestion of the message itself.
    pub async fn group_by_thread(&self, message: &Message) -> Option<String> {
        let thread_id = message.thread_id.as_deref()?;

        // Serialize find-or-create per thread so two concurrently classified
        // messages of a new thread cannot each create a group.
        let _guard = self.locks.acquire(thread_id).await;

        match self.group_locked(message, thread_id).await {
            Ok(group_id) => Some(group_id),
            Err(err) => {
                log::warn!(
                    "Thread grouping failed for message {} (thread {thread_id}): {err}",
                    message.id
                );
                None
            }
        }
    }

    async fn group_locked(&self, message: &Message, thread_id: &str) -> Result<String> {
        if let Some(group_id) = self.find_thread_group(thread_id).await? {
            match self.store.link_message(&message.id, &group_id, 1.0).await {
                Ok(()) => {
                    log::debug!("Added message {} to thread group {group_id}", message.id)
                }
                // Reprocessing a message that a backfill already linked is a
                // no-op, not an error.
                Err(triage_store::StoreError::AlreadyLinked { .. }) => {
                    log::debug!("Message {} already linked; leaving in place", message.id)
                }
                Err(err) => return Err(err.into()),
            }
            return Ok(group_id);
        }

        let group_id = self.create_thread_group(message, thread_id).await?;
        log::debug!("Created thread group {group_id} for thread {thread_id}");
        Ok(group_id)
    }

    /// Scan all groups' memberships for any message sharing this thread.
    /// Exact structural join, not a similarity comparison.
    async fn find_thread_group(&self, thread_id: &str) -> Result<Option<String>> {
        for group in self.store.all_groups().await? {
            let members = self.store.members_of(&group.id).await?;
            if members
                .iter()
                .any(|(m, _)| m.thread_id.as_deref() == Some(thread_id))
            {
                return Ok(Some(group.id));
            }
        }
        Ok(None)
    }

    /// Create a group for a thread no group holds yet, then backfill every
    /// already-stored sibling so earlier-arriving messages are not orphaned.
    async fn create_thread_group(&self, message: &Message, thread_id: &str) -> Result<String> {
        let siblings = self.store.messages_in_thread(thread_id).await?;

        // Title from the first summary known for this thread; the current
        // message's summary when it is the only one.
        let first_summary = siblings
            .first()
            .map(|m| m.summary.as_str())
            .unwrap_or(&message.summary);
        let title = format!("Thread: {}", truncate_chars(first_summary, 50));

        let member_count = if siblings.iter().any(|m| m.id == message.id) {
            siblings.len()
        } else {
            siblings.len() + 1
        };
        let summary = format!("Thread with {member_count} messages. {}", message.summary);

        let priority = determine_priority(message.category, message.confidence);
        let group_id = self
            .store
            .create_group(&title, &summary, message.category, priority)
            .await?;

        self.store.link_message(&message.id, &group_id, 1.0).await?;

        for sibling in siblings.iter().filter(|m| m.id != message.id) {
            match self.store.link_message(&sibling.id, &group_id, 1.0).await {
                Ok(()) => {}
                // A sibling moved elsewhere by hand stays where the operator
                // put it; re-running the backfill stays idempotent.
                Err(triage_store::StoreError::AlreadyLinked { .. }) => {
                    log::debug!(
                        "Skipping backfill of message {}: already grouped",
                        sibling.id
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        Ok(group_id)
    }
}
