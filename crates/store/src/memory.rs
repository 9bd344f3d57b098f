use crate::error::{Result, StoreError};
use crate::{GroupStore, NewMessage};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use triage_protocol::{
    Category, GroupStatus, GroupUpdate, IssueGroup, MembershipLink, Message, Priority,
    WorkflowStatus,
};
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    messages: HashMap<String, Message>,
    /// Groups in creation order.
    groups: Vec<IssueGroup>,
    /// Links in insertion order; one entry per currently grouped message.
    links: Vec<MembershipLink>,
}

/// In-memory [`GroupStore`] backed by a `tokio::sync::RwLock`.
///
/// Reference implementation of the trait contract, including the
/// one-link-per-message guard. Used throughout the test suite.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently stored links. Test helper.
    pub async fn link_count(&self) -> usize {
        self.inner.read().await.links.len()
    }

    /// Current link for one message, if any. Test helper.
    pub async fn link_for(&self, message_id: &str) -> Option<MembershipLink> {
        self.inner
            .read()
            .await
            .links
            .iter()
            .find(|l| l.message_id == message_id)
            .cloned()
    }

    /// Overwrite a group's stored creation timestamp. Test helper for window
    /// filtering and malformed-timestamp scenarios.
    pub async fn set_group_created_at(&self, group_id: &str, created_at: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        let group = inner
            .groups
            .iter_mut()
            .find(|g| g.id == group_id)
            .ok_or_else(|| StoreError::NotFound(format!("group {group_id}")))?;
        group.created_at = created_at.to_string();
        Ok(())
    }
}

#[async_trait]
impl GroupStore for MemoryStore {
    async fn insert_message(&self, new: NewMessage) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let message = Message {
            id: id.clone(),
            thread_id: new.thread_id,
            text: new.text,
            category: new.classification.category,
            is_relevant: new.classification.is_relevant,
            confidence: new.classification.confidence,
            summary: new.classification.summary,
            embedding: new.embedding,
            created_at: new.created_at,
        };
        self.inner.write().await.messages.insert(id.clone(), message);
        Ok(id)
    }

    async fn message(&self, message_id: &str) -> Result<Option<Message>> {
        Ok(self.inner.read().await.messages.get(message_id).cloned())
    }

    async fn messages_in_thread(&self, thread_id: &str) -> Result<Vec<Message>> {
        let inner = self.inner.read().await;
        let mut messages: Vec<Message> = inner
            .messages
            .values()
            .filter(|m| m.thread_id.as_deref() == Some(thread_id))
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    async fn all_groups(&self) -> Result<Vec<IssueGroup>> {
        Ok(self.inner.read().await.groups.clone())
    }

    async fn members_of(&self, group_id: &str) -> Result<Vec<(Message, f32)>> {
        let inner = self.inner.read().await;
        if !inner.groups.iter().any(|g| g.id == group_id) {
            return Err(StoreError::NotFound(format!("group {group_id}")));
        }
        let mut members = Vec::new();
        for link in inner.links.iter().filter(|l| l.group_id == group_id) {
            let message = inner.messages.get(&link.message_id).ok_or_else(|| {
                StoreError::Backend(format!("dangling link to message {}", link.message_id))
            })?;
            members.push((message.clone(), link.similarity_score));
        }
        Ok(members)
    }

    async fn create_group(
        &self,
        title: &str,
        summary: &str,
        category: Category,
        priority: Priority,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let group = IssueGroup {
            id: id.clone(),
            title: title.to_string(),
            summary: summary.to_string(),
            category,
            status: GroupStatus::Open,
            priority,
            workflow_status: WorkflowStatus::Backlog,
            assignee: None,
            due_date: None,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        };
        self.inner.write().await.groups.push(group);
        log::debug!("Created group {id}: {title}");
        Ok(id)
    }

    async fn link_message(
        &self,
        message_id: &str,
        group_id: &str,
        similarity_score: f32,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.messages.contains_key(message_id) {
            return Err(StoreError::NotFound(format!("message {message_id}")));
        }
        if !inner.groups.iter().any(|g| g.id == group_id) {
            return Err(StoreError::NotFound(format!("group {group_id}")));
        }
        if inner.links.iter().any(|l| l.message_id == message_id) {
            return Err(StoreError::AlreadyLinked {
                message_id: message_id.to_string(),
            });
        }
        inner.links.push(MembershipLink {
            message_id: message_id.to_string(),
            group_id: group_id.to_string(),
            similarity_score,
        });
        Ok(())
    }

    async fn unlink_message(&self, message_id: &str, group_id: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        let before = inner.links.len();
        inner
            .links
            .retain(|l| !(l.message_id == message_id && l.group_id == group_id));
        if inner.links.len() == before {
            return Err(StoreError::NotFound(format!(
                "link {message_id} -> {group_id}"
            )));
        }
        Ok(())
    }

    async fn update_group(&self, group_id: &str, update: GroupUpdate) -> Result<()> {
        let mut inner = self.inner.write().await;
        let group = inner
            .groups
            .iter_mut()
            .find(|g| g.id == group_id)
            .ok_or_else(|| StoreError::NotFound(format!("group {group_id}")))?;

        if let Some(title) = update.title {
            group.title = title;
        }
        if let Some(summary) = update.summary {
            group.summary = summary;
        }
        if let Some(status) = update.status {
            group.status = status;
        }
        if let Some(priority) = update.priority {
            group.priority = priority;
        }
        if let Some(workflow_status) = update.workflow_status {
            group.workflow_status = workflow_status;
        }
        if let Some(assignee) = update.assignee {
            group.assignee = assignee;
        }
        if let Some(due_date) = update.due_date {
            group.due_date = due_date;
        }
        Ok(())
    }

    async fn delete_group(&self, group_id: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        let before = inner.groups.len();
        inner.groups.retain(|g| g.id != group_id);
        if inner.groups.len() == before {
            return Err(StoreError::NotFound(format!("group {group_id}")));
        }
        inner.links.retain(|l| l.group_id != group_id);
        log::debug!("Deleted group {group_id}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use triage_protocol::Classification;

    fn new_message(text: &str, thread_id: Option<&str>, offset_secs: i64) -> NewMessage {
        NewMessage {
            thread_id: thread_id.map(String::from),
            text: text.to_string(),
            classification: Classification {
                is_relevant: true,
                category: Category::Bug,
                confidence: 0.9,
                summary: text.to_string(),
            },
            embedding: None,
            created_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[tokio::test]
    async fn test_one_link_per_message() {
        let store = MemoryStore::new();
        let msg = store.insert_message(new_message("a", None, 0)).await.unwrap();
        let g1 = store
            .create_group("t", "s", Category::Bug, Priority::High)
            .await
            .unwrap();
        let g2 = store
            .create_group("t2", "s2", Category::Bug, Priority::High)
            .await
            .unwrap();

        store.link_message(&msg, &g1, 1.0).await.unwrap();
        let err = store.link_message(&msg, &g2, 1.0).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyLinked { .. }));

        // Unlink first, then relink is fine.
        store.unlink_message(&msg, &g1).await.unwrap();
        store.link_message(&msg, &g2, 0.8).await.unwrap();
        assert_eq!(store.link_count().await, 1);
    }

    #[tokio::test]
    async fn test_thread_messages_ordered_by_time() {
        let store = MemoryStore::new();
        store
            .insert_message(new_message("later", Some("th"), 30))
            .await
            .unwrap();
        store
            .insert_message(new_message("earlier", Some("th"), -30))
            .await
            .unwrap();
        store
            .insert_message(new_message("other thread", Some("zz"), 0))
            .await
            .unwrap();

        let messages = store.messages_in_thread("th").await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "earlier");
        assert_eq!(messages[1].text, "later");
    }

    #[tokio::test]
    async fn test_delete_group_removes_links() {
        let store = MemoryStore::new();
        let msg = store.insert_message(new_message("a", None, 0)).await.unwrap();
        let group = store
            .create_group("t", "s", Category::Bug, Priority::High)
            .await
            .unwrap();
        store.link_message(&msg, &group, 1.0).await.unwrap();

        store.delete_group(&group).await.unwrap();
        assert_eq!(store.link_count().await, 0);
        assert!(store.all_groups().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_group_patch() {
        let store = MemoryStore::new();
        let group = store
            .create_group("t", "s", Category::Support, Priority::High)
            .await
            .unwrap();

        store
            .update_group(
                &group,
                GroupUpdate {
                    priority: Some(Priority::Critical),
                    assignee: Some(Some("sam".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let groups = store.all_groups().await.unwrap();
        assert_eq!(groups[0].priority, Priority::Critical);
        assert_eq!(groups[0].assignee.as_deref(), Some("sam"));
        // Untouched fields keep their values.
        assert_eq!(groups[0].title, "t");
        assert_eq!(groups[0].status, GroupStatus::Open);
    }

    #[tokio::test]
    async fn test_update_missing_group_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_group("nope", GroupUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
