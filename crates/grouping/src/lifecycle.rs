use crate::error::{GroupingError, Result};
use crate::priority::determine_priority;
use crate::truncate_chars;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use triage_protocol::{GroupStatus, GroupUpdate, Message, Priority, WorkflowStatus};
use triage_store::{GroupStore, StoreError};

/// Operator-triggered corrections: split a message out, merge two groups,
/// move a message, or edit group fields.
///
/// Every re-homing operation unlinks before it links. A crash between the two
/// steps leaves the message ungrouped, which a later reprocess can repair;
/// it never leaves the message in two groups.
pub struct GroupLifecycle {
    store: Arc<dyn GroupStore>,
}

impl GroupLifecycle {
    pub fn new(store: Arc<dyn GroupStore>) -> Self {
        Self { store }
    }

    /// Pull one message out of its group into a fresh single-message group.
    /// Returns the new group's id.
    pub async fn split(&self, message_id: &str, current_group_id: &str) -> Result<String> {
        let message = self.member_of(message_id, current_group_id).await?.0;

        let title = format!(
            "{}: {}",
            message.category.title_label(),
            truncate_chars(&message.summary, 50)
        );
        let summary = format!("Split from group {current_group_id}. {}", message.summary);
        let priority = determine_priority(message.category, message.confidence);

        let new_group_id = self
            .store
            .create_group(&title, &summary, message.category, priority)
            .await?;

        self.store.unlink_message(message_id, current_group_id).await?;
        self.store.link_message(message_id, &new_group_id, 1.0).await?;

        log::info!("Split message {message_id} from {current_group_id} into {new_group_id}");
        Ok(new_group_id)
    }

    /// Fold every member of `source_group_id` into `target_group_id`, keeping
    /// each member's prior similarity score, then delete the source group.
    ///
    /// Members migrate one at a time: a partial failure leaves a well-defined
    /// subset already moved, never a corrupted pair of groups. Returns the
    /// number of members migrated.
    pub async fn merge(&self, source_group_id: &str, target_group_id: &str) -> Result<usize> {
        if source_group_id == target_group_id {
            return Err(GroupingError::InvariantViolation(format!(
                "cannot merge group {source_group_id} into itself"
            )));
        }

        // Validate the target up front so a typo'd id fails before any member
        // has been unlinked.
        match self.store.members_of(target_group_id).await {
            Ok(_) => {}
            Err(StoreError::NotFound(_)) => {
                return Err(GroupingError::InvariantViolation(format!(
                    "merge target group {target_group_id} does not exist"
                )))
            }
            Err(err) => return Err(err.into()),
        }

        let members = self.store.members_of(source_group_id).await?;
        let migrated = members.len();

        for (message, score) in members {
            self.store.unlink_message(&message.id, source_group_id).await?;
            self.store
                .link_message(&message.id, target_group_id, score)
                .await?;
        }

        self.store.delete_group(source_group_id).await?;
        log::info!(
            "Merged group {source_group_id} into {target_group_id} ({migrated} members)"
        );
        Ok(migrated)
    }

    /// Re-home one message to another group. Manual placement is a certain
    /// match, so the new link scores 1.0.
    pub async fn move_message(
        &self,
        message_id: &str,
        current_group_id: &str,
        target_group_id: &str,
    ) -> Result<()> {
        self.member_of(message_id, current_group_id).await?;

        // Validate the target before unlinking so a stale target id cannot
        // strand the message ungrouped.
        match self.store.members_of(target_group_id).await {
            Ok(_) => {}
            Err(StoreError::NotFound(_)) => {
                return Err(GroupingError::InvariantViolation(format!(
                    "move target group {target_group_id} does not exist"
                )))
            }
            Err(err) => return Err(err.into()),
        }

        self.store.unlink_message(message_id, current_group_id).await?;
        self.store.link_message(message_id, target_group_id, 1.0).await?;

        log::info!("Moved message {message_id} from {current_group_id} to {target_group_id}");
        Ok(())
    }

    pub async fn set_status(&self, group_id: &str, status: GroupStatus) -> Result<()> {
        self.patch(
            group_id,
            GroupUpdate {
                status: Some(status),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn set_priority(&self, group_id: &str, priority: Priority) -> Result<()> {
        self.patch(
            group_id,
            GroupUpdate {
                priority: Some(priority),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn set_workflow_status(
        &self,
        group_id: &str,
        workflow_status: WorkflowStatus,
    ) -> Result<()> {
        self.patch(
            group_id,
            GroupUpdate {
                workflow_status: Some(workflow_status),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn set_assignee(&self, group_id: &str, assignee: Option<String>) -> Result<()> {
        self.patch(
            group_id,
            GroupUpdate {
                assignee: Some(assignee),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn set_due_date(
        &self,
        group_id: &str,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.patch(
            group_id,
            GroupUpdate {
                due_date: Some(due_date),
                ..Default::default()
            },
        )
        .await
    }

    async fn patch(&self, group_id: &str, update: GroupUpdate) -> Result<()> {
        self.store.update_group(group_id, update).await?;
        Ok(())
    }

    /// Locate a message within the group the caller claims it is in, or
    /// report the stale-state contract violation distinctly.
    async fn member_of(&self, message_id: &str, group_id: &str) -> Result<(Message, f32)> {
        let members = self.store.members_of(group_id).await?;
        members
            .into_iter()
            .find(|(m, _)| m.id == message_id)
            .ok_or_else(|| {
                GroupingError::InvariantViolation(format!(
                    "message {message_id} is not a member of group {group_id}"
                ))
            })
    }
}
