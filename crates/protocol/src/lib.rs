//! # Triage Protocol
//!
//! Shared typed records for the message triage pipeline: classified messages,
//! issue groups, membership links, and the grouping configuration. Every record
//! that crosses a crate boundary lives here so the store and the grouping engine
//! agree on shapes without depending on each other.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message category assigned by the upstream classifier.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Support,
    Bug,
    Feature,
    Question,
    Irrelevant,
}

impl Category {
    /// Lenient parse used at the store boundary: unknown labels collapse to
    /// `Irrelevant` rather than failing a whole record.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "support" => Category::Support,
            "bug" => Category::Bug,
            "feature" => Category::Feature,
            "question" => Category::Question,
            _ => Category::Irrelevant,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Support => "support",
            Category::Bug => "bug",
            Category::Feature => "feature",
            Category::Question => "question",
            Category::Irrelevant => "irrelevant",
        }
    }

    /// Capitalized label for group titles ("Bug: checkout fails...").
    pub fn title_label(&self) -> &'static str {
        match self {
            Category::Support => "Support",
            Category::Bug => "Bug",
            Category::Feature => "Feature",
            Category::Question => "Question",
            Category::Irrelevant => "Irrelevant",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Urgency level derived from category and classifier confidence.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    Open,
    Closed,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Backlog,
    Todo,
    InProgress,
    Blocked,
    Resolved,
    Closed,
}

/// A classified chat message. Immutable once stored; the grouping engine only
/// reads it and references it by id.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Message {
    pub id: String,
    /// Conversation thread the message belongs to, if any.
    pub thread_id: Option<String>,
    pub text: String,
    pub category: Category,
    pub is_relevant: bool,
    pub confidence: f32,
    pub summary: String,
    /// Embedding vector, if one has been computed and stored for this message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
}

/// A cluster of messages believed to describe the same underlying topic.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IssueGroup {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub category: Category,
    pub status: GroupStatus,
    pub priority: Priority,
    pub workflow_status: WorkflowStatus,
    pub assignee: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    /// RFC 3339 creation timestamp as returned by the store. Kept as a string
    /// so a malformed value degrades to fail-open candidate filtering instead
    /// of rejecting the whole record at the boundary.
    pub created_at: String,
}

impl IssueGroup {
    /// Parse the creation timestamp; `None` means the stored value is malformed.
    pub fn created_at_parsed(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }
}

/// Association between one message and its current group.
///
/// A score of 1.0 denotes a structural or manual placement (same thread,
/// operator move), not a measured similarity.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MembershipLink {
    pub message_id: String,
    pub group_id: String,
    pub similarity_score: f32,
}

/// Patch applied to a group record; `None` fields are left untouched.
/// Nested options distinguish "clear the field" from "leave it alone".
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GroupUpdate {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub status: Option<GroupStatus>,
    pub priority: Option<Priority>,
    pub workflow_status: Option<WorkflowStatus>,
    pub assignee: Option<Option<String>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
}

/// Output of the upstream text classifier, carried alongside a raw message
/// through ingestion.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Classification {
    pub is_relevant: bool,
    pub category: Category,
    pub confidence: f32,
    pub summary: String,
}

impl Default for Classification {
    /// Safe fallback when classification fails upstream: the message is kept
    /// but never grouped semantically.
    fn default() -> Self {
        Self {
            is_relevant: false,
            category: Category::Irrelevant,
            confidence: 0.0,
            summary: "Classification error".to_string(),
        }
    }
}

/// Tuning knobs for the similarity grouper.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GroupingConfig {
    /// Minimum cosine similarity for joining an existing group.
    pub similarity_threshold: f32,
    /// Only groups created within this many hours are similarity candidates.
    pub lookback_hours: i64,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            // 0.60 tolerates paraphrased restatements of the same issue.
            similarity_threshold: 0.60,
            lookback_hours: 24,
        }
    }
}
