#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use triage_grouping::{EmbedError, Embedder};
use triage_protocol::{Category, Classification, Message};
use triage_store::{GroupStore, MemoryStore, NewMessage};

/// Embedder stub serving canned vectors keyed by exact message text.
/// Texts without a canned vector fail, like a flaky embedding service.
pub struct StubEmbedder {
    vectors: HashMap<String, Vec<f32>>,
}

impl StubEmbedder {
    pub fn new() -> Self {
        Self {
            vectors: HashMap::new(),
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| EmbedError(format!("no canned vector for '{text}'")))
    }
}

/// Embedder that always fails, for outage scenarios.
pub struct DownEmbedder;

#[async_trait]
impl Embedder for DownEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
        Err(EmbedError("embedding service down".to_string()))
    }
}

pub fn classified(category: Category, confidence: f32, summary: &str) -> Classification {
    Classification {
        is_relevant: category != Category::Irrelevant,
        category,
        confidence,
        summary: summary.to_string(),
    }
}

pub fn new_message(
    text: &str,
    thread_id: Option<&str>,
    category: Category,
    confidence: f32,
) -> NewMessage {
    NewMessage {
        thread_id: thread_id.map(String::from),
        text: text.to_string(),
        classification: classified(category, confidence, text),
        embedding: None,
        created_at: Utc::now(),
    }
}

/// Like `new_message` but offset in time, for arrival-order scenarios.
pub fn new_message_at(
    text: &str,
    thread_id: Option<&str>,
    category: Category,
    confidence: f32,
    offset_secs: i64,
) -> NewMessage {
    let mut new = new_message(text, thread_id, category, confidence);
    new.created_at = Utc::now() + Duration::seconds(offset_secs);
    new
}

/// Store a message without grouping it, returning the full record.
pub async fn store_message(store: &Arc<MemoryStore>, new: NewMessage) -> Message {
    let id = store.insert_message(new).await.unwrap();
    store.message(&id).await.unwrap().unwrap()
}
