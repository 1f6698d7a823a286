use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::types::FeedbackKind;

#[derive(Error, Debug)]
pub enum FeedbackError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Thumbs up/down on a single assistant reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub message: String,
    pub feedback: FeedbackKind,
    pub timestamp: DateTime<Utc>,
}

/// Overall experience rating with optional comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub rating: u8,
    pub comments: String,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait FeedbackSink: Send + Sync {
    async fn record_reaction(&self, record: FeedbackRecord) -> Result<(), FeedbackError>;

    async fn record_rating(&self, record: RatingRecord) -> Result<(), FeedbackError>;
}

/// Writes feedback to the log and nowhere else.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFeedbackSink;

#[async_trait]
impl FeedbackSink for LogFeedbackSink {
    async fn record_reaction(&self, record: FeedbackRecord) -> Result<(), FeedbackError> {
        info!("Feedback received: {:?} on message {:?}", record.feedback, record.message);
        Ok(())
    }

    async fn record_rating(&self, record: RatingRecord) -> Result<(), FeedbackError> {
        info!("Rating received: {} ({:?})", record.rating, record.comments);
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum JsonlEntry<'a> {
    Reaction(&'a FeedbackRecord),
    Rating(&'a RatingRecord),
}

/// Appends every record as one JSON line to a file.
pub struct JsonlFeedbackSink {
    path: PathBuf,
    // serialises appends so lines never interleave
    write_lock: Mutex<()>,
}

impl JsonlFeedbackSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, entry: JsonlEntry<'_>) -> Result<(), FeedbackError> {
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl FeedbackSink for JsonlFeedbackSink {
    async fn record_reaction(&self, record: FeedbackRecord) -> Result<(), FeedbackError> {
        self.append(JsonlEntry::Reaction(&record)).await
    }

    async fn record_rating(&self, record: RatingRecord) -> Result<(), FeedbackError> {
        self.append(JsonlEntry::Rating(&record)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_jsonl_sink_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlFeedbackSink::new(dir.path().join("nested/feedback.jsonl"));

        sink.record_reaction(FeedbackRecord {
            message: "hello".into(),
            feedback: FeedbackKind::Negative,
            timestamp: Utc::now(),
        })
        .await
        .unwrap();
        sink.record_rating(RatingRecord {
            rating: 4,
            comments: "quick answers".into(),
            timestamp: Utc::now(),
        })
        .await
        .unwrap();

        let written = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<serde_json::Value> = written
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["kind"], "reaction");
        assert_eq!(lines[0]["feedback"], "negative");
        assert_eq!(lines[1]["kind"], "rating");
        assert_eq!(lines[1]["rating"], 4);
    }

    #[tokio::test]
    async fn test_log_sink_accepts_everything() {
        let sink = LogFeedbackSink;
        let result = sink
            .record_reaction(FeedbackRecord {
                message: "hi".into(),
                feedback: FeedbackKind::Positive,
                timestamp: Utc::now(),
            })
            .await;
        assert!(result.is_ok());
    }
}
