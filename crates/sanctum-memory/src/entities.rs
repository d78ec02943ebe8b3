//! Record types kept by the therapy companion
//!
//! Each entity type lives under its own key prefix in the record store.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// A value stored under `<PREFIX><id>`.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    /// Key prefix, including the trailing underscore.
    const PREFIX: &'static str;

    /// Short label for reports and audit entries.
    const LABEL: &'static str;

    fn id(&self) -> String;

    fn record_key(&self) -> String {
        Self::key_for(&self.id())
    }

    fn key_for(id: &str) -> String {
        format!("{}{}", Self::PREFIX, id)
    }
}

/// Who spoke in a session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerRole {
    User,
    Therapist,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionMessage {
    pub role: SpeakerRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// A conversation session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub messages: Vec<SessionMessage>,
    pub summary: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            ended_at: None,
            messages: vec![],
            summary: None,
        }
    }

    pub fn add_message(&mut self, role: SpeakerRole, content: impl Into<String>) {
        self.messages.push(SessionMessage {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        });
    }

    /// Close the session, optionally with a summary
    pub fn end(&mut self, summary: Option<String>) {
        self.ended_at = Some(Utc::now());
        self.summary = summary;
    }

    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Entity for Session {
    const PREFIX: &'static str = "session_";
    const LABEL: &'static str = "session";

    fn id(&self) -> String {
        self.id.to_string()
    }
}

/// A single mood check-in
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoodEntry {
    pub id: Uuid,
    /// Mood score (1 - 10)
    pub mood: u8,
    pub emotions: Vec<String>,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl MoodEntry {
    pub fn new(mood: u8) -> Self {
        Self {
            id: Uuid::new_v4(),
            mood: mood.clamp(1, 10),
            emotions: vec![],
            note: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_emotions(mut self, emotions: Vec<String>) -> Self {
        self.emotions = emotions;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

impl Entity for MoodEntry {
    const PREFIX: &'static str = "mood_";
    const LABEL: &'static str = "mood";

    fn id(&self) -> String {
        self.id.to_string()
    }
}

/// A free-form journal entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalEntry {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl JournalEntry {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            content: content.into(),
            tags: vec![],
            created_at: Utc::now(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

impl Entity for JournalEntry {
    const PREFIX: &'static str = "journal_";
    const LABEL: &'static str = "journal";

    fn id(&self) -> String {
        self.id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keys() {
        let mood = MoodEntry::new(5);
        assert_eq!(mood.record_key(), format!("mood_{}", mood.id));
        assert_eq!(Session::key_for("abc"), "session_abc");
        assert_eq!(JournalEntry::key_for("x"), "journal_x");
    }

    #[test]
    fn test_mood_is_clamped() {
        assert_eq!(MoodEntry::new(0).mood, 1);
        assert_eq!(MoodEntry::new(42).mood, 10);
    }

    #[test]
    fn test_session_lifecycle() {
        let mut session = Session::new();
        session.add_message(SpeakerRole::User, "rough week");
        session.add_message(SpeakerRole::Therapist, "tell me more");
        assert!(session.is_active());

        session.end(Some("talked about work".to_string()));
        assert!(!session.is_active());
        assert_eq!(session.messages.len(), 2);
    }
}
