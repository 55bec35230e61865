//! Durable records of finished work, plus the login sessions that tie HTTP
//! callers to an account.

pub mod sqlite;

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::StoreError,
    quiz::{
        roadmap::{RoadmapGraph, RoadmapRequest},
        session::QuizSession,
    },
};

pub use sqlite::SqliteStore;

/// Authenticated account identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn telegram(user_id: u64) -> Self {
        Self(format!("telegram:{user_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A finished quiz as submitted for saving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveQuiz {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub difficulty: String,
    pub questions: Value,
    pub answers: Value,
    pub score: f64,
    pub time_taken: u64,
}

impl SaveQuiz {
    /// Snapshot of a scored session. `None` until the session is completed.
    pub fn from_session(session: &QuizSession) -> Result<Option<Self>, StoreError> {
        let Some(score) = session.score() else {
            return Ok(None);
        };
        let request = &session.config().request;
        Ok(Some(Self {
            title: format!("{} Quiz", request.topic),
            topic: request.topic.clone(),
            difficulty: request.difficulty.to_string(),
            questions: serde_json::to_value(session.questions())?,
            answers: serde_json::to_value(session.answers())?,
            score: score.correct as f64,
            time_taken: score.elapsed_seconds,
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRoadmap {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub level: String,
    pub nodes: Value,
    pub edges: Value,
}

impl SaveRoadmap {
    pub fn from_graph(request: &RoadmapRequest, graph: &RoadmapGraph) -> Result<Self, StoreError> {
        Ok(Self {
            title: format!("{} Roadmap", request.subject),
            subject: request.subject.clone(),
            level: request.level.to_string(),
            nodes: serde_json::to_value(&graph.nodes)?,
            edges: serde_json::to_value(&graph.edges)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRecord {
    pub id: Uuid,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub quiz: SaveQuiz,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapRecord {
    pub id: Uuid,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub roadmap: SaveRoadmap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginSession {
    pub token: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl LoginSession {
    pub fn issue(user_id: UserId) -> Self {
        Self {
            token: Uuid::new_v4().simple().to_string(),
            user_id,
            created_at: Utc::now(),
        }
    }
}

/// Append-only storage. Records are written once and never changed.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_quiz(&self, user: &UserId, quiz: SaveQuiz) -> Result<QuizRecord, StoreError>;

    async fn insert_roadmap(
        &self,
        user: &UserId,
        roadmap: SaveRoadmap,
    ) -> Result<RoadmapRecord, StoreError>;

    /// Newest first.
    async fn quizzes_for(&self, user: &UserId) -> Result<Vec<QuizRecord>, StoreError>;

    /// Newest first.
    async fn roadmaps_for(&self, user: &UserId) -> Result<Vec<RoadmapRecord>, StoreError>;

    async fn create_login(&self, user: &UserId) -> Result<LoginSession, StoreError>;

    async fn resolve_login(&self, token: &str) -> Result<Option<UserId>, StoreError>;
}

#[derive(Default)]
struct Tables {
    quizzes: Vec<QuizRecord>,
    roadmaps: Vec<RoadmapRecord>,
    logins: HashMap<String, LoginSession>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> Result<T, StoreError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(f(&tables))
    }

    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> Result<T, StoreError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(f(&mut tables))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_quiz(&self, user: &UserId, quiz: SaveQuiz) -> Result<QuizRecord, StoreError> {
        let record = QuizRecord {
            id: Uuid::new_v4(),
            user_id: user.clone(),
            created_at: Utc::now(),
            quiz,
        };
        self.write(|t| t.quizzes.push(record.clone()))?;
        Ok(record)
    }

    async fn insert_roadmap(
        &self,
        user: &UserId,
        roadmap: SaveRoadmap,
    ) -> Result<RoadmapRecord, StoreError> {
        let record = RoadmapRecord {
            id: Uuid::new_v4(),
            user_id: user.clone(),
            created_at: Utc::now(),
            roadmap,
        };
        self.write(|t| t.roadmaps.push(record.clone()))?;
        Ok(record)
    }

    async fn quizzes_for(&self, user: &UserId) -> Result<Vec<QuizRecord>, StoreError> {
        self.read(|t| {
            t.quizzes
                .iter()
                .rev()
                .filter(|r| &r.user_id == user)
                .cloned()
                .collect()
        })
    }

    async fn roadmaps_for(&self, user: &UserId) -> Result<Vec<RoadmapRecord>, StoreError> {
        self.read(|t| {
            t.roadmaps
                .iter()
                .rev()
                .filter(|r| &r.user_id == user)
                .cloned()
                .collect()
        })
    }

    async fn create_login(&self, user: &UserId) -> Result<LoginSession, StoreError> {
        let session = LoginSession::issue(user.clone());
        self.write(|t| t.logins.insert(session.token.clone(), session.clone()))?;
        Ok(session)
    }

    async fn resolve_login(&self, token: &str) -> Result<Option<UserId>, StoreError> {
        self.read(|t| t.logins.get(token).map(|s| s.user_id.clone()))
    }
}

/// `RECORDS_DB` value that keeps records in process instead of SQLite.
pub const MEMORY_URL: &str = "memory";

/// Opens the store named by `url`: [`MEMORY_URL`] or a sqlx SQLite URL.
pub async fn open(url: &str) -> Result<Arc<dyn RecordStore>, StoreError> {
    if url == MEMORY_URL {
        warn!("Keeping records in memory, they are lost on restart");
        return Ok(Arc::new(MemoryStore::new()));
    }
    Ok(Arc::new(SqliteStore::open(url).await?))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::json;

    use super::*;

    pub fn quiz(title: &str) -> SaveQuiz {
        SaveQuiz {
            title: title.to_string(),
            topic: "Math".to_string(),
            difficulty: "medium".to_string(),
            questions: json!([{ "question": "2 + 2?", "options": ["1", "2", "3", "4"], "correctAnswer": "4" }]),
            answers: json!(["4"]),
            score: 1.0,
            time_taken: 42,
        }
    }

    pub fn roadmap(title: &str) -> SaveRoadmap {
        SaveRoadmap {
            title: title.to_string(),
            subject: "Biology".to_string(),
            level: "beginner".to_string(),
            nodes: json!([{ "id": "1", "data": { "label": "Biology" }, "position": { "x": 0, "y": 0 } }]),
            edges: json!([]),
        }
    }

    /// Logins work, every record operation fails.
    #[derive(Default)]
    pub struct BrokenStore {
        pub logins: MemoryStore,
    }

    fn broken<T>() -> Result<T, StoreError> {
        Err(StoreError::Unavailable("disk on fire".to_string()))
    }

    #[async_trait]
    impl RecordStore for BrokenStore {
        async fn insert_quiz(&self, _: &UserId, _: SaveQuiz) -> Result<QuizRecord, StoreError> {
            broken()
        }

        async fn insert_roadmap(
            &self,
            _: &UserId,
            _: SaveRoadmap,
        ) -> Result<RoadmapRecord, StoreError> {
            broken()
        }

        async fn quizzes_for(&self, _: &UserId) -> Result<Vec<QuizRecord>, StoreError> {
            broken()
        }

        async fn roadmaps_for(&self, _: &UserId) -> Result<Vec<RoadmapRecord>, StoreError> {
            broken()
        }

        async fn create_login(&self, user: &UserId) -> Result<LoginSession, StoreError> {
            self.logins.create_login(user).await
        }

        async fn resolve_login(&self, token: &str) -> Result<Option<UserId>, StoreError> {
            self.logins.resolve_login(token).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::{
        self,
        roadmap::Level,
        session::{QuizConfig, SessionAction},
        Difficulty, QuizRequest,
    };

    #[tokio::test]
    async fn open_picks_the_backend_from_the_url() {
        let alice = UserId::new("alice@example.com");
        let file = std::env::temp_dir().join(format!("studymate-{}.sqlite", Uuid::new_v4()));
        let sqlite_url = format!("sqlite:{}", file.display());

        for url in [MEMORY_URL, sqlite_url.as_str()] {
            let store = open(url).await.unwrap();
            store.insert_quiz(&alice, fixtures::quiz("first")).await.unwrap();
            assert_eq!(store.quizzes_for(&alice).await.unwrap().len(), 1, "{url}");
        }
        assert!(file.exists());
        let _ = std::fs::remove_file(file);
    }

    #[tokio::test]
    async fn records_are_scoped_to_their_owner_newest_first() {
        let store = MemoryStore::new();
        let alice = UserId::new("alice@example.com");
        let bob = UserId::new("bob@example.com");

        store.insert_quiz(&alice, fixtures::quiz("first")).await.unwrap();
        store.insert_quiz(&bob, fixtures::quiz("bob's")).await.unwrap();
        store.insert_quiz(&alice, fixtures::quiz("second")).await.unwrap();

        let titles: Vec<_> = store
            .quizzes_for(&alice)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.quiz.title)
            .collect();
        assert_eq!(titles, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn every_save_is_a_new_record() {
        let store = MemoryStore::new();
        let user = UserId::telegram(7);
        let a = store.insert_roadmap(&user, fixtures::roadmap("Bio")).await.unwrap();
        let b = store.insert_roadmap(&user, fixtures::roadmap("Bio")).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(store.roadmaps_for(&user).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn login_tokens_resolve_to_their_user() {
        let store = MemoryStore::new();
        let user = UserId::telegram(42);
        let session = store.create_login(&user).await.unwrap();

        assert_eq!(store.resolve_login(&session.token).await.unwrap(), Some(user));
        assert_eq!(store.resolve_login("nope").await.unwrap(), None);
    }

    #[test]
    fn only_completed_sessions_snapshot() {
        let config = QuizConfig::new(QuizRequest::new("Math", 2, Difficulty::Hard), 60);
        let mut session = QuizSession::new(config);
        session
            .apply(SessionAction::Begin(quiz::fixtures::questions(2)))
            .unwrap();
        assert_eq!(SaveQuiz::from_session(&session).unwrap(), None);

        session
            .apply(SessionAction::Select("Q1 option 2".into()))
            .unwrap();
        session.apply(SessionAction::Expire).unwrap();

        let saved = SaveQuiz::from_session(&session).unwrap().unwrap();
        assert_eq!(saved.title, "Math Quiz");
        assert_eq!(saved.difficulty, "hard");
        assert_eq!(saved.score, 1.0);
        assert_eq!(saved.time_taken, 60);
        assert_eq!(saved.answers, serde_json::json!(["Q1 option 2", ""]));
        assert_eq!(saved.questions.as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn roadmap_snapshot_keeps_the_graph() {
        let graph = quiz::roadmap::fixtures::biology();
        let request = RoadmapRequest::new("Biology", Level::Advanced);
        let saved = SaveRoadmap::from_graph(&request, &graph).unwrap();

        assert_eq!(saved.title, "Biology Roadmap");
        assert_eq!(saved.level, "advanced");
        assert_eq!(saved.edges[2]["source"], "3");
        assert_eq!(saved.nodes[3]["data"]["label"], "DNA");
    }

    #[test]
    fn quiz_record_wire_format() {
        let record = QuizRecord {
            id: Uuid::nil(),
            user_id: UserId::new("alice@example.com"),
            created_at: Utc::now(),
            quiz: fixtures::quiz("Math"),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["userId"], "alice@example.com");
        assert_eq!(json["timeTaken"], 42);
        assert_eq!(json["title"], "Math");
        assert!(json["questions"].is_array());
    }
}
