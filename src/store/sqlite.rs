use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    FromRow,
};
use uuid::Uuid;

use super::{
    LoginSession, QuizRecord, RecordStore, RoadmapRecord, SaveQuiz, SaveRoadmap, UserId,
};
use crate::error::StoreError;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS quizzes (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        title TEXT NOT NULL,
        topic TEXT NOT NULL,
        difficulty TEXT NOT NULL,
        questions TEXT NOT NULL,
        answers TEXT NOT NULL,
        score REAL NOT NULL,
        time_taken INTEGER NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS quizzes_by_user ON quizzes (user_id)",
    "CREATE TABLE IF NOT EXISTS roadmaps (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        title TEXT NOT NULL,
        subject TEXT NOT NULL,
        level TEXT NOT NULL,
        nodes TEXT NOT NULL,
        edges TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS roadmaps_by_user ON roadmaps (user_id)",
    "CREATE TABLE IF NOT EXISTS logins (
        token TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
];

/// Record store backed by a SQLite file. JSON payloads are kept as text
/// columns and timestamps as RFC 3339 strings.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        info!("Opened record store at {url}");
        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self { pool })
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_id(raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Corrupt(format!("id {raw:?}: {e}")))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("created_at {raw:?}: {e}")))
}

#[derive(FromRow)]
struct QuizRow {
    id: String,
    user_id: String,
    title: String,
    topic: String,
    difficulty: String,
    questions: String,
    answers: String,
    score: f64,
    time_taken: i64,
    created_at: String,
}

impl TryFrom<QuizRow> for QuizRecord {
    type Error = StoreError;

    fn try_from(row: QuizRow) -> Result<Self, Self::Error> {
        Ok(QuizRecord {
            id: parse_id(&row.id)?,
            user_id: UserId::new(row.user_id),
            created_at: parse_timestamp(&row.created_at)?,
            quiz: SaveQuiz {
                title: row.title,
                topic: row.topic,
                difficulty: row.difficulty,
                questions: serde_json::from_str(&row.questions)?,
                answers: serde_json::from_str(&row.answers)?,
                score: row.score,
                time_taken: u64::try_from(row.time_taken).unwrap_or_default(),
            },
        })
    }
}

#[derive(FromRow)]
struct RoadmapRow {
    id: String,
    user_id: String,
    title: String,
    subject: String,
    level: String,
    nodes: String,
    edges: String,
    created_at: String,
}

impl TryFrom<RoadmapRow> for RoadmapRecord {
    type Error = StoreError;

    fn try_from(row: RoadmapRow) -> Result<Self, Self::Error> {
        Ok(RoadmapRecord {
            id: parse_id(&row.id)?,
            user_id: UserId::new(row.user_id),
            created_at: parse_timestamp(&row.created_at)?,
            roadmap: SaveRoadmap {
                title: row.title,
                subject: row.subject,
                level: row.level,
                nodes: serde_json::from_str(&row.nodes)?,
                edges: serde_json::from_str(&row.edges)?,
            },
        })
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn insert_quiz(&self, user: &UserId, quiz: SaveQuiz) -> Result<QuizRecord, StoreError> {
        let record = QuizRecord {
            id: Uuid::new_v4(),
            user_id: user.clone(),
            created_at: Utc::now(),
            quiz,
        };
        sqlx::query(
            "INSERT INTO quizzes
                (id, user_id, title, topic, difficulty, questions, answers, score, time_taken, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.to_string())
        .bind(user.as_str())
        .bind(&record.quiz.title)
        .bind(&record.quiz.topic)
        .bind(&record.quiz.difficulty)
        .bind(serde_json::to_string(&record.quiz.questions)?)
        .bind(serde_json::to_string(&record.quiz.answers)?)
        .bind(record.quiz.score)
        .bind(i64::try_from(record.quiz.time_taken).unwrap_or(i64::MAX))
        .bind(timestamp(record.created_at))
        .execute(&self.pool)
        .await?;
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
        sqlx::query(
            "INSERT INTO roadmaps (id, user_id, title, subject, level, nodes, edges, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.to_string())
        .bind(user.as_str())
        .bind(&record.roadmap.title)
        .bind(&record.roadmap.subject)
        .bind(&record.roadmap.level)
        .bind(serde_json::to_string(&record.roadmap.nodes)?)
        .bind(serde_json::to_string(&record.roadmap.edges)?)
        .bind(timestamp(record.created_at))
        .execute(&self.pool)
        .await?;
        Ok(record)
    }

    async fn quizzes_for(&self, user: &UserId) -> Result<Vec<QuizRecord>, StoreError> {
        let rows: Vec<QuizRow> =
            sqlx::query_as("SELECT * FROM quizzes WHERE user_id = ? ORDER BY rowid DESC")
                .bind(user.as_str())
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(QuizRecord::try_from).collect()
    }

    async fn roadmaps_for(&self, user: &UserId) -> Result<Vec<RoadmapRecord>, StoreError> {
        let rows: Vec<RoadmapRow> =
            sqlx::query_as("SELECT * FROM roadmaps WHERE user_id = ? ORDER BY rowid DESC")
                .bind(user.as_str())
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(RoadmapRecord::try_from).collect()
    }

    async fn create_login(&self, user: &UserId) -> Result<LoginSession, StoreError> {
        let session = LoginSession::issue(user.clone());
        sqlx::query("INSERT INTO logins (token, user_id, created_at) VALUES (?, ?, ?)")
            .bind(&session.token)
            .bind(user.as_str())
            .bind(timestamp(session.created_at))
            .execute(&self.pool)
            .await?;
        Ok(session)
    }

    async fn resolve_login(&self, token: &str) -> Result<Option<UserId>, StoreError> {
        let user: Option<(String,)> = sqlx::query_as("SELECT user_id FROM logins WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user.map(|(id,)| UserId::new(id)))
    }
}
