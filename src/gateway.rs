use std::sync::Arc;

use log::{error, info, warn};

use crate::{
    error::GatewayError,
    store::{QuizRecord, RecordStore, RoadmapRecord, SaveQuiz, SaveRoadmap, UserId},
};

/// The only way into the record store. Every call needs an identity.
#[derive(Clone)]
pub struct PersistenceGateway {
    store: Arc<dyn RecordStore>,
}

fn require(identity: Option<&UserId>) -> Result<&UserId, GatewayError> {
    identity.ok_or_else(|| {
        warn!("Rejected unauthenticated persistence call");
        GatewayError::Unauthorized
    })
}

impl PersistenceGateway {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub async fn save_quiz(
        &self,
        identity: Option<&UserId>,
        quiz: SaveQuiz,
    ) -> Result<QuizRecord, GatewayError> {
        let user = require(identity)?;
        let record = self.store.insert_quiz(user, quiz).await.map_err(|e| {
            error!("Error saving quiz for {user}: {e}");
            e
        })?;
        info!("Saved quiz {} for {user}", record.id);
        Ok(record)
    }

    pub async fn save_roadmap(
        &self,
        identity: Option<&UserId>,
        roadmap: SaveRoadmap,
    ) -> Result<RoadmapRecord, GatewayError> {
        let user = require(identity)?;
        let record = self.store.insert_roadmap(user, roadmap).await.map_err(|e| {
            error!("Error saving roadmap for {user}: {e}");
            e
        })?;
        info!("Saved roadmap {} for {user}", record.id);
        Ok(record)
    }

    pub async fn list_quizzes(
        &self,
        identity: Option<&UserId>,
    ) -> Result<Vec<QuizRecord>, GatewayError> {
        let user = require(identity)?;
        Ok(self.store.quizzes_for(user).await?)
    }

    pub async fn list_roadmaps(
        &self,
        identity: Option<&UserId>,
    ) -> Result<Vec<RoadmapRecord>, GatewayError> {
        let user = require(identity)?;
        Ok(self.store.roadmaps_for(user).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{
        fixtures::{self, BrokenStore},
        MemoryStore,
    };

    fn gateway() -> (PersistenceGateway, MemoryStore) {
        let store = MemoryStore::new();
        (PersistenceGateway::new(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn anonymous_save_never_touches_the_store() {
        let (gateway, store) = gateway();

        let err = gateway.save_quiz(None, fixtures::quiz("Math")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Unauthorized));

        let err = gateway
            .save_roadmap(None, fixtures::roadmap("Bio"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Unauthorized));

        let anyone = UserId::telegram(1);
        assert!(store.quizzes_for(&anyone).await.unwrap().is_empty());
        assert!(store.roadmaps_for(&anyone).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_attaches_the_caller() {
        let (gateway, _) = gateway();
        let alice = UserId::new("alice@example.com");

        let record = gateway
            .save_quiz(Some(&alice), fixtures::quiz("Math"))
            .await
            .unwrap();
        assert_eq!(record.user_id, alice);
        assert_eq!(record.quiz.score, 1.0);
        assert_eq!(record.quiz.time_taken, 42);
    }

    #[tokio::test]
    async fn listing_requires_identity_and_is_scoped() {
        let (gateway, _) = gateway();
        let alice = UserId::new("alice@example.com");
        let bob = UserId::new("bob@example.com");
        gateway.save_roadmap(Some(&alice), fixtures::roadmap("A")).await.unwrap();
        gateway.save_roadmap(Some(&bob), fixtures::roadmap("B")).await.unwrap();

        assert!(matches!(
            gateway.list_roadmaps(None).await,
            Err(GatewayError::Unauthorized)
        ));
        let mine = gateway.list_roadmaps(Some(&alice)).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].roadmap.title, "A");
        assert!(gateway.list_quizzes(Some(&alice)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn storage_failure_is_a_persistence_error() {
        let gateway = PersistenceGateway::new(Arc::new(BrokenStore::default()));
        let user = UserId::telegram(5);

        let err = gateway
            .save_quiz(Some(&user), fixtures::quiz("Math"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Persistence(_)));

        let err = gateway.list_quizzes(Some(&user)).await.unwrap_err();
        assert!(matches!(err, GatewayError::Persistence(_)));
    }
}
