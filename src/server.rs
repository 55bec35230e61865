//! HTTP surface: the persistence gateway, the generation pipeline and the
//! protected home page.
//!
//! Callers authenticate with a token issued by the bot's `/login` command,
//! sent either as `Authorization: Bearer <token>` or as a `session` cookie.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{FromRequestParts, Query, State},
    http::{header, request::Parts, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use log::{error, info};
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::ApiError,
    gateway::PersistenceGateway,
    quiz::{ai_helper::QuizHelper, roadmap::RoadmapRequest, QuizRequest},
    store::{SaveQuiz, SaveRoadmap, UserId},
};

pub const SIGNIN_REDIRECT: &str = "/landing?message=signin_required";

#[derive(Clone)]
pub struct ApiState {
    pub helper: Arc<QuizHelper>,
    pub gateway: PersistenceGateway,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/landing", get(landing_handler))
        .route("/home", get(home_handler))
        .route("/api/quiz", get(list_quizzes_handler))
        .route("/api/quiz/save", post(save_quiz_handler))
        .route("/api/quiz/generate", post(generate_quiz_handler))
        .route("/api/roadmap", get(list_roadmaps_handler))
        .route("/api/roadmap/save", post(save_roadmap_handler))
        .route("/api/roadmap/generate", post(generate_roadmap_handler))
        .with_state(state)
}

pub async fn serve(state: ApiState, addr: SocketAddr) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP API listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await
}

/// The caller's identity, if the request carried a live session token.
pub struct Caller(pub Option<UserId>);

impl Caller {
    fn identity(&self) -> Option<&UserId> {
        self.0.as_ref()
    }
}

fn session_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    bearer.or_else(|| {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .find_map(|pair| pair.trim().strip_prefix("session="))
    })
}

#[axum::async_trait]
impl FromRequestParts<ApiState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(&parts.headers).filter(|t| !t.is_empty()) else {
            return Ok(Caller(None));
        };
        match state.gateway.store().resolve_login(token).await {
            Ok(user) => Ok(Caller(user)),
            Err(e) => {
                error!("Error resolving session: {e}");
                Err(ApiError::LoadFailed("session"))
            }
        }
    }
}

/// A caller that must be signed in. Rejects with 401 before any request body
/// is read, so anonymous callers never learn whether their payload was valid.
pub struct SignedIn(pub UserId);

#[axum::async_trait]
impl FromRequestParts<ApiState> for SignedIn {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState,
    ) -> Result<Self, Self::Rejection> {
        match Caller::from_request_parts(parts, state).await? {
            Caller(Some(user)) => Ok(SignedIn(user)),
            Caller(None) => Err(ApiError::Unauthorized),
        }
    }
}

async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    Json(json!({ "ok": true, "model": state.helper.model() }))
}

#[derive(Deserialize)]
struct LandingQuery {
    message: Option<String>,
}

async fn landing_handler(Query(query): Query<LandingQuery>) -> impl IntoResponse {
    let notice = match query.message.as_deref() {
        Some("signin_required") => Some("Please sign in to continue. Send /login to the bot."),
        _ => None,
    };
    Json(json!({
        "app": "studymate",
        "features": ["AI quizzes", "Study roadmaps", "Pomodoro timer"],
        "notice": notice,
    }))
}

async fn home_handler(
    State(state): State<ApiState>,
    caller: Caller,
) -> Result<Response, ApiError> {
    let Some(user) = caller.identity() else {
        return Ok(Redirect::to(SIGNIN_REDIRECT).into_response());
    };
    let quizzes = state
        .gateway
        .list_quizzes(Some(user))
        .await
        .map_err(|e| ApiError::loading(e, "quizzes"))?;
    let roadmaps = state
        .gateway
        .list_roadmaps(Some(user))
        .await
        .map_err(|e| ApiError::loading(e, "roadmaps"))?;

    Ok(Json(json!({
        "user": user,
        "quizzes": quizzes.len(),
        "roadmaps": roadmaps.len(),
        "lastQuiz": quizzes.first(),
        "lastRoadmap": roadmaps.first(),
    }))
    .into_response())
}

async fn save_quiz_handler(
    State(state): State<ApiState>,
    SignedIn(user): SignedIn,
    Json(quiz): Json<SaveQuiz>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .gateway
        .save_quiz(Some(&user), quiz)
        .await
        .map_err(|e| ApiError::saving(e, "quiz"))?;
    Ok(Json(record))
}

async fn save_roadmap_handler(
    State(state): State<ApiState>,
    SignedIn(user): SignedIn,
    Json(roadmap): Json<SaveRoadmap>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .gateway
        .save_roadmap(Some(&user), roadmap)
        .await
        .map_err(|e| ApiError::saving(e, "roadmap"))?;
    Ok(Json(record))
}

async fn list_quizzes_handler(
    State(state): State<ApiState>,
    caller: Caller,
) -> Result<impl IntoResponse, ApiError> {
    let records = state
        .gateway
        .list_quizzes(caller.identity())
        .await
        .map_err(|e| ApiError::loading(e, "quizzes"))?;
    Ok(Json(records))
}

async fn list_roadmaps_handler(
    State(state): State<ApiState>,
    caller: Caller,
) -> Result<impl IntoResponse, ApiError> {
    let records = state
        .gateway
        .list_roadmaps(caller.identity())
        .await
        .map_err(|e| ApiError::loading(e, "roadmaps"))?;
    Ok(Json(records))
}

async fn generate_quiz_handler(
    State(state): State<ApiState>,
    _: SignedIn,
    Json(request): Json<QuizRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let questions = state
        .helper
        .generate_questions(request)
        .await
        .map_err(|e| ApiError::generation(e, "questions"))?;
    Ok(Json(questions))
}

async fn generate_roadmap_handler(
    State(state): State<ApiState>,
    _: SignedIn,
    Json(request): Json<RoadmapRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let graph = state
        .helper
        .generate_roadmap(request)
        .await
        .map_err(|e| ApiError::generation(e, "roadmap"))?;
    Ok(Json(graph))
}
