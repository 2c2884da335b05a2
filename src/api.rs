use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::commands::{on_bot_added, ChatContext};
use crate::filter::{classify, Decision};
use crate::knowledge::{MatchResult, UNAVAILABLE_REPLY};
use crate::pipeline::{InboundMessage, Outcome, Pipeline, Query, ReplyKind};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub chats: Arc<ChatContext>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            chats: Arc::new(ChatContext::new()),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/classify", post(classify_text))
        .route("/answer", post(answer_query))
        .route("/message", post(receive_message))
        .route("/joined", post(bot_joined))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Deserialize)]
struct ClassifyReq {
    text: String,
    #[serde(default)]
    sender_id: String,
}

async fn classify_text(
    State(state): State<AppState>,
    Json(body): Json<ClassifyReq>,
) -> Json<Decision> {
    Json(classify(
        &body.text,
        &body.sender_id,
        state.pipeline.blocklist(),
    ))
}

#[derive(serde::Deserialize)]
struct AnswerReq {
    query: String,
}

#[derive(serde::Serialize)]
struct AnswerResp {
    result: ReplyKind,
    text: String,
}

/// Lookup only; unknown queries are not queued from here.
async fn answer_query(
    State(state): State<AppState>,
    Json(body): Json<AnswerReq>,
) -> Result<Json<AnswerResp>, StatusCode> {
    let query = Query::parse(&body.query).map_err(|_| StatusCode::UNPROCESSABLE_ENTITY)?;
    let resp = match state.pipeline.knowledge().lookup(query.as_str()).await {
        Ok(m @ MatchResult::Answer(_)) => AnswerResp {
            result: ReplyKind::Answer,
            text: m.reply_text().to_string(),
        },
        Ok(MatchResult::Unknown) => AnswerResp {
            result: ReplyKind::Unknown,
            text: MatchResult::Unknown.reply_text().to_string(),
        },
        Err(_) => AnswerResp {
            result: ReplyKind::Unavailable,
            text: UNAVAILABLE_REPLY.to_string(),
        },
    };
    Ok(Json(resp))
}

/// Full pipeline. The learning step runs after the response is built.
async fn receive_message(
    State(state): State<AppState>,
    Json(msg): Json<InboundMessage>,
) -> Json<Outcome> {
    let handled = state.pipeline.handle(&msg, &state.chats).await;
    if let Some(task) = handled.learning {
        let pipeline = state.pipeline.clone();
        tokio::spawn(async move {
            pipeline.record_unanswered(&task).await;
        });
    }
    Json(handled.outcome)
}

#[derive(serde::Deserialize)]
struct JoinedReq {
    chat_id: String,
}

async fn bot_joined(State(state): State<AppState>, Json(body): Json<JoinedReq>) -> Json<Outcome> {
    Json(on_bot_added(&state.chats, &body.chat_id))
}
