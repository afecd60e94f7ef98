use crate::agent::Agent;
use crate::protocol::{SendMessageRequest, SessionCreateResponse, StreamEvent, TranscriptResponse};
use crate::transcript::{Role, Transcript};
use crate::ui;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use futures::StreamExt;
use std::collections::HashMap;
use std::convert::Infallible;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, broadcast};
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

pub struct ServerConfig {
    pub listen: String,
}

struct ServerState {
    sessions: Mutex<HashMap<String, Arc<SessionState>>>,
}

struct SessionState {
    transcript: Mutex<Transcript>,
    events: broadcast::Sender<StreamEvent>,
    running: Mutex<bool>,
}

type ServerResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

pub async fn run(config: ServerConfig) -> ServerResult<()> {
    let state = Arc::new(ServerState {
        sessions: Mutex::new(HashMap::new()),
    });

    let app = axum::Router::new()
        .route("/", get(index))
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(get_transcript))
        .route("/sessions/:id/messages", post(send_message))
        .route("/sessions/:id/stream", get(stream_session))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind(&config.listen).await?;
    tracing::info!("scout listening on http://{}", config.listen);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn index() -> impl IntoResponse {
    ui::chat_page()
}

async fn create_session(State(state): State<Arc<ServerState>>) -> Json<SessionCreateResponse> {
    let session_id = Uuid::new_v4().to_string();
    let (events, _) = broadcast::channel(200);
    let session = Arc::new(SessionState {
        transcript: Mutex::new(Transcript::new()),
        events,
        running: Mutex::new(false),
    });

    state
        .sessions
        .lock()
        .await
        .insert(session_id.clone(), session);

    tracing::debug!(%session_id, "session created");
    Json(SessionCreateResponse { session_id })
}

async fn get_transcript(
    State(state): State<Arc<ServerState>>,
    Path(session_id): Path<String>,
) -> Result<Json<TranscriptResponse>, StatusCode> {
    let session = find_session(&state, &session_id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    let messages = session.transcript.lock().await.messages().to_vec();
    Ok(Json(TranscriptResponse { messages }))
}

async fn send_message(
    State(state): State<Arc<ServerState>>,
    Path(session_id): Path<String>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<StatusCode, StatusCode> {
    let session = find_session(&state, &session_id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    {
        let mut running = session.running.lock().await;
        if *running {
            return Err(StatusCode::CONFLICT);
        }
        *running = true;
    }

    let session_clone = Arc::clone(&session);
    tokio::spawn(async move {
        let result = run_agent_turn(session_clone, payload).await;
        if let Err(err) = result {
            tracing::warn!(error = %err, "agent turn failed");
            let _ = session.events.send(StreamEvent::Error {
                message: err.to_string(),
            });
        }
        let _ = session.events.send(StreamEvent::Done);
        let mut running = session.running.lock().await;
        *running = false;
    });

    Ok(StatusCode::ACCEPTED)
}

async fn stream_session(
    State(state): State<Arc<ServerState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let session = find_session(&state, &session_id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    let stream = BroadcastStream::new(session.events.subscribe()).filter_map(|item| async move {
        match item {
            Ok(event) => {
                let data = serde_json::to_string(&event).unwrap_or_default();
                Some(Ok::<Event, Infallible>(Event::default().data(data)))
            }
            Err(_) => None,
        }
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}

async fn run_agent_turn(session: Arc<SessionState>, payload: SendMessageRequest) -> ServerResult<()> {
    // The user turn lands in the transcript before the agent runs, so it
    // survives a failed turn.
    let turns = {
        let mut transcript = session.transcript.lock().await;
        transcript.add_message(Role::User, payload.content);
        transcript.messages().to_vec()
    };

    // Rebuilt every turn so the key currently in the page is the one used.
    let agent = Agent::new(payload.api_key);

    let events = session.events.clone();
    let mut on_event = move |event: StreamEvent| {
        let _ = events.send(event);
    };
    let answer = agent.run_agent(&turns, &mut on_event).await?;

    session
        .transcript
        .lock()
        .await
        .add_message(Role::Assistant, answer.clone());
    let _ = session.events.send(StreamEvent::Assistant { text: answer });

    Ok(())
}

async fn find_session(state: &ServerState, session_id: &str) -> Option<Arc<SessionState>> {
    state.sessions.lock().await.get(session_id).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_state() -> Arc<ServerState> {
        Arc::new(ServerState {
            sessions: Mutex::new(HashMap::new()),
        })
    }

    #[tokio::test]
    async fn created_sessions_start_with_the_greeting() {
        let state = new_state();
        let Json(created) = create_session(State(state.clone())).await;

        let Json(transcript) = get_transcript(State(state), Path(created.session_id))
            .await
            .unwrap();

        assert_eq!(transcript.messages.len(), 1);
        assert_eq!(transcript.messages[0].role, Role::Assistant);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let state = new_state();
        let status = get_transcript(State(state), Path("missing".to_string()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn second_turn_while_one_is_running_conflicts() {
        let state = new_state();
        let Json(created) = create_session(State(state.clone())).await;

        let session = find_session(&state, &created.session_id).await.unwrap();
        *session.running.lock().await = true;

        let status = send_message(
            State(state),
            Path(created.session_id),
            Json(SendMessageRequest {
                content: "hi".to_string(),
                api_key: "key".to_string(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(status, StatusCode::CONFLICT);
    }
}
