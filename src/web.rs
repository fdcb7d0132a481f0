//! Web 界面与 HTTP API
//!
//! 浏览器访问 `/`；前端通过以下接口驱动一次次交互：
//! - GET  /api/settings        页面标题、示例题目、凭证标签
//! - GET  /api/history         会话记录（新会话自动带问候语）
//! - POST /api/chat            同步问答
//! - POST /api/chat/stream     NDJSON 流：session_id → 过程事件 → response / error
//!
//! 每个会话一把异步锁：同一会话的一次交互完整结束前不会处理下一次。
//! 新建会话前回收空闲超过 session_ttl_secs 的会话，并把总数控制在 max_sessions 以内。

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, Mutex, OwnedMutexGuard, RwLock};

use crate::agent::{ConfigFactory, Orchestrator, OrchestratorFactory};
use crate::config::AppConfig;
use crate::core::AgentError;
use crate::credential::ApiKey;
use crate::memory::Message;
use crate::react::ReactEvent;
use crate::session::{ChatSession, SubmitOutcome, EMPTY_QUESTION_WARNING};

/// 单个会话：会话对象 + 按 Key 缓存的编排器
struct SessionEntry {
    session: ChatSession,
    assistant: Option<(ApiKey, Arc<dyn Orchestrator>)>,
}

impl SessionEntry {
    /// 同一 Key 复用已构建的编排器，Key 变化时重建
    fn orchestrator_for(
        &mut self,
        key: &ApiKey,
        factory: &dyn OrchestratorFactory,
    ) -> Result<Arc<dyn Orchestrator>, AgentError> {
        if let Some((cached_key, orch)) = &self.assistant {
            if cached_key == key {
                return Ok(Arc::clone(orch));
            }
        }
        let orch = factory.build(key)?;
        tracing::info!(session = %self.session.id(), "assistant components built");
        self.assistant = Some((key.clone(), Arc::clone(&orch)));
        Ok(orch)
    }
}

/// 会话表中的一项：会话本体 + 最近访问时间
struct SessionSlot {
    entry: Arc<Mutex<SessionEntry>>,
    last_seen: Instant,
}

impl SessionSlot {
    /// 仍有请求或流式任务持有该会话
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.entry) > 1
    }
}

pub struct AppState {
    config: AppConfig,
    factory: Arc<dyn OrchestratorFactory>,
    sessions: RwLock<HashMap<String, SessionSlot>>,
}

impl AppState {
    pub fn new(config: AppConfig, factory: Arc<dyn OrchestratorFactory>) -> Self {
        Self {
            config,
            factory,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// 取已有会话（刷新访问时间），或以给定 id（缺省为新 uuid）创建
    async fn session_entry(&self, session_id: Option<&str>) -> (String, Arc<Mutex<SessionEntry>>) {
        let requested = session_id.map(str::trim).filter(|s| !s.is_empty());
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        if let Some(id) = requested {
            if let Some(slot) = sessions.get_mut(id) {
                slot.last_seen = now;
                return (id.to_string(), Arc::clone(&slot.entry));
            }
        }

        self.prune(&mut sessions, now);
        let session = match requested {
            Some(id) => ChatSession::with_id(id, &self.config.app.greeting),
            None => ChatSession::new(&self.config.app.greeting),
        };
        let id = session.id().to_string();
        let entry = Arc::new(Mutex::new(SessionEntry {
            session,
            assistant: None,
        }));
        sessions.insert(
            id.clone(),
            SessionSlot {
                entry: Arc::clone(&entry),
                last_seen: now,
            },
        );
        (id, entry)
    }

    /// 回收空闲会话，并为即将插入的新会话腾出位置；正在使用的会话不动
    fn prune(&self, sessions: &mut HashMap<String, SessionSlot>, now: Instant) {
        let web = &self.config.web;
        let before = sessions.len();
        if web.session_ttl_secs > 0 {
            let ttl = Duration::from_secs(web.session_ttl_secs);
            sessions.retain(|_, slot| slot.in_use() || now.duration_since(slot.last_seen) < ttl);
        }
        if web.max_sessions > 0 {
            while sessions.len() >= web.max_sessions {
                let oldest = sessions
                    .iter()
                    .filter(|(_, slot)| !slot.in_use())
                    .min_by_key(|(_, slot)| slot.last_seen)
                    .map(|(id, _)| id.clone());
                match oldest {
                    Some(id) => {
                        sessions.remove(&id);
                    }
                    None => break,
                }
            }
        }
        let dropped = before - sessions.len();
        if dropped > 0 {
            tracing::info!(dropped, remaining = sessions.len(), "idle sessions pruned");
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[derive(Debug, Serialize)]
struct Notice {
    kind: &'static str,
    message: String,
}

type ApiError = (StatusCode, Json<Notice>);

fn notice(status: StatusCode, kind: &'static str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(Notice {
            kind,
            message: message.into(),
        }),
    )
}

fn agent_error(e: AgentError) -> ApiError {
    tracing::warn!(error = %e, "chat failed");
    match e {
        AgentError::MissingCredential => notice(StatusCode::UNAUTHORIZED, "info", e.to_string()),
        AgentError::ConfigError(_) => {
            notice(StatusCode::INTERNAL_SERVER_ERROR, "error", e.to_string())
        }
        _ => notice(StatusCode::BAD_GATEWAY, "error", e.to_string()),
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    session_id: String,
    response: String,
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct HistoryResponse {
    session_id: String,
    created_at: String,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct SettingsResponse {
    title: String,
    sample_question: String,
    credential_label: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/settings", get(api_settings))
        .route("/api/history", get(api_history))
        .route("/api/chat", post(api_chat))
        .route("/api/chat/stream", post(api_chat_stream))
        .with_state(state)
}

/// 绑定 [web] 段地址并运行服务
pub async fn serve(cfg: AppConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", cfg.web.host, cfg.web.port);
    let factory: Arc<dyn OrchestratorFactory> = Arc::new(ConfigFactory::new(cfg.clone()));
    let state = Arc::new(AppState::new(cfg, factory));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Mathmate Web UI: http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

async fn api_settings(State(state): State<Arc<AppState>>) -> Json<SettingsResponse> {
    let app = &state.config.app;
    Json(SettingsResponse {
        title: app.title.clone(),
        sample_question: app.sample_question.clone(),
        credential_label: app.credential_label.clone(),
    })
}

async fn api_history(
    State(state): State<Arc<AppState>>,
    Query(q): Query<HistoryQuery>,
) -> Json<HistoryResponse> {
    let (session_id, entry) = state.session_entry(q.session_id.as_deref()).await;
    let entry = entry.lock().await;
    Json(HistoryResponse {
        session_id,
        created_at: entry.session.created_at().to_rfc3339(),
        messages: entry.session.messages().to_vec(),
    })
}

/// 闸门 + 编排器准备；返回持有会话锁的 guard
async fn prepare(
    state: &AppState,
    req: &ChatRequest,
) -> Result<(String, OwnedMutexGuard<SessionEntry>, Arc<dyn Orchestrator>), ApiError> {
    let (session_id, entry) = state.session_entry(req.session_id.as_deref()).await;
    let mut entry = entry.lock_owned().await;
    let key = entry
        .session
        .begin_pass(req.api_key.as_deref())
        .map_err(|n| notice(StatusCode::UNAUTHORIZED, "info", n.to_string()))?;
    let orchestrator = entry
        .orchestrator_for(&key, state.factory.as_ref())
        .map_err(agent_error)?;
    Ok((session_id, entry, orchestrator))
}

async fn api_chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let (session_id, mut entry, orchestrator) = prepare(&state, &req).await?;
    match entry
        .session
        .submit(&req.question, orchestrator.as_ref(), None)
        .await
        .map_err(agent_error)?
    {
        SubmitOutcome::Warning(w) => Err(notice(StatusCode::BAD_REQUEST, "warning", w)),
        SubmitOutcome::Answered(response) => Ok(Json(ChatResponse {
            session_id,
            response,
            messages: entry.session.messages().to_vec(),
        })),
    }
}

fn ndjson_line<T: Serialize>(value: &T) -> Bytes {
    let mut line = serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string());
    line.push('\n');
    Bytes::from(line)
}

async fn api_chat_stream(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let (session_id, mut entry, orchestrator) = prepare(&state, &req).await?;
    if req.question.is_empty() {
        return Err(notice(StatusCode::BAD_REQUEST, "warning", EMPTY_QUESTION_WARNING));
    }

    let (event_tx, event_rx) = mpsc::unbounded_channel::<ReactEvent>();
    let (done_tx, done_rx) = oneshot::channel::<Result<(String, Vec<Message>), String>>();
    let question = req.question.clone();

    // 客户端断开时任务仍跑完，会话记录保持完整
    tokio::spawn(async move {
        let result = entry
            .session
            .submit(&question, orchestrator.as_ref(), Some(&event_tx))
            .await;
        drop(event_tx);
        let outcome = match result {
            Ok(SubmitOutcome::Answered(response)) => {
                Ok((response, entry.session.messages().to_vec()))
            }
            Ok(SubmitOutcome::Warning(w)) => Err(w.to_string()),
            Err(e) => {
                tracing::warn!(error = %e, "chat stream failed");
                Err(e.to_string())
            }
        };
        let _ = done_tx.send(outcome);
    });

    let head = stream::once(async move {
        ndjson_line(&serde_json::json!({ "type": "session_id", "session_id": session_id }))
    });
    let events = stream::unfold(event_rx, |mut rx| async move {
        rx.recv().await.map(|ev| (ndjson_line(&ev), rx))
    });
    let tail = stream::once(async move {
        match done_rx.await {
            Ok(Ok((response, messages))) => ndjson_line(&serde_json::json!({
                "type": "response",
                "text": response,
                "messages": messages,
            })),
            Ok(Err(text)) => ndjson_line(&serde_json::json!({ "type": "error", "text": text })),
            Err(_) => ndjson_line(&serde_json::json!({
                "type": "error",
                "text": "processing task ended unexpectedly",
            })),
        }
    });
    let body = head
        .chain(events)
        .chain(tail)
        .map(Ok::<Bytes, Infallible>);

    Ok((
        [(header::CONTENT_TYPE, "application/x-ndjson; charset=utf-8")],
        Body::from_stream(body),
    )
        .into_response())
}
