//! 聊天会话：一次浏览器会话的显式状态对象
//!
//! 持有会话记录与当前交互阶段；不依赖 Web 宿主，可直接注入 Orchestrator 测试。
//! 每轮交互：begin_pass（凭证闸门 + 渲染历史）→ submit（空问题给出警告；否则追加 user、调用编排器、追加 assistant）。

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::UnboundedSender;

use crate::agent::Orchestrator;
use crate::core::{AgentError, PassInput, PassPhase};
use crate::credential::{self, ApiKey, GateNotice};
use crate::memory::{Conversation, Message};
use crate::react::ReactEvent;

/// 空问题提示
pub const EMPTY_QUESTION_WARNING: &str = "Please enter the question";

/// 一次提交的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// 未调用编排器，仅提示
    Warning(&'static str),
    /// 编排器返回的最终答案
    Answered(String),
}

#[derive(Debug, Clone)]
pub struct ChatSession {
    id: String,
    created_at: DateTime<Utc>,
    conversation: Conversation,
    phase: PassPhase,
}

impl ChatSession {
    pub fn new(greeting: &str) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), greeting)
    }

    pub fn with_id(id: impl Into<String>, greeting: &str) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            conversation: Conversation::with_greeting(greeting),
            phase: PassPhase::AwaitingCredential,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    pub fn phase(&self) -> PassPhase {
        self.phase
    }

    /// 开始新一轮交互：凭证缺失时停在 AwaitingCredential 并返回提示
    pub fn begin_pass(&mut self, credential: Option<&str>) -> Result<ApiKey, GateNotice> {
        self.phase = PassPhase::AwaitingCredential;
        let key = credential::check(credential)?;
        self.phase = self
            .phase
            .next(PassInput::Credential(Some(key.expose())))
            .next(PassInput::ShowHistory);
        Ok(key)
    }

    /// 提交问题；编排器失败时 user 消息保留、不追加 assistant，错误上抛
    pub async fn submit(
        &mut self,
        question: &str,
        orchestrator: &dyn Orchestrator,
        event_tx: Option<&UnboundedSender<ReactEvent>>,
    ) -> Result<SubmitOutcome, AgentError> {
        if self.phase != PassPhase::AwaitingInput {
            return Err(AgentError::MissingCredential);
        }
        if question.is_empty() {
            return Ok(SubmitOutcome::Warning(EMPTY_QUESTION_WARNING));
        }

        self.phase = self.phase.next(PassInput::Submit(question));
        self.conversation.push_user(question);
        tracing::info!(session = %self.id, messages = self.conversation.len(), "processing question");

        let result = orchestrator
            .respond(self.conversation.messages(), event_tx)
            .await;
        self.phase = self.phase.next(PassInput::OrchestratorReturned);

        let response = result?;
        self.conversation.push_assistant(response.clone());
        Ok(SubmitOutcome::Answered(response))
    }
}
