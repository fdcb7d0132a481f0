//! Headless Agent 运行时
//!
//! 供 Web 等前端调用的无界面逻辑：
//! - Orchestrator：不透明的编排能力，输入整段会话、输出一个最终答案
//! - OrchestratorFactory：通过凭证闸门后才被调用，用 API Key 构建 LLM、工具注册表与 ReactAgent
//! - create_llm_from_config / create_agent_with_llm：按配置组装组件

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use crate::config::AppConfig;
use crate::core::{AgentError, RecoveryEngine};
use crate::credential::ApiKey;
use crate::llm::{create_groq_client, LlmClient, OpenAiClient};
use crate::memory::Message;
use crate::react::{AgentLimits, Planner, ReactAgent, ReactEvent};
use crate::tools::{default_registry, ToolExecutor, ToolRegistry};

/// 编排能力：给定会话与可选事件通道，返回一个最终答案
#[async_trait]
pub trait Orchestrator: Send + Sync {
    async fn respond(
        &self,
        history: &[Message],
        event_tx: Option<&UnboundedSender<ReactEvent>>,
    ) -> Result<String, AgentError>;
}

#[async_trait]
impl Orchestrator for ReactAgent {
    async fn respond(
        &self,
        history: &[Message],
        event_tx: Option<&UnboundedSender<ReactEvent>>,
    ) -> Result<String, AgentError> {
        self.run(history, event_tx).await.map(|r| r.response)
    }
}

/// 用凭证构建编排器（每个会话、每个 Key 构建一次）
pub trait OrchestratorFactory: Send + Sync {
    fn build(&self, api_key: &ApiKey) -> Result<Arc<dyn Orchestrator>, AgentError>;
}

/// 按 [llm] 段创建客户端：groq（默认）或任意 OpenAI 兼容端点
pub fn create_llm_from_config(
    cfg: &AppConfig,
    api_key: &ApiKey,
) -> Result<Arc<dyn LlmClient>, AgentError> {
    let provider = cfg.llm.provider.to_lowercase();
    let client = match provider.as_str() {
        "groq" => create_groq_client(api_key.expose(), Some(&cfg.llm.model)),
        "openai" => OpenAiClient::new(cfg.llm.base_url.as_deref(), &cfg.llm.model, api_key.expose()),
        other => {
            return Err(AgentError::ConfigError(format!(
                "Unknown LLM provider: {}",
                other
            )))
        }
    };
    tracing::info!(provider = %provider, model = %client.model(), "LLM client created");
    Ok(Arc::new(
        client
            .with_request_timeout(cfg.llm.timeouts.request)
            .with_temperature(cfg.llm.temperature),
    ))
}

/// 用给定注册表组装 ReactAgent
pub fn build_agent(cfg: &AppConfig, llm: Arc<dyn LlmClient>, registry: ToolRegistry) -> ReactAgent {
    let planner = Planner::new(llm, &registry.tool_descriptions());
    ReactAgent::new(
        planner,
        ToolExecutor::new(registry, cfg.tools.tool_timeout_secs),
        RecoveryEngine::new(cfg.agent.handle_parsing_errors),
        AgentLimits::from(&cfg.agent),
    )
}

/// 默认三件工具 + ReactAgent
pub fn create_agent_with_llm(cfg: &AppConfig, llm: Arc<dyn LlmClient>) -> ReactAgent {
    let registry = default_registry(llm.clone(), &cfg.tools);
    build_agent(cfg, llm, registry)
}

/// 基于配置的工厂：Groq / OpenAI 兼容 LLM + 默认工具
pub struct ConfigFactory {
    cfg: AppConfig,
}

impl ConfigFactory {
    pub fn new(cfg: AppConfig) -> Self {
        Self { cfg }
    }
}

impl OrchestratorFactory for ConfigFactory {
    fn build(&self, api_key: &ApiKey) -> Result<Arc<dyn Orchestrator>, AgentError> {
        let llm = create_llm_from_config(&self.cfg, api_key)?;
        Ok(Arc::new(create_agent_with_llm(&self.cfg, llm)))
    }
}
