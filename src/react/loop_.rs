//! ReAct 主循环
//!
//! Plan -> 解析 -> Act (Tool) -> Observe -> 下一轮 Plan，直到 Final Answer；
//! 受 max_iterations 与可选 max_execution 限制，达到上限时返回固定的停止提示。
//! 格式错误交给 RecoveryEngine：策略开启时作为 Observation 回灌，并计入 max_parse_retries；
//! LLM / 工具失败直接上抛，不在此层重试。
//! 可选 event_tx：向 Web 前端推送 Thinking / ToolCall / Observation / FinalAnswer 等事件。

use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedSender;

use crate::config::AgentSection;
use crate::core::{AgentError, RecoveryAction, RecoveryEngine};
use crate::memory::{IntermediateStep, Message, Role, WorkingMemory};
use crate::react::{parse_llm_output, Planner, PlannerOutput, ReactEvent};
use crate::tools::ToolExecutor;

/// 达到迭代或时间上限时的回复
pub const STOPPED_MESSAGE: &str = "Agent stopped due to iteration limit or time limit.";

/// Observation 预览最大字符数
const OBSERVATION_PREVIEW_CHARS: usize = 200;
/// 思考内容展示最大字符数
const THINKING_PREVIEW_CHARS: usize = 800;

/// 运行上限
#[derive(Debug, Clone)]
pub struct AgentLimits {
    pub max_iterations: usize,
    pub max_parse_retries: usize,
    pub max_execution: Option<Duration>,
}

impl Default for AgentLimits {
    fn default() -> Self {
        Self::from(&AgentSection::default())
    }
}

impl From<&AgentSection> for AgentLimits {
    fn from(cfg: &AgentSection) -> Self {
        Self {
            max_iterations: cfg.max_iterations,
            max_parse_retries: cfg.max_parse_retries,
            max_execution: cfg.max_execution_secs.map(Duration::from_secs),
        }
    }
}

/// ReAct 运行结果：最终回复与中间步骤
#[derive(Debug)]
pub struct ReactResult {
    pub response: String,
    pub steps: Vec<IntermediateStep>,
    pub iterations: usize,
}

/// ReAct 编排器：Planner + 工具执行器 + 解析错误恢复策略，构建一次后可多次运行
pub struct ReactAgent {
    planner: Planner,
    executor: ToolExecutor,
    recovery: RecoveryEngine,
    limits: AgentLimits,
}

fn send_event(tx: Option<&UnboundedSender<ReactEvent>>, ev: ReactEvent) {
    if let Some(t) = tx {
        let _ = t.send(ev);
    }
}

fn preview(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", text.chars().take(max).collect::<String>())
    } else {
        text.to_string()
    }
}

impl ReactAgent {
    pub fn new(
        planner: Planner,
        executor: ToolExecutor,
        recovery: RecoveryEngine,
        limits: AgentLimits,
    ) -> Self {
        Self {
            planner,
            executor,
            recovery,
            limits,
        }
    }

    pub fn executor(&self) -> &ToolExecutor {
        &self.executor
    }

    pub fn limits(&self) -> &AgentLimits {
        &self.limits
    }

    /// 对整段会话运行一次：最后一条 user 消息为问题，其之前的消息作为历史上下文
    pub async fn run(
        &self,
        history: &[Message],
        event_tx: Option<&UnboundedSender<ReactEvent>>,
    ) -> Result<ReactResult, AgentError> {
        let idx = history
            .iter()
            .rposition(|m| m.role == Role::User)
            .ok_or(AgentError::EmptyQuestion)?;
        let question = history[idx].content.as_str();
        let prior = &history[..idx];

        let (init_prompt, init_completion, _) = self.planner.token_usage();
        let started = Instant::now();
        let mut scratch = WorkingMemory::new();
        let mut iterations = 0;
        let mut parse_failures = 0;

        loop {
            let timed_out = self
                .limits
                .max_execution
                .is_some_and(|max| started.elapsed() >= max);
            if iterations >= self.limits.max_iterations || timed_out {
                tracing::warn!(iterations, timed_out, "agent stopped early");
                send_event(event_tx, ReactEvent::FinalAnswer {
                    text: STOPPED_MESSAGE.to_string(),
                });
                return Ok(ReactResult {
                    response: STOPPED_MESSAGE.to_string(),
                    steps: scratch.steps().to_vec(),
                    iterations,
                });
            }

            send_event(event_tx, ReactEvent::StepUpdate {
                step: iterations,
                max_steps: self.limits.max_iterations,
            });
            send_event(event_tx, ReactEvent::Thinking);

            let output = match self.planner.plan(question, prior, &scratch).await {
                Ok(o) => o,
                Err(e) => {
                    send_event(event_tx, ReactEvent::Error { text: e.to_string() });
                    return Err(e);
                }
            };
            send_event(event_tx, ReactEvent::ThinkingContent {
                text: preview(output.trim(), THINKING_PREVIEW_CHARS),
            });

            match parse_llm_output(&output) {
                Ok(PlannerOutput::Finish(answer)) => {
                    send_event(event_tx, ReactEvent::FinalAnswer { text: answer.clone() });
                    let (cur_prompt, cur_completion, _) = self.planner.token_usage();
                    let prompt_tokens = cur_prompt.saturating_sub(init_prompt);
                    let completion_tokens = cur_completion.saturating_sub(init_completion);
                    send_event(event_tx, ReactEvent::TokenUsage {
                        prompt_tokens,
                        completion_tokens,
                        total_tokens: prompt_tokens + completion_tokens,
                    });
                    return Ok(ReactResult {
                        response: answer,
                        steps: scratch.steps().to_vec(),
                        iterations: iterations + 1,
                    });
                }
                Ok(PlannerOutput::Action(action)) => {
                    send_event(event_tx, ReactEvent::ToolCall {
                        tool: action.tool.clone(),
                        input: action.tool_input.clone(),
                    });
                    let observation = match self.executor.registry().lookup(&action.tool) {
                        None => format!(
                            "{} is not a valid tool, try one of [{}].",
                            action.tool,
                            self.planner.tool_names()
                        ),
                        Some(tool) => {
                            match self.executor.execute(tool.kind(), &action.tool_input).await {
                                Ok(r) => r,
                                Err(e) => {
                                    send_event(event_tx, ReactEvent::ToolFailure {
                                        tool: action.tool.clone(),
                                        reason: e.to_string(),
                                    });
                                    send_event(event_tx, ReactEvent::Error { text: e.to_string() });
                                    return Err(e);
                                }
                            }
                        }
                    };
                    send_event(event_tx, ReactEvent::Observation {
                        tool: action.tool.clone(),
                        preview: preview(&observation, OBSERVATION_PREVIEW_CHARS),
                    });
                    scratch.add_step(action.log, observation);
                }
                Err(e) => match self.recovery.handle(&e) {
                    RecoveryAction::RetryWithObservation(observation) => {
                        parse_failures += 1;
                        if parse_failures > self.limits.max_parse_retries {
                            let err = AgentError::ParseRetriesExhausted(
                                parse_failures,
                                preview(output.trim(), OBSERVATION_PREVIEW_CHARS),
                            );
                            send_event(event_tx, ReactEvent::Recovery {
                                action: "Abort".to_string(),
                                detail: err.to_string(),
                            });
                            send_event(event_tx, ReactEvent::Error { text: err.to_string() });
                            return Err(err);
                        }
                        tracing::debug!(parse_failures, "recovering from malformed output");
                        send_event(event_tx, ReactEvent::Recovery {
                            action: "RetryWithObservation".to_string(),
                            detail: observation.clone(),
                        });
                        scratch.add_step(output.clone(), observation);
                    }
                    RecoveryAction::Abort => {
                        send_event(event_tx, ReactEvent::Recovery {
                            action: "Abort".to_string(),
                            detail: e.to_string(),
                        });
                        send_event(event_tx, ReactEvent::Error { text: e.to_string() });
                        return Err(e);
                    }
                },
            }

            iterations += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use crate::llm::{LlmClient, MockLlmClient};
    use crate::tools::{CalculatorTool, Tool, ToolKind, ToolRegistry};

    struct FakeWiki;

    #[async_trait]
    impl Tool for FakeWiki {
        fn kind(&self) -> ToolKind {
            ToolKind::Wikipedia
        }

        async fn execute(&self, input: &str) -> Result<String, String> {
            Ok(format!("Page: {}\nSummary: Alexander Fleming discovered it in 1928.", input))
        }
    }

    fn agent(llm: Arc<MockLlmClient>, limits: AgentLimits, handle_parsing: bool) -> ReactAgent {
        let llm_dyn: Arc<dyn LlmClient> = llm;
        let mut reg = ToolRegistry::new();
        reg.register(FakeWiki);
        reg.register(CalculatorTool::new(llm_dyn.clone()));
        let planner = Planner::new(llm_dyn, &reg.tool_descriptions());
        ReactAgent::new(
            planner,
            ToolExecutor::new(reg, 5),
            RecoveryEngine::new(handle_parsing),
            limits,
        )
    }

    fn history(q: &str) -> Vec<Message> {
        vec![Message::assistant("Hi"), Message::user(q)]
    }

    #[tokio::test]
    async fn test_tool_then_final_answer() {
        let llm = Arc::new(MockLlmClient::new([
            "I should look this up.\nAction: Wikipedia\nAction Input: Penicillin",
            "I now know the final answer\nFinal Answer: Alexander Fleming",
        ]));
        let a = agent(llm.clone(), AgentLimits::default(), true);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let res = a.run(&history("Who discovered penicillin?"), Some(&tx)).await.unwrap();
        assert_eq!(res.response, "Alexander Fleming");
        assert_eq!(res.iterations, 2);
        assert_eq!(res.steps.len(), 1);
        assert!(res.steps[0].observation.contains("1928"));

        // 第二轮 prompt 带着 scratchpad
        let second = &llm.calls()[1][0].content;
        assert!(second.contains("Observation: Page: Penicillin"));
        assert!(second.contains("Previous conversation:\nassistant: Hi\n"));

        drop(tx);
        let mut tools_called = Vec::new();
        while let Some(ev) = rx.recv().await {
            if let ReactEvent::ToolCall { tool, .. } = ev {
                tools_called.push(tool);
            }
        }
        assert_eq!(tools_called, vec!["Wikipedia"]);
    }

    #[tokio::test]
    async fn test_calculator_path_yields_41() {
        let llm = Arc::new(MockLlmClient::new([
            "Thought: compute apples\nAction: Calculator\nAction Input: 35 - 12 + 18",
            "```text\n35 - 12 + 18\n```",
            "Thought: I now know the final answer\nFinal Answer: Riya has 41 apples now.",
        ]));
        let a = agent(llm, AgentLimits::default(), true);
        let res = a.run(&history("Riya has 35 apples..."), None).await.unwrap();
        assert!(res.response.contains("41"));
        assert_eq!(res.steps[0].observation, "Answer: 41");
    }

    #[tokio::test]
    async fn test_parse_error_recovered() {
        let llm = Arc::new(MockLlmClient::new([
            "Let me think about this freely.",
            "Final Answer: 2",
        ]));
        let a = agent(llm.clone(), AgentLimits::default(), true);
        let res = a.run(&history("1+1?"), None).await.unwrap();
        assert_eq!(res.response, "2");
        assert!(llm.calls()[1][0]
            .content
            .contains("Observation: Invalid Format: Missing 'Action:' after 'Thought:'"));
    }

    #[tokio::test]
    async fn test_parse_retries_exhausted() {
        let llm = Arc::new(MockLlmClient::default().with_fallback("no format at all"));
        let limits = AgentLimits {
            max_parse_retries: 2,
            ..AgentLimits::default()
        };
        let a = agent(llm.clone(), limits, true);
        let err = a.run(&history("1+1?"), None).await.unwrap_err();
        assert!(matches!(err, AgentError::ParseRetriesExhausted(3, _)));
        assert_eq!(llm.call_count(), 3);
    }

    #[tokio::test]
    async fn test_parse_error_without_policy_is_fatal() {
        let llm = Arc::new(MockLlmClient::new(["rambling"]));
        let a = agent(llm.clone(), AgentLimits::default(), false);
        let err = a.run(&history("1+1?"), None).await.unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_observation() {
        let llm = Arc::new(MockLlmClient::new([
            "Action: Google\nAction Input: penicillin",
            "Final Answer: Fleming",
        ]));
        let a = agent(llm, AgentLimits::default(), true);
        let res = a.run(&history("Who?"), None).await.unwrap();
        assert_eq!(
            res.steps[0].observation,
            "Google is not a valid tool, try one of [Wikipedia, Calculator]."
        );
        assert_eq!(res.response, "Fleming");
    }

    #[tokio::test]
    async fn test_iteration_limit() {
        let llm = Arc::new(
            MockLlmClient::default().with_fallback("Action: Wikipedia\nAction Input: loop"),
        );
        let limits = AgentLimits {
            max_iterations: 2,
            ..AgentLimits::default()
        };
        let a = agent(llm.clone(), limits, true);
        let res = a.run(&history("loop forever"), None).await.unwrap();
        assert_eq!(res.response, STOPPED_MESSAGE);
        assert_eq!(res.iterations, 2);
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_llm_failure_propagates() {
        let llm = Arc::new(MockLlmClient::default().then_fail("invalid api key"));
        let a = agent(llm, AgentLimits::default(), true);
        let err = a.run(&history("hi"), None).await.unwrap_err();
        assert!(matches!(err, AgentError::LlmError(msg) if msg == "invalid api key"));
    }

    #[tokio::test]
    async fn test_no_question_is_rejected() {
        let llm = Arc::new(MockLlmClient::default());
        let a = agent(llm.clone(), AgentLimits::default(), true);
        assert!(matches!(
            a.run(&[Message::assistant("Hi")], None).await,
            Err(AgentError::EmptyQuestion)
        ));
        assert_eq!(llm.call_count(), 0);
    }
}
