//! ReAct 过程事件：用于流式展示思考、工具调用、观察与最终答案

use serde::Serialize;

/// 单步过程事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReactEvent {
    /// ReAct 步数更新（当前第几步）
    StepUpdate { step: usize, max_steps: usize },
    /// 正在调用 LLM 思考
    Thinking,
    /// LLM 的思考内容（Thought / Action 原文预览）
    ThinkingContent { text: String },
    /// 调用工具
    ToolCall { tool: String, input: String },
    /// 工具返回（预览，避免过长）
    Observation { tool: String, preview: String },
    /// 工具执行失败
    ToolFailure { tool: String, reason: String },
    /// 解析错误恢复（RetryWithObservation / Abort）
    Recovery { action: String, detail: String },
    /// 最终答案
    FinalAnswer { text: String },
    /// Token 使用统计（本次运行增量）
    TokenUsage {
        prompt_tokens: u64,
        completion_tokens: u64,
        total_tokens: u64,
    },
    /// 错误
    Error { text: String },
}
