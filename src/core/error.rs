//! Agent 错误类型与恢复动作
//!
//! 与 RecoveryEngine 配合：根据 AgentError 决定把解析错误回灌为 Observation 重试，还是终止本次运行。

use thiserror::Error;

/// 编排过程中可能出现的错误（凭证、输入、解析、工具、LLM 等）
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Missing API key")]
    MissingCredential,

    #[error("Empty question")]
    EmptyQuestion,

    /// LLM 输出不符合 ReAct 格式；observation 为回灌给 LLM 的提示
    #[error("Could not parse LLM output: {output}")]
    OutputParse { output: String, observation: String },

    /// 解析错误重试次数耗尽
    #[error("Too many malformed outputs ({0}), last: {1}")]
    ParseRetriesExhausted(usize, String),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}

impl AgentError {
    /// 是否属于可由编排器自行恢复的错误
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AgentError::OutputParse { .. })
    }
}

/// 恢复引擎根据错误类型给出的建议动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// 将提示作为 Observation 写回 scratchpad，让 LLM 重新输出
    RetryWithObservation(String),
    /// 终止当前运行，错误上抛给用户
    Abort,
}
