//! 错误恢复引擎
//!
//! 根据 AgentError 类型与解析错误策略返回 RecoveryAction，供 ReAct 循环决定重试还是终止。

use crate::core::{AgentError, RecoveryAction};

/// 解析错误恢复：handle_parsing_errors 开启时把解析错误转为 Observation，其余错误一律终止
#[derive(Debug, Clone)]
pub struct RecoveryEngine {
    handle_parsing_errors: bool,
}

impl Default for RecoveryEngine {
    fn default() -> Self {
        Self::new(true)
    }
}

impl RecoveryEngine {
    pub fn new(handle_parsing_errors: bool) -> Self {
        Self {
            handle_parsing_errors,
        }
    }

    pub fn handles_parsing_errors(&self) -> bool {
        self.handle_parsing_errors
    }

    pub fn handle(&self, err: &AgentError) -> RecoveryAction {
        match err {
            AgentError::OutputParse { observation, .. } if self.handle_parsing_errors => {
                RecoveryAction::RetryWithObservation(observation.clone())
            }
            _ => RecoveryAction::Abort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_err() -> AgentError {
        AgentError::OutputParse {
            output: "garbage".to_string(),
            observation: "Invalid Format: Missing 'Action:' after 'Thought:'".to_string(),
        }
    }

    #[test]
    fn test_recovery_parse_error_retries() {
        let engine = RecoveryEngine::new(true);
        match engine.handle(&parse_err()) {
            RecoveryAction::RetryWithObservation(msg) => assert!(msg.contains("Invalid Format")),
            other => panic!("Expected RetryWithObservation, got {:?}", other),
        }
    }

    #[test]
    fn test_recovery_parse_error_without_policy_aborts() {
        let engine = RecoveryEngine::new(false);
        assert_eq!(engine.handle(&parse_err()), RecoveryAction::Abort);
    }

    #[test]
    fn test_recovery_llm_error_aborts() {
        let engine = RecoveryEngine::default();
        let err = AgentError::LlmError("401 Unauthorized".to_string());
        assert_eq!(engine.handle(&err), RecoveryAction::Abort);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_recovery_tool_timeout_aborts() {
        let engine = RecoveryEngine::default();
        let err = AgentError::ToolTimeout("Wikipedia".to_string());
        assert_eq!(engine.handle(&err), RecoveryAction::Abort);
    }
}
