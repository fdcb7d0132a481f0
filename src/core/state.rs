//! 渲染阶段：单次交互（rendering pass）的状态机
//!
//! AwaitingCredential → Ready → AwaitingInput → Processing → Rendered；
//! Rendered 为本轮终态，下一次交互从 Ready 开始并带上累计的会话记录。

use serde::Serialize;

/// 单次交互所处阶段（供 UI 投影与测试断言）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassPhase {
    AwaitingCredential,
    Ready,
    AwaitingInput,
    Processing,
    Rendered,
}

/// 驱动阶段迁移的输入
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassInput<'a> {
    Credential(Option<&'a str>),
    /// 渲染历史
    ShowHistory,
    Submit(&'a str),
    OrchestratorReturned,
}

impl PassPhase {
    /// 迁移函数；不合法的组合保持原状态
    pub fn next(self, input: PassInput<'_>) -> PassPhase {
        match (self, input) {
            (PassPhase::AwaitingCredential, PassInput::Credential(Some(key)))
                if !key.is_empty() =>
            {
                PassPhase::Ready
            }
            (PassPhase::AwaitingCredential, _) => PassPhase::AwaitingCredential,
            (PassPhase::Ready, PassInput::ShowHistory) => PassPhase::AwaitingInput,
            (PassPhase::AwaitingInput, PassInput::Submit(q)) if !q.is_empty() => {
                PassPhase::Processing
            }
            (PassPhase::Processing, PassInput::OrchestratorReturned) => PassPhase::Rendered,
            (phase, _) => phase,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_pass() {
        let p = PassPhase::AwaitingCredential
            .next(PassInput::Credential(Some("gsk_x")))
            .next(PassInput::ShowHistory)
            .next(PassInput::Submit("1 + 1?"))
            .next(PassInput::OrchestratorReturned);
        assert_eq!(p, PassPhase::Rendered);
    }

    #[test]
    fn test_missing_or_empty_credential_halts() {
        assert_eq!(
            PassPhase::AwaitingCredential.next(PassInput::Credential(None)),
            PassPhase::AwaitingCredential
        );
        assert_eq!(
            PassPhase::AwaitingCredential.next(PassInput::Credential(Some(""))),
            PassPhase::AwaitingCredential
        );
        assert_eq!(
            PassPhase::AwaitingCredential.next(PassInput::Credential(Some("  "))),
            PassPhase::Ready
        );
        assert_eq!(
            PassPhase::AwaitingCredential.next(PassInput::ShowHistory),
            PassPhase::AwaitingCredential
        );
    }

    #[test]
    fn test_empty_submit_stays_awaiting_input() {
        assert_eq!(
            PassPhase::AwaitingInput.next(PassInput::Submit("")),
            PassPhase::AwaitingInput
        );
        assert_eq!(
            PassPhase::AwaitingInput.next(PassInput::Submit("   ")),
            PassPhase::Processing
        );
    }
}
