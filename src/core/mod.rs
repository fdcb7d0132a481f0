//! 核心层：错误类型、解析错误恢复、单次交互状态机

pub mod error;
pub mod recovery;
pub mod state;

pub use error::{AgentError, RecoveryAction};
pub use recovery::RecoveryEngine;
pub use state::{PassInput, PassPhase};
