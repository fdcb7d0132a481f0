//! 编排层：Planner（ReAct prompt 与解析）、事件、ReAct 主循环

pub mod events;
pub mod loop_;
pub mod planner;

pub use events::ReactEvent;
pub use loop_::{AgentLimits, ReactAgent, ReactResult, STOPPED_MESSAGE};
pub use planner::{parse_llm_output, AgentAction, Planner, PlannerOutput};
