//! Planner：拼 ReAct prompt、调用 LLM、解析输出
//!
//! 输出格式为经典的零样本 ReAct 文本：`Thought / Action / Action Input` 或 `Final Answer`。
//! parse_llm_output 把文本分成三类：Finish（最终答案）、Action（调用工具）、
//! 以及 AgentError::OutputParse（可恢复的格式错误，带回灌给 LLM 的 observation）。

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::chains::PromptTemplate;
use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::{Message, WorkingMemory};

pub const FINAL_ANSWER: &str = "Final Answer:";

pub const MISSING_ACTION: &str = "Invalid Format: Missing 'Action:' after 'Thought:'";
pub const MISSING_ACTION_INPUT: &str = "Invalid Format: Missing 'Action Input:' after 'Action:'";
pub const INVALID_RESPONSE: &str = "Invalid or incomplete response";

const REACT_PROMPT: &str = "\
Answer the following questions as best you can. You have access to the following tools:

{tools}

Use the following format:

Question: the input question you must answer
Thought: you should always think about what to do
Action: the action to take, should be one of [{tool_names}]
Action Input: the input to the action
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat N times)
Thought: I now know the final answer
Final Answer: the final answer to the original input question

Begin!

{history}Question: {input}
Thought:{agent_scratchpad}";

fn action_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)")
            .expect("valid action regex")
    })
}

fn action_only_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)").expect("valid action regex"))
}

fn action_input_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)")
            .expect("valid action input regex")
    })
}

/// LLM 选择的一次工具调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentAction {
    pub tool: String,
    pub tool_input: String,
    /// LLM 输出原文（写回 scratchpad）
    pub log: String,
}

/// Planner 输出
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannerOutput {
    /// 最终答案
    Finish(String),
    /// 需要执行工具
    Action(AgentAction),
}

fn parse_error(output: &str, observation: &str) -> AgentError {
    AgentError::OutputParse {
        output: output.to_string(),
        observation: observation.to_string(),
    }
}

/// 解析 LLM 输出
///
/// 模型可能自己续写 `Observation:`，只取其之前的部分；同时含 Action 与 Final Answer 视为格式错误。
pub fn parse_llm_output(output: &str) -> Result<PlannerOutput, AgentError> {
    let text = match output.find("\nObservation:") {
        Some(idx) => &output[..idx],
        None => output,
    };
    let includes_answer = text.contains(FINAL_ANSWER);

    if let Some(cap) = action_regex().captures(text) {
        if includes_answer {
            return Err(parse_error(output, INVALID_RESPONSE));
        }
        let tool = cap[1].trim().to_string();
        let tool_input = cap[2].trim().trim_matches('"').to_string();
        return Ok(PlannerOutput::Action(AgentAction {
            tool,
            tool_input,
            log: text.to_string(),
        }));
    }

    if includes_answer {
        let answer = text.rsplit(FINAL_ANSWER).next().unwrap_or_default().trim();
        return Ok(PlannerOutput::Finish(answer.to_string()));
    }

    if !action_only_regex().is_match(text) {
        Err(parse_error(output, MISSING_ACTION))
    } else if !action_input_regex().is_match(text) {
        Err(parse_error(output, MISSING_ACTION_INPUT))
    } else {
        Err(parse_error(output, INVALID_RESPONSE))
    }
}

/// 把问题之前的对话渲染为纯文本段落；无历史时为空串
pub fn render_history(prior: &[Message]) -> String {
    if prior.is_empty() {
        return String::new();
    }
    let mut out = String::from("Previous conversation:\n");
    for m in prior {
        out.push_str(m.role.as_str());
        out.push_str(": ");
        out.push_str(m.content.trim());
        out.push('\n');
    }
    out.push('\n');
    out
}

/// Planner：持有 LLM、ReAct 模板与工具描述
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    template: PromptTemplate,
    tools_section: String,
    tool_names: String,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, tool_descriptions: &[(String, String)]) -> Self {
        let tools_section = tool_descriptions
            .iter()
            .map(|(n, d)| format!("{}: {}", n, d))
            .collect::<Vec<_>>()
            .join("\n");
        let tool_names = tool_descriptions
            .iter()
            .map(|(n, _)| n.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            llm,
            template: PromptTemplate::new(REACT_PROMPT),
            tools_section,
            tool_names,
        }
    }

    pub fn tool_names(&self) -> &str {
        &self.tool_names
    }

    /// 获取 LLM 累计 token 使用统计
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    pub fn build_prompt(
        &self,
        question: &str,
        prior: &[Message],
        scratchpad: &WorkingMemory,
    ) -> Result<String, AgentError> {
        let history = render_history(prior);
        let scratch = scratchpad.render_scratchpad();
        let mut values: HashMap<&str, &str> = HashMap::new();
        values.insert("tools", &self.tools_section);
        values.insert("tool_names", &self.tool_names);
        values.insert("history", &history);
        values.insert("input", question);
        values.insert("agent_scratchpad", &scratch);
        self.template.format(&values).map_err(AgentError::ConfigError)
    }

    pub async fn plan(
        &self,
        question: &str,
        prior: &[Message],
        scratchpad: &WorkingMemory,
    ) -> Result<String, AgentError> {
        let prompt = self.build_prompt(question, prior, scratchpad)?;
        self.llm
            .complete(&[Message::user(prompt)])
            .await
            .map_err(AgentError::LlmError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    fn observation_of(err: AgentError) -> String {
        match err {
            AgentError::OutputParse { observation, .. } => observation,
            other => panic!("expected OutputParse, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_action() {
        let out = "I need to compute.\nAction: Calculator\nAction Input: \"35 - 12 + 18\"";
        match parse_llm_output(out).unwrap() {
            PlannerOutput::Action(a) => {
                assert_eq!(a.tool, "Calculator");
                assert_eq!(a.tool_input, "35 - 12 + 18");
                assert_eq!(a.log, out);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_final_answer() {
        let out = "I now know the final answer\nFinal Answer: Riya has 41 apples.";
        assert_eq!(
            parse_llm_output(out).unwrap(),
            PlannerOutput::Finish("Riya has 41 apples.".to_string())
        );
    }

    #[test]
    fn test_hallucinated_observation_is_cut() {
        let out = "Action: Wikipedia\nAction Input: penicillin\nObservation: made up\nThought: done\nFinal Answer: Fleming";
        match parse_llm_output(out).unwrap() {
            PlannerOutput::Action(a) => {
                assert_eq!(a.tool, "Wikipedia");
                assert_eq!(a.tool_input, "penicillin");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(observation_of(parse_llm_output("just chatting").unwrap_err()), MISSING_ACTION);
        assert_eq!(
            observation_of(parse_llm_output("Thought: hmm\nAction: Calculator").unwrap_err()),
            MISSING_ACTION_INPUT
        );
        assert_eq!(
            observation_of(
                parse_llm_output("Action: Calculator\nAction Input: 1+1\nFinal Answer: 2")
                    .unwrap_err()
            ),
            INVALID_RESPONSE
        );
    }

    #[test]
    fn test_render_history() {
        assert_eq!(render_history(&[]), "");
        let h = render_history(&[Message::assistant("Hi"), Message::user("q"), Message::assistant("a")]);
        assert_eq!(h, "Previous conversation:\nassistant: Hi\nuser: q\nassistant: a\n\n");
    }

    #[test]
    fn test_build_prompt_lists_tools_in_order() {
        let planner = Planner::new(
            Arc::new(MockLlmClient::default()),
            &[
                ("Wikipedia".to_string(), "wiki desc".to_string()),
                ("Calculator".to_string(), "calc desc".to_string()),
            ],
        );
        let mut scratch = WorkingMemory::new();
        scratch.add_step("Action: Calculator\nAction Input: 1+1", "Answer: 2");
        let prompt = planner
            .build_prompt("What is 1+1?", &[], &scratch)
            .unwrap();
        assert!(prompt.contains("Wikipedia: wiki desc\nCalculator: calc desc"));
        assert!(prompt.contains("should be one of [Wikipedia, Calculator]"));
        assert!(prompt.contains("Begin!\n\nQuestion: What is 1+1?\nThought:Action: Calculator"));
        assert!(prompt.ends_with("Observation: Answer: 2\nThought: "));
    }
}
