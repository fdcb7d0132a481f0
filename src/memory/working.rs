//! 中期记忆：单次编排运行内的中间步骤（scratchpad）
//!
//! 每一步记录 LLM 的原始输出（Thought/Action/Action Input）与随后的 Observation，
//! 下一轮规划时按 ReAct 格式拼回 prompt；运行结束即丢弃。

/// 单个中间步骤：LLM 输出原文 + 工具观察结果
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntermediateStep {
    pub log: String,
    pub observation: String,
}

#[derive(Clone, Debug, Default)]
pub struct WorkingMemory {
    steps: Vec<IntermediateStep>,
}

impl WorkingMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_step(&mut self, log: impl Into<String>, observation: impl Into<String>) {
        self.steps.push(IntermediateStep {
            log: log.into(),
            observation: observation.into(),
        });
    }

    pub fn steps(&self) -> &[IntermediateStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// 拼接 scratchpad：`{log}\nObservation: {obs}\nThought: ` 逐步追加
    pub fn render_scratchpad(&self) -> String {
        let mut out = String::new();
        for step in &self.steps {
            out.push_str(step.log.trim_end());
            out.push_str("\nObservation: ");
            out.push_str(step.observation.trim());
            out.push_str("\nThought: ");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_scratchpad() {
        assert_eq!(WorkingMemory::new().render_scratchpad(), "");
    }

    #[test]
    fn test_scratchpad_format() {
        let mut wm = WorkingMemory::new();
        wm.add_step("I should calculate.\nAction: Calculator\nAction Input: 35 - 12 + 18\n", "Answer: 41");
        assert_eq!(
            wm.render_scratchpad(),
            "I should calculate.\nAction: Calculator\nAction Input: 35 - 12 + 18\nObservation: Answer: 41\nThought: "
        );
    }
}
