use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    QuestionGeneration,
    Research,
    ConceptGeneration,
    PromptGeneration,
}

impl AgentRole {
    pub fn label(self) -> &'static str {
        match self {
            AgentRole::QuestionGeneration => "Architecture design brief questioner",
            AgentRole::Research => "Expert architecture researcher",
            AgentRole::ConceptGeneration => "Architecture concept generation agent",
            AgentRole::PromptGeneration => "Text to image prompt agent",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            AgentRole::QuestionGeneration => "question_generation",
            AgentRole::Research => "research",
            AgentRole::ConceptGeneration => "concept_generation",
            AgentRole::PromptGeneration => "prompt_generation",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub role: AgentRole,
    pub task: String,
    #[serde(default)]
    pub include_brief: bool,
}

/// A stage with its final task text, ready to hand to an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTask {
    pub role: AgentRole,
    pub text: String,
}

/// Ordered list of agent stages, run strictly in sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePlan {
    stages: Vec<Stage>,
}

impl StagePlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Question, research, concept and prompt stages in that order; the brief
    /// is attached to the question and concept stages.
    pub fn standard(
        question_task: impl Into<String>,
        research_task: impl Into<String>,
        concept_task: impl Into<String>,
        prompt_task: impl Into<String>,
    ) -> Self {
        Self::new()
            .push(AgentRole::QuestionGeneration, question_task, true)
            .push(AgentRole::Research, research_task, false)
            .push(AgentRole::ConceptGeneration, concept_task, true)
            .push(AgentRole::PromptGeneration, prompt_task, false)
    }

    pub fn push(mut self, role: AgentRole, task: impl Into<String>, include_brief: bool) -> Self {
        self.stages.push(Stage {
            role,
            task: task.into(),
            include_brief,
        });
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn with_brief(&self, brief: &str) -> Vec<StageTask> {
        let brief = brief.trim();
        self.stages
            .iter()
            .map(|stage| {
                let task = stage.task.trim_end();
                let text = if stage.include_brief && !brief.is_empty() {
                    format!("{task}\n\nThe brief:\n{brief}")
                } else {
                    task.to_string()
                };
                StageTask {
                    role: stage.role,
                    text,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{AgentRole, StagePlan};

    #[test]
    fn standard_plan_orders_roles() {
        let plan = StagePlan::standard("ask", "search", "invent", "describe");
        let roles: Vec<AgentRole> = plan.stages().iter().map(|stage| stage.role).collect();
        assert_eq!(
            roles,
            vec![
                AgentRole::QuestionGeneration,
                AgentRole::Research,
                AgentRole::ConceptGeneration,
                AgentRole::PromptGeneration,
            ]
        );
        assert_eq!(plan.len(), 4);
    }

    #[test]
    fn brief_is_appended_only_where_flagged() {
        let plan = StagePlan::standard("ask\n", "search", "invent", "describe");
        let tasks = plan.with_brief("  riverside library  ");
        assert_eq!(tasks[0].text, "ask\n\nThe brief:\nriverside library");
        assert_eq!(tasks[1].text, "search");
        assert!(tasks[2].text.ends_with("The brief:\nriverside library"));
        assert_eq!(tasks[3].text, "describe");
    }

    #[test]
    fn empty_brief_leaves_tasks_untouched() {
        let plan = StagePlan::new().push(AgentRole::Research, "search", true);
        assert_eq!(plan.with_brief("  ")[0].text, "search");
        assert!(StagePlan::new().is_empty());
    }

    #[test]
    fn role_labels() {
        assert_eq!(AgentRole::Research.key(), "research");
        assert_eq!(
            AgentRole::PromptGeneration.to_string(),
            "Text to image prompt agent"
        );
    }
}
