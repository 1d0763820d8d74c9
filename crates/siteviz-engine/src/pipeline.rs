use anyhow::{bail, Context, Result};
use serde_json::json;
use siteviz_contracts::events::EventWriter;
use siteviz_contracts::pipeline::{AgentRole, StagePlan, StageTask};

use crate::map_object;

/// Language-model collaborator for one stage.
pub trait AgentBackend {
    fn complete(&self, role: AgentRole, task: &str, context: &str) -> Result<String>;
}

/// Runs the stages strictly in order. Each stage sees every earlier output as
/// context; the last output is returned as the transcript.
pub fn run_stages(
    tasks: &[StageTask],
    backend: &dyn AgentBackend,
    events: &EventWriter,
) -> Result<String> {
    if tasks.is_empty() {
        bail!("stage plan is empty");
    }

    let mut context = String::new();
    let mut last_output = String::new();
    for (idx, task) in tasks.iter().enumerate() {
        events.emit(
            "stage_started",
            map_object(json!({
                "index": idx,
                "role": task.role.key(),
                "task_chars": task.text.chars().count(),
            })),
        )?;
        let output = backend
            .complete(task.role, &task.text, &context)
            .with_context(|| format!("stage {} ({}) failed", idx + 1, task.role))?;
        events.emit(
            "stage_finished",
            map_object(json!({
                "index": idx,
                "role": task.role.key(),
                "output_chars": output.chars().count(),
            })),
        )?;

        if !context.is_empty() {
            context.push_str("\n\n");
        }
        context.push_str(&output);
        last_output = output;
    }
    Ok(last_output)
}

pub fn run_plan(
    plan: &StagePlan,
    brief: &str,
    backend: &dyn AgentBackend,
    events: &EventWriter,
) -> Result<String> {
    run_stages(&plan.with_brief(brief), backend, events)
}
