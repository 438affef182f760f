use async_trait::async_trait;
use ragloop_core::payload::PlanData;
use ragloop_core::{PlanCounts, PlanStep, RagloopError, RagloopResult, StepStatus, ToolData, ToolResult};
use ragloop_tools::catalog::TODO_WRITE;
use ragloop_tools::{Tool, ToolContext, ToolDescriptor};
use serde::Deserialize;
use std::fmt::Write;

const MISSING_TASK: &str = "No task description provided";

#[derive(Debug, Deserialize)]
struct TodoWriteInput {
    #[serde(default)]
    task: Option<String>,
    #[serde(default)]
    steps: Vec<PlanStep>,
}

/// Writes the model's retrieval plan and narrates its progress.
///
/// Each call replaces the previous plan wholesale; nothing is stored between
/// calls. The single in-progress rule is advisory: violations add a warning
/// line and are never rejected.
pub struct TodoWriteTool {
    descriptor: ToolDescriptor,
}

impl TodoWriteTool {
    /// Creates the tool.
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: TODO_WRITE.to_string(),
                description: "Create and update a structured plan of RETRIEVAL and research \
                    steps (searching knowledge bases, reading documents, comparing sources). \
                    Use it for tasks needing 3 or more distinct steps. Mark a step in_progress \
                    before working on it and keep only one step in_progress at a time; mark it \
                    completed as soon as it is done. Do not add summary or synthesis steps; \
                    synthesize with the thinking tool once every retrieval step is completed. \
                    Skip this tool for single, trivial, or purely conversational requests."
                    .to_string(),
                parameters_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "task": {
                            "type": "string",
                            "description": "The complex task or question you need to create a plan for"
                        },
                        "steps": {
                            "type": "array",
                            "description": "Research plan steps with status tracking",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "id": {
                                        "type": "string",
                                        "description": "Unique identifier for this step (e.g. 'step1')"
                                    },
                                    "description": {
                                        "type": "string",
                                        "description": "What to investigate or retrieve in this step"
                                    },
                                    "status": {
                                        "type": "string",
                                        "enum": ["pending", "in_progress", "completed", "skipped"]
                                    }
                                },
                                "required": ["id", "description", "status"]
                            }
                        }
                    },
                    "required": ["task", "steps"]
                }),
            },
        }
    }
}

impl Default for TodoWriteTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for TodoWriteTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(
        &self,
        _ctx: &ToolContext,
        arguments: serde_json::Value,
    ) -> RagloopResult<ToolResult> {
        let input: TodoWriteInput = serde_json::from_value(arguments)
            .map_err(|e| RagloopError::InvalidArguments(format!("invalid plan: {e}")))?;

        let task = input
            .task
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| MISSING_TASK.to_string());
        let counts = PlanCounts::tally(&input.steps);
        let output = render_plan(&task, &input.steps, &counts);

        Ok(ToolResult::with_data(
            output,
            ToolData::Plan(PlanData {
                task,
                remaining: counts.remaining(),
                steps: input.steps,
                counts,
                plan_created: true,
            }),
        ))
    }
}

fn render_plan(task: &str, steps: &[PlanStep], counts: &PlanCounts) -> String {
    let mut out = String::from("Plan created\n\n");
    let _ = writeln!(out, "**Task**: {task}\n");

    if steps.is_empty() {
        out.push_str("Note: the plan has no concrete steps. Break the task into 3-7 retrieval steps.\n\n");
        out.push_str("Suggested retrieval flow (retrieval only, no summaries):\n");
        out.push_str("1. knowledge_search to find content related to the key terms\n");
        out.push_str("2. query_knowledge_graph for entities and relations across knowledge bases\n");
        out.push_str("3. list_knowledge_chunks to read the key documents in full\n");
        out.push_str("\nNote: summary and synthesis belong to the thinking tool; do not add them here.\n");
        return out;
    }

    out.push_str("**Plan steps**:\n\n");
    for (i, step) in steps.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {}. {} [{}] {}",
            i + 1,
            step.status.glyph(),
            step.status.as_str(),
            step.description
        );
    }

    out.push_str("\n=== Progress ===\n");
    let _ = writeln!(out, "Total: {} steps", counts.total);
    let _ = writeln!(out, "{} Completed: {}", StepStatus::Completed.glyph(), counts.completed);
    let _ = writeln!(out, "{} In progress: {}", StepStatus::InProgress.glyph(), counts.in_progress);
    let _ = writeln!(out, "{} Pending: {}", StepStatus::Pending.glyph(), counts.pending);
    if counts.skipped > 0 {
        let _ = writeln!(out, "{} Skipped: {}", StepStatus::Skipped.glyph(), counts.skipped);
    }
    if counts.in_progress > 1 {
        let _ = writeln!(
            out,
            "⚠️ {} steps are in_progress. Keep only one step in progress at a time.",
            counts.in_progress
        );
    }

    out.push_str("\n=== ⚠️ Important ===\n");
    let remaining = counts.remaining();
    if remaining > 0 {
        let _ = writeln!(out, "**{remaining} steps still remaining!**\n");
        out.push_str("**Do not summarize or give a final answer until every step is completed.**\n\n");
        out.push_str("Next:\n");
        if counts.in_progress > 0 {
            out.push_str("- Finish the step in progress first\n");
        }
        if counts.pending > 0 {
            let _ = writeln!(out, "- Start the {} pending steps", counts.pending);
            out.push_str("- Complete them in order without skipping\n");
        }
        out.push_str("- Mark each step completed with todo_write as it finishes\n");
        out.push_str("- Write the final summary after all steps are completed\n");
    } else {
        out.push_str("✅ **All steps are completed!**\n\n");
        out.push_str("Now:\n");
        out.push_str("- Synthesize the results of every step\n");
        out.push_str("- Write the final answer\n");
        out.push_str("- Check that every aspect of the task was covered\n");
    }
    out
}
