//! Prompts for the verdict, escalation, context and repository-level calls

use super::types::ProjectMetadata;
use crate::practice::Practice;
use std::fmt::Write;
use std::sync::Arc;

/// System prompt for batch evaluation of one code window
pub const BATCH_SYSTEM_PROMPT: &str = r#"You are a meticulous code reviewer. You check source code against a list of best practices.

For every practice id you receive, answer with a list of findings. Each finding is a JSON array:
  ["Violated", "<offending code>", "<how to fix it>"]
  ["Not Violated"]
  ["Not Relevant"]
  ["Unknown"]

Rules:
1. Report every distinct violation as its own finding, quoting the offending code exactly
2. Use "Not Relevant" when the code has nothing the practice talks about
3. Use "Unknown" only when you cannot decide without more information
4. Only use the practice ids you were given

Respond with a single JSON object mapping practice id to its list of findings and nothing else."#;

/// System prompt for single-practice re-evaluation with supplementary context
pub const WINDOW_SYSTEM_PROMPT: &str = r#"You are a meticulous code reviewer. You check a fragment of source code against ONE best practice, using the supplied documentation as ground truth.

Respond with a JSON array of findings, each of the form:
  ["Violated", "<offending code>", "<how to fix it>"]
  ["Not Violated"]
  ["Not Relevant"]

Respond with an empty array [] if you still cannot decide. Output the JSON array and nothing else."#;

/// System prompt for turning retrieved passages into a focused context
pub const CONTEXT_SYSTEM_PROMPT: &str = r#"You summarize documentation for a code reviewer. Using ONLY the passages provided, explain what the best practice requires and what compliant and non-compliant code looks like.

If the passages are unrelated to the practice, respond with the single word: Error"#;

/// System prompt for repository-level checks
pub const REPO_SYSTEM_PROMPT: &str = r#"You are a meticulous reviewer of repository layout and project hygiene. You judge best practices that concern the repository as a whole from its file structure.

For every practice id you receive, answer with a list of findings. Each finding is a JSON array:
  ["Violated", "<how to fix it>"]
  ["Not Violated"]
  ["Not Relevant"]

Respond with a single JSON object mapping practice id to its list of findings and nothing else."#;

pub fn batch_prompt(
    file_path: &str,
    code: &str,
    batch: &[Arc<Practice>],
    metadata: &ProjectMetadata,
) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "Project: {}", metadata.name);
    let _ = writeln!(prompt, "Frameworks: {}", metadata.frameworks_label());
    let _ = writeln!(prompt, "\nBest practices:");
    for practice in batch {
        let _ = writeln!(prompt, "- {}: {}", practice.id, practice.statement);
    }
    let _ = writeln!(prompt, "\nFile: {}\n```\n{}\n```", file_path, code);
    prompt
}

pub fn window_prompt(file_path: &str, code: &str, practice: &Practice, context: &str) -> String {
    let context = if context.trim().is_empty() {
        "(no documentation available)"
    } else {
        context
    };
    format!(
        "Best practice: {}\n\nDocumentation:\n{}\n\nFile: {}\n```\n{}\n```\n",
        practice.statement, context, file_path, code
    )
}

pub fn context_prompt(practice: &Practice, passages: &[&str]) -> String {
    let mut prompt = format!("Best practice: {}\n\nPassages:\n", practice.statement);
    for (idx, passage) in passages.iter().enumerate() {
        let _ = writeln!(prompt, "[{}] {}\n", idx + 1, passage);
    }
    prompt
}

pub fn repo_prompt(structure: &str, practices: &[Arc<Practice>], metadata: &ProjectMetadata) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "Project: {}", metadata.name);
    let _ = writeln!(prompt, "Frameworks: {}", metadata.frameworks_label());
    let _ = writeln!(prompt, "\nBest practices:");
    for practice in practices {
        let _ = writeln!(prompt, "- {}: {}", practice.id, practice.statement);
    }
    let _ = writeln!(prompt, "\nRepository structure:\n{}", structure);
    prompt
}
