//! System/user prompt construction for the combined analysis+context LM call.

use std::collections::HashMap;

const MAX_PREVIEW_FILES: usize = 10;
const MAX_PREVIEW_CHARS: usize = 1000;

/// Exact JSON schema the LM is asked to fill in: `{analysis: {...}, context: {...}}`.
pub fn system_prompt() -> String {
    r#"You are a project analysis engine. Given a project's file list and a
preview of file contents, respond with EXACTLY one JSON object (no prose,
no markdown fences) with this shape:

{
  "analysis": {
    "language": string,
    "framework": string | null,
    "docker_image": string,       // concrete, tag-qualified image, e.g. "python:3.12-slim"
    "install_commands": [string], // run in order in working_dir
    "commands": [string],         // generic validation commands, run in order
    "test_commands": [string],
    "working_dir": string,
    "project_type": string | null,
    "dependencies": [string],
    "reasoning": string
  },
  "context": {
    "project_name": string,
    "language": string,
    "description": string,        // at most 100 characters
    "dependencies": [string],
    "structure": {
      "directories": [string],
      "file_types": { [ext: string]: number }
    }
  }
}"#
    .to_string()
}

/// Build the user prompt: the full file list plus truncated contents for
/// at most the first [`MAX_PREVIEW_FILES`] files, each capped at
/// [`MAX_PREVIEW_CHARS`] characters.
pub fn user_prompt(files: &HashMap<String, String>) -> String {
    let mut paths: Vec<&String> = files.keys().collect();
    paths.sort();

    let mut out = String::new();
    out.push_str("Project files:\n");
    for path in &paths {
        out.push_str("- ");
        out.push_str(path);
        out.push('\n');
    }

    out.push_str("\nFile previews (truncated):\n");
    for path in paths.into_iter().take(MAX_PREVIEW_FILES) {
        let content = &files[path];
        let preview: String = content.chars().take(MAX_PREVIEW_CHARS).collect();
        out.push_str(&format!("\n--- {path} ---\n{preview}\n"));
    }

    out
}
