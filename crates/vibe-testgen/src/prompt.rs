//! Prompt synthesis for generated tests, including a default fallback
//! template per language when the caller does not ask for anything specific.

/// A default smoke-test prompt for languages we recognize. Used when the
/// caller's query is empty: we still generate a reasonable sanity test
/// covering the project's entry point rather than refusing outright.
fn default_prompt_for(language: &str) -> &'static str {
    match language.to_lowercase().as_str() {
        "python" => "Write a pytest test module that imports the project's entry point and asserts it runs without raising.",
        "javascript" | "typescript" => "Write a test file (using the project's existing test framework if one is configured, otherwise a plain assert-based script) that imports the entry point module and checks it loads without throwing.",
        "go" => "Write a _test.go file with a TestMain-style smoke test that exercises the package's primary exported function.",
        "rust" => "Write a #[test] function exercising the crate's public entry point for basic sanity.",
        _ => "Write a minimal smoke test that exercises the project's entry point and fails loudly if it errors.",
    }
}

pub fn generation_system_prompt() -> String {
    r#"You generate test code for a sandboxed project. Respond with EXACTLY
one JSON object:

{
  "status": "success",
  "response": string,                 // human-readable summary of what you generated
  "code": { "path/to/test_file": "file contents", ... }
}"#
        .to_string()
}

/// Builds the user prompt for a generation attempt. `query` is the caller's
/// request; when empty, falls back to a per-language default smoke test.
pub fn generation_user_prompt(language: &str, project_description: &str, query: &str) -> String {
    let request = if query.trim().is_empty() {
        default_prompt_for(language)
    } else {
        query
    };
    format!(
        "Project language: {language}\nProject description: {project_description}\n\nTest request:\n{request}"
    )
}

/// Builds the user prompt for a fix-and-retry attempt given validation
/// failure output.
pub fn fix_user_prompt(previous_code: &std::collections::HashMap<String, String>, failure_output: &str) -> String {
    let code_listing: String = previous_code
        .iter()
        .map(|(path, content)| format!("--- {path} ---\n{content}\n"))
        .collect();
    format!(
        "The following generated test code failed validation.\n\n{code_listing}\nFailure output:\n{failure_output}\n\nFix the code and respond with the same JSON schema, including every file (fixed or unchanged)."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_language_default_when_query_empty() {
        let prompt = generation_user_prompt("Python", "a cli tool", "");
        assert!(prompt.contains("pytest"));
    }

    #[test]
    fn uses_explicit_query_when_present() {
        let prompt = generation_user_prompt("Python", "a cli tool", "test the add() function");
        assert!(prompt.contains("test the add() function"));
        assert!(!prompt.contains("pytest test module"));
    }
}
