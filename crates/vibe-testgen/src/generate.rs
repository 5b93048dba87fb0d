//! The `generate_code` LM call used both for the first attempt and for
//! fix-and-retry attempts.

use std::collections::HashMap;

use serde::Deserialize;
use vibe_llm::{LmClient, LmRequest};
use vibe_protocol::strip_fence;

#[derive(Debug, Deserialize)]
pub struct GeneratedCode {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub code: HashMap<String, String>,
}

pub async fn generate(
    system_prompt: &str,
    user_prompt: &str,
    lm: &dyn LmClient,
) -> anyhow::Result<GeneratedCode> {
    let raw = lm
        .complete(LmRequest::new(system_prompt.to_string(), user_prompt.to_string()))
        .await?;
    let stripped = strip_fence(&raw);
    let parsed: GeneratedCode = serde_json::from_str(&stripped)
        .or_else(|_| serde_json::from_str(&strip_fence(&stripped)))?;
    if parsed.code.is_empty() {
        anyhow::bail!("generate_code response contained no files");
    }
    Ok(parsed)
}
