//! Error-repair sub-protocol: given a failed validation, ask the LM for a
//! patch to the analysis (alternate install steps, extra setup, or a
//! replacement image/working dir) rather than restarting from scratch.

use serde::Deserialize;
use vibe_core::{CodeAnalysisResult, ValidationResult};
use vibe_llm::{LmClient, LmRequest};
use vibe_protocol::strip_fence;

#[derive(Debug, Deserialize)]
pub struct PartialAnalysisPatch {
    #[serde(default)]
    pub pre_install_commands: Vec<String>,
    #[serde(default)]
    pub additional_setup: Vec<String>,
    pub docker_image: Option<String>,
    pub working_dir: Option<String>,
    #[serde(default)]
    pub root_cause: String,
    #[serde(default)]
    pub suggested_fixes: Vec<String>,
    #[serde(default)]
    pub confidence: f64,
    /// Whether the caller should retry setup at all. Absent is treated as
    /// `true` since most repair patches are meant to be applied immediately.
    #[serde(default = "default_retry_recommended")]
    pub retry_recommended: bool,
    #[serde(default)]
    pub reasoning: String,
}

fn default_retry_recommended() -> bool {
    true
}

impl Default for PartialAnalysisPatch {
    fn default() -> Self {
        Self {
            pre_install_commands: Vec::new(),
            additional_setup: Vec::new(),
            docker_image: None,
            working_dir: None,
            root_cause: String::new(),
            suggested_fixes: Vec::new(),
            confidence: 0.0,
            retry_recommended: true,
            reasoning: String::new(),
        }
    }
}

#[derive(Debug)]
pub struct RepairResult {
    pub analysis: CodeAnalysisResult,
    pub patch: PartialAnalysisPatch,
}

fn system_prompt() -> String {
    r#"A setup step for a sandboxed project failed. You will be given the
current analysis and the failure output. Respond with EXACTLY one JSON
object describing a patch:

{
  "pre_install_commands": [string],  // run before the existing install_commands
  "additional_setup": [string],      // run after the existing install_commands
  "docker_image": string | null,     // replacement image, or null to keep current
  "working_dir": string | null,      // replacement working dir, or null to keep current
  "root_cause": string,
  "suggested_fixes": [string],
  "confidence": number,              // 0.0 - 1.0
  "retry_recommended": boolean,      // false means do not retry, this project cannot be fixed this way
  "reasoning": string
}"#
    .to_string()
}

fn user_prompt(analysis: &CodeAnalysisResult, failure: &ValidationResult) -> String {
    format!(
        "Current analysis:\n{}\n\nFailure output:\n{}\n\nExit code: {}",
        serde_json::to_string_pretty(analysis).unwrap_or_default(),
        failure.output,
        failure.exit_code,
    )
}

/// Ask the LM for a patch to `analysis` given a failed `failure` result, and
/// merge it: `pre_install_commands + install_commands + additional_setup`,
/// in that order, optionally replacing `docker_image`/`working_dir`.
pub async fn repair_analysis(
    analysis: &CodeAnalysisResult,
    failure: &ValidationResult,
    lm: &dyn LmClient,
) -> anyhow::Result<RepairResult> {
    let raw = lm
        .complete(LmRequest::new(
            system_prompt(),
            user_prompt(analysis, failure),
        ))
        .await?;
    let stripped = strip_fence(&raw);
    let patch: PartialAnalysisPatch = serde_json::from_str(&stripped)
        .or_else(|_| serde_json::from_str(&strip_fence(&stripped)))?;

    // A patch that recommends against retrying carries no actionable
    // install-command changes; the caller is expected to fail the session
    // rather than apply it.
    let merged = if patch.retry_recommended {
        let mut merged = analysis.clone();
        let mut install_commands = patch.pre_install_commands.clone();
        install_commands.extend(merged.install_commands.clone());
        install_commands.extend(patch.additional_setup.clone());
        merged.install_commands = install_commands;

        if let Some(image) = &patch.docker_image {
            merged.docker_image = image.clone();
        }
        if let Some(dir) = &patch.working_dir {
            merged.working_dir = dir.clone();
        }
        merged
    } else {
        analysis.clone()
    };

    Ok(RepairResult {
        analysis: merged,
        patch,
    })
}
