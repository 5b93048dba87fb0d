pub mod analyze;
pub mod context;
pub mod importance;
pub mod repair;
pub mod schema;
pub mod tokens;

pub use analyze::{analyze_project, DEFAULT_TOKENS_LIMIT};
pub use context::{add_file_context, mark_needs_update, regenerate_file_context};
pub use importance::{build_marker_dirs, classify, sort_by_importance, ImportanceTier};
pub use repair::{repair_analysis, PartialAnalysisPatch, RepairResult};
pub use schema::{system_prompt, user_prompt};
pub use tokens::{
    budget_after_overhead, estimate_tokens, exceeds_inline_cap, metadata_overhead_tokens,
    per_file_budget,
};
