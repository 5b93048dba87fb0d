//! Categorizes a failed per-file test execution into a [`TestIssueType`]
//! from the command's combined output, without an extra LM round-trip.

use vibe_core::TestIssueType;

pub fn categorize_failure(output: &str) -> TestIssueType {
    let lower = output.to_lowercase();
    if lower.contains("syntaxerror")
        || lower.contains("syntax error")
        || lower.contains("unexpected token")
        || lower.contains("parse error")
    {
        TestIssueType::SyntaxError
    } else if lower.contains("modulenotfounderror")
        || lower.contains("no module named")
        || lower.contains("cannot find module")
        || lower.contains("cannot find package")
        || lower.contains("no such file or directory")
        || lower.contains("package not found")
    {
        TestIssueType::MissingDependency
    } else if lower.contains("nameerror")
        || lower.contains("is not defined")
        || lower.contains("undefined variable")
        || lower.contains("cannot find symbol")
        || lower.contains("undeclared")
        || lower.contains("attributeerror")
    {
        TestIssueType::InvalidReference
    } else if lower.contains("assertionerror")
        || lower.contains("assertion failed")
        || lower.contains("test failed")
        || lower.contains("failures:")
        || lower.contains("failed:")
    {
        TestIssueType::TestFailure
    } else {
        TestIssueType::ExecutionError
    }
}
