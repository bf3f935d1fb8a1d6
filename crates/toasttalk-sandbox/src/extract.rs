use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::language::CodeLanguage;

/// Opening fence must carry a `run_` tag; plain fences never match.
static RUN_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```run_(\w+)[ \t]*\r?\n([\s\S]*?)```").expect("run fence pattern is valid")
});

/// A fenced block the model asked to execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub language: CodeLanguage,
    pub source: String,
    /// 1-based line of the opening fence within the message.
    pub line_number: usize,
}

/// Find all `run_` fenced blocks in `text`, in order of appearance.
///
/// Blocks whose tag names an unsupported language are skipped.
pub fn extract_code_blocks(text: &str) -> Vec<CodeBlock> {
    RUN_FENCE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let tag = caps.get(1)?.as_str();
            let Some(language) = CodeLanguage::from_tag(tag) else {
                tracing::warn!(
                    category = "code_execution",
                    tag,
                    "skipping run fence with unsupported language"
                );
                return None;
            };
            let line_number = text[..whole.start()].matches('\n').count() + 1;
            Some(CodeBlock {
                language,
                source: caps.get(2)?.as_str().to_string(),
                line_number,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_fences_are_not_extracted() {
        let text = "Here is an example:\n```python\nprint(1)\n```\nand shell:\n```bash\nls\n```";
        assert!(extract_code_blocks(text).is_empty());
    }

    #[test]
    fn test_run_fences_in_order() {
        let text = "Let me check.\n```run_python\nprint(2 + 2)\n```\nthen\n```run_bash\necho hi\n```\n";
        let blocks = extract_code_blocks(text);

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].language, CodeLanguage::Python);
        assert_eq!(blocks[0].source, "print(2 + 2)\n");
        assert_eq!(blocks[0].line_number, 2);
        assert_eq!(blocks[1].language, CodeLanguage::Shell);
        assert_eq!(blocks[1].source, "echo hi\n");
        assert_eq!(blocks[1].line_number, 6);
    }

    #[test]
    fn test_mixed_plain_and_run_fences() {
        let text = "```js\nconsole.log(0)\n```\n```run_javascript\nconsole.log(1)\n```";
        let blocks = extract_code_blocks(text);

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].language, CodeLanguage::JavaScript);
        assert_eq!(blocks[0].source, "console.log(1)\n");
    }

    #[test]
    fn test_unsupported_run_tag_is_skipped() {
        let text = "```run_ruby\nputs 1\n```\n```run_sh\necho ok\n```";
        let blocks = extract_code_blocks(text);

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].language, CodeLanguage::Shell);
    }

    #[test]
    fn test_unterminated_fence_is_ignored() {
        assert!(extract_code_blocks("```run_python\nprint(1)\n").is_empty());
    }
}
