//! Markdown-fence stripping for model responses that wrap JSON in
//! ```json ... ``` blocks.

use once_cell::sync::Lazy;
use regex::Regex;

static FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```(?:json)?\s*\n?([\s\S]*?)\n?```\s*$").expect("valid regex"));

pub fn strip_markdown_fences(content: &str) -> String {
    let trimmed = content.trim();
    if let Some(caps) = FENCE.captures(trimmed) {
        caps.get(1).map(|m| m.as_str().trim().to_string()).unwrap_or_default()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        let input = "```json\n{\"x\": 1}\n```";
        assert_eq!(strip_markdown_fences(input), "{\"x\": 1}");
    }

    #[test]
    fn strips_bare_fence() {
        let input = "```\n{\"x\": 1}\n```";
        assert_eq!(strip_markdown_fences(input), "{\"x\": 1}");
    }

    #[test]
    fn passes_through_unfenced_content() {
        assert_eq!(strip_markdown_fences("{\"x\": 1}"), "{\"x\": 1}");
    }
}
