use std::future::Future;
use std::pin::Pin;

mod arxiv;
mod search;
mod wikipedia;

/// Result and content caps shared by every tool. Small on purpose so tool
/// output stays a fraction of the model's context.
pub(crate) const TOP_K_RESULTS: usize = 1;
pub(crate) const DOC_CONTENT_CHARS_MAX: usize = 200;

pub(crate) const USER_AGENT: &str = "Mozilla/5.0 (compatible; scout/0.1)";

#[derive(Debug, Clone, Copy)]
pub(crate) struct ToolLimits {
    pub(crate) max_results: usize,
    pub(crate) max_content_chars: usize,
}

impl ToolLimits {
    pub(crate) fn bounded() -> Self {
        Self {
            max_results: TOP_K_RESULTS,
            max_content_chars: DOC_CONTENT_CHARS_MAX,
        }
    }
}

pub(crate) type ToolHandler = fn(
    serde_json::Value,
    ToolLimits,
) -> Pin<
    Box<dyn Future<Output = Result<String, Box<dyn std::error::Error + Send + Sync>>> + Send>,
>;

pub(crate) struct ToolDefinition {
    pub(crate) name: &'static str,
    pub(crate) description: &'static str,
    pub(crate) input_schema: serde_json::Value,
    pub(crate) limits: ToolLimits,
    pub(crate) handler: ToolHandler,
}

pub(crate) fn get_all_tools() -> Vec<ToolDefinition> {
    vec![
        search::definition(),
        arxiv::definition(),
        wikipedia::definition(),
    ]
}

pub(crate) fn truncate_chars(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        value.to_string()
    } else {
        value.chars().take(max).collect()
    }
}

pub(crate) fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn decode_entities(value: &str) -> String {
    value
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_holds_three_bounded_tools() {
        let tools = get_all_tools();
        assert_eq!(tools.len(), 3);

        let names: Vec<&str> = tools.iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["search", "arxiv", "wikipedia"]);

        for tool in &tools {
            assert_eq!(tool.limits.max_results, 1);
            assert_eq!(tool.limits.max_content_chars, 200);
            assert!(tool.input_schema.is_object());
            assert!(!tool.description.is_empty());
        }
    }

    #[test]
    fn registry_caps_are_stable_across_constructions() {
        for _ in 0..3 {
            let tools = get_all_tools();
            assert_eq!(tools.len(), 3);
            assert!(tools.iter().all(|t| t.limits.max_results == 1));
        }
    }

    #[test]
    fn truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }

    #[test]
    fn collapse_whitespace_flattens_newlines() {
        assert_eq!(collapse_whitespace("a\n  b\t c"), "a b c");
    }

    #[test]
    fn decode_entities_handles_common_escapes() {
        assert_eq!(decode_entities("a &amp; b &#39;c&#39;"), "a & b 'c'");
    }
}
