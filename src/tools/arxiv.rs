use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};

use super::{ToolDefinition, ToolLimits, collapse_whitespace, decode_entities, truncate_chars};

const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct ArxivInput {
    #[schemars(description = "Topic, title, or author to look up on arXiv.")]
    query: String,
}

async fn arxiv_impl(
    input: serde_json::Value,
    limits: ToolLimits,
) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let input: ArxivInput = serde_json::from_value(input)?;

    let url = format!(
        "{}?search_query=all:{}&start=0&max_results={}",
        ARXIV_API_URL,
        urlencoding::encode(&input.query),
        limits.max_results
    );

    let client = reqwest::Client::builder()
        .user_agent(super::USER_AGENT)
        .build()?;
    let response = client.get(&url).send().await?;

    if !response.status().is_success() {
        return Err(format!("arXiv API returned {}", response.status()).into());
    }

    let feed = response.text().await?;
    let papers = extract_entries(&feed, limits.max_results);

    if papers.is_empty() {
        Ok(format!("No arXiv results found for: {}", input.query))
    } else {
        Ok(truncate_chars(
            &papers.join("\n\n"),
            limits.max_content_chars,
        ))
    }
}

// The Atom feed is shallow enough that tag splitting beats a full XML parse.
fn extract_entries(feed: &str, max: usize) -> Vec<String> {
    let mut papers = Vec::new();

    for chunk in feed.split("<entry>").skip(1) {
        if papers.len() >= max {
            break;
        }
        let entry = chunk.split("</entry>").next().unwrap_or("");

        let title = tag_text(entry, "title").unwrap_or_else(|| "Untitled".to_string());
        let summary = tag_text(entry, "summary").unwrap_or_default();
        let published = tag_text(entry, "published")
            .map(|date| date.split('T').next().unwrap_or_default().to_string())
            .unwrap_or_default();

        let authors: Vec<String> = entry
            .split("<name>")
            .skip(1)
            .filter_map(|s| s.split("</name>").next())
            .map(|name| decode_entities(name.trim()))
            .collect();

        papers.push(format!(
            "Published: {}\nTitle: {}\nAuthors: {}\nSummary: {}",
            published,
            title,
            authors.join(", "),
            summary
        ));
    }

    papers
}

fn tag_text(entry: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = entry.find(&open)? + open.len();
    let end = entry[start..].find(&close)? + start;
    Some(collapse_whitespace(&decode_entities(&entry[start..end])))
}

pub(crate) fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "arxiv",
        description: "Look up academic papers on arXiv. Returns the top match with its publication date, title, authors, and abstract. Use this for questions about research papers and their authors.",
        input_schema: serde_json::to_value(schema_for!(ArxivInput)).unwrap(),
        limits: ToolLimits::bounded(),
        handler: |input, limits| Box::pin(arxiv_impl(input, limits)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>ArXiv Query: search_query=all:attention</title>
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <published>2017-06-12T17:57:34Z</published>
    <title>Attention Is All You Need</title>
    <summary>
      The dominant sequence transduction models are based on complex
      recurrent or convolutional neural networks.
    </summary>
    <author><name>Ashish Vaswani</name></author>
    <author><name>Noam Shazeer</name></author>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/0000.00000v1</id>
    <published>2020-01-01T00:00:00Z</published>
    <title>Another Paper</title>
    <summary>Unrelated.</summary>
    <author><name>Someone Else</name></author>
  </entry>
</feed>"#;

    #[test]
    fn extract_entries_formats_the_top_paper() {
        let papers = extract_entries(FEED, 1);
        assert_eq!(papers.len(), 1);

        let paper = &papers[0];
        assert!(paper.starts_with("Published: 2017-06-12"));
        assert!(paper.contains("Title: Attention Is All You Need"));
        assert!(paper.contains("Authors: Ashish Vaswani, Noam Shazeer"));
        assert!(paper.contains("Summary: The dominant sequence transduction"));
        // Feed-level <title> must not leak into entries.
        assert!(!paper.contains("ArXiv Query"));
    }

    #[test]
    fn extract_entries_respects_the_result_cap() {
        assert_eq!(extract_entries(FEED, 2).len(), 2);
        assert_eq!(extract_entries(FEED, 1).len(), 1);
    }

    #[test]
    fn tag_text_returns_none_for_missing_tags() {
        assert_eq!(tag_text("<entry></entry>", "summary"), None);
        assert_eq!(
            tag_text("<summary>a &amp; b</summary>", "summary").as_deref(),
            Some("a & b")
        );
    }

    #[test]
    fn extract_entries_handles_empty_feeds() {
        let empty = r#"<feed xmlns="http://www.w3.org/2005/Atom"></feed>"#;
        assert!(extract_entries(empty, 1).is_empty());
    }
}
