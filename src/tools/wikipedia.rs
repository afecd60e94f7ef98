use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};

use super::{ToolDefinition, ToolLimits, collapse_whitespace, truncate_chars};

const WIKIPEDIA_API_URL: &str = "https://en.wikipedia.org/w/api.php";

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct WikipediaInput {
    #[schemars(description = "Topic to look up on Wikipedia.")]
    query: String,
}

async fn wikipedia_impl(
    input: serde_json::Value,
    limits: ToolLimits,
) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let input: WikipediaInput = serde_json::from_value(input)?;
    let limit = limits.max_results.to_string();

    let client = reqwest::Client::builder()
        .user_agent(super::USER_AGENT)
        .build()?;
    let response = client
        .get(WIKIPEDIA_API_URL)
        .query(&[
            ("format", "json"),
            ("action", "query"),
            ("generator", "search"),
            ("gsrsearch", input.query.as_str()),
            ("gsrlimit", limit.as_str()),
            ("prop", "extracts"),
            ("exintro", "1"),
            ("explaintext", "1"),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(format!("Wikipedia API returned {}", response.status()).into());
    }

    let body: serde_json::Value = response.json().await?;
    let pages = extract_pages(&body, limits.max_results);

    if pages.is_empty() {
        Ok(format!("No Wikipedia results found for: {}", input.query))
    } else {
        Ok(truncate_chars(
            &pages.join("\n\n"),
            limits.max_content_chars,
        ))
    }
}

fn extract_pages(body: &serde_json::Value, max: usize) -> Vec<String> {
    let Some(pages) = body["query"]["pages"].as_object() else {
        return Vec::new();
    };

    // The pages map is keyed by page id; "index" carries the search rank.
    let mut ranked: Vec<(i64, String)> = pages
        .values()
        .map(|page| {
            let rank = page["index"].as_i64().unwrap_or(i64::MAX);
            let title = page["title"].as_str().unwrap_or("Unknown");
            let extract = page["extract"].as_str().unwrap_or_default();
            (
                rank,
                format!("Page: {}\nSummary: {}", title, collapse_whitespace(extract)),
            )
        })
        .collect();

    ranked.sort_by_key(|(rank, _)| *rank);
    ranked.into_iter().take(max).map(|(_, page)| page).collect()
}

pub(crate) fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "wikipedia",
        description: "Look up a topic on Wikipedia. Returns the top matching page title and the introduction of its article. Use this for people, places, events, and general knowledge.",
        input_schema: serde_json::to_value(schema_for!(WikipediaInput)).unwrap(),
        limits: ToolLimits::bounded(),
        handler: |input, limits| Box::pin(wikipedia_impl(input, limits)),
    }
}
