use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};

use super::{ToolDefinition, ToolLimits, decode_entities, truncate_chars};

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct SearchInput {
    #[schemars(description = "The search query to run against the web.")]
    query: String,
}

async fn search_impl(
    input: serde_json::Value,
    limits: ToolLimits,
) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let input: SearchInput = serde_json::from_value(input)?;

    // DuckDuckGo's HTML endpoint works without an API key.
    let url = format!(
        "https://html.duckduckgo.com/html/?q={}",
        urlencoding::encode(&input.query)
    );

    let client = reqwest::Client::builder()
        .user_agent(super::USER_AGENT)
        .build()?;
    let response = client.get(&url).send().await?;

    if !response.status().is_success() {
        return Err(format!("search backend returned {}", response.status()).into());
    }

    let html = response.text().await?;
    let results = extract_results(&html, limits.max_results);

    if results.is_empty() {
        Ok(format!("No results found for: {}", input.query))
    } else {
        Ok(truncate_chars(
            &results.join("\n\n"),
            limits.max_content_chars,
        ))
    }
}

fn extract_results(html: &str, max: usize) -> Vec<String> {
    let mut results = Vec::new();

    for chunk in html.split("class=\"result__body\"").skip(1) {
        if results.len() >= max {
            break;
        }

        let title = chunk
            .split("class=\"result__a\"")
            .nth(1)
            .and_then(|s| s.split('>').nth(1))
            .and_then(|s| s.split('<').next())
            .unwrap_or("");

        let snippet = chunk
            .split("class=\"result__snippet\"")
            .nth(1)
            .and_then(|s| s.split('>').nth(1))
            .and_then(|s| s.split('<').next())
            .unwrap_or("");

        let url = chunk
            .split("class=\"result__url\"")
            .nth(1)
            .and_then(|s| s.split('>').nth(1))
            .and_then(|s| s.split('<').next())
            .map(|s| s.trim())
            .unwrap_or("");

        if !title.is_empty() {
            results.push(format!(
                "{}\n{}\nURL: {}",
                decode_entities(title),
                decode_entities(snippet),
                url
            ));
        }
    }

    results
}

pub(crate) fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "search",
        description: "Search the web for current information. Returns the top result with title, snippet, and URL. Use this for general questions, news, and anything not covered by the other tools.",
        input_schema: serde_json::to_value(schema_for!(SearchInput)).unwrap(),
        limits: ToolLimits::bounded(),
        handler: |input, limits| Box::pin(search_impl(input, limits)),
    }
}
