// src/services/facts.rs

use std::time::Duration;

use crate::services::generator::TextGenerator;

/// Served whenever the generator cannot produce a fact.
pub const FALLBACK_FACT: &str =
    "Did you know? Honey never spoils: edible honey has been found in ancient Egyptian tombs.";

/// One short fun fact about `topic` for the dashboards.
///
/// Decoration only, so failures fall back to `FALLBACK_FACT` instead of erroring.
pub async fn fact_about(generator: &dyn TextGenerator, timeout: Duration, topic: &str) -> String {
    let prompt = format!(
        "Tell me one surprising, true fun fact about {topic} in a single sentence of at most 30 words. Reply with the sentence only."
    );

    match tokio::time::timeout(timeout, generator.generate(&prompt)).await {
        Ok(Ok(text)) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(Ok(_)) => {
            tracing::warn!("Fact generation returned empty text, using fallback");
            FALLBACK_FACT.to_string()
        }
        Ok(Err(e)) => {
            tracing::warn!("Fact generation failed, using fallback: {}", e);
            FALLBACK_FACT.to_string()
        }
        Err(_) => {
            tracing::warn!("Fact generation timed out, using fallback");
            FALLBACK_FACT.to_string()
        }
    }
}
