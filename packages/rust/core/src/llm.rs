//! Language-model client and answer decoding.
//!
//! Talks to any OpenAI-compatible Chat Completions endpoint. Model answers
//! are decoded in two stages: a strict JSON decode, then a salvage pass that
//! scans the raw text for URLs when the model did not return clean JSON.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use brandscout_search::{looks_official, trim_url};
use brandscout_shared::{
    BrandScoutError, CandidateSet, EnrichmentOutcome, Result, normalize_handle,
};

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

const SINGLE_SHOT_SYSTEM: &str = "Return only a JSON object with string fields \"website\" and \"instagram\" \
describing the official online presence of the business. \"website\" must be the business's own domain, \
never a social network, review site, directory, map, delivery or reservation platform. \
\"instagram\" must be the business's profile URL or handle, never a post, reel, or story. \
If unsure about a field, leave it as an empty string.";

const CHOOSE_SYSTEM: &str = "You pick the official website and Instagram profile of a business from \
candidate lists. Only choose entries that appear verbatim in the lists. Return only a JSON object with \
string fields \"website\" and \"instagram\". Use an empty string when no candidate clearly belongs to \
the business.";

/// User message for a single-shot guess.
pub fn single_shot_prompt(name: &str, locality: &str) -> String {
    let mut prompt = format!("Business name: {}", name.trim());
    if !locality.trim().is_empty() {
        prompt.push_str(&format!("\nLocation: {}", locality.trim()));
    }
    prompt
}

/// User message asking the model to choose from gathered candidates.
pub fn choose_prompt(name: &str, locality: &str, candidates: &CandidateSet) -> String {
    let mut prompt = single_shot_prompt(name, locality);
    prompt.push_str("\n\nWebsite candidates:\n");
    push_numbered(&mut prompt, &candidates.websites);
    prompt.push_str("\nInstagram candidates:\n");
    push_numbered(&mut prompt, &candidates.socials);
    prompt
}

fn push_numbered(out: &mut String, items: &[String]) {
    if items.is_empty() {
        out.push_str("(none)\n");
    }
    for (i, item) in items.iter().enumerate() {
        out.push_str(&format!("{}. {item}\n", i + 1));
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Chat Completions client bound to one model and key.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl ChatClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    /// Send one system + user exchange and return the reply text.
    #[instrument(skip_all, fields(model = %self.model))]
    pub async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            temperature: 0.0,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| BrandScoutError::Network(format!("language model: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BrandScoutError::Enrichment(format!(
                "language model returned {status}: {}",
                body.trim()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| BrandScoutError::parse(format!("language model response: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        debug!(chars = text.len(), "model replied");
        Ok(text)
    }

    /// Single-shot guess for `name`.
    pub async fn guess(&self, name: &str, locality: &str) -> Result<EnrichmentOutcome> {
        let reply = self
            .complete(SINGLE_SHOT_SYSTEM, &single_shot_prompt(name, locality))
            .await?;
        Ok(decode_outcome(name, &reply))
    }

    /// Closed-set choice over gathered candidates.
    pub async fn choose(
        &self,
        name: &str,
        locality: &str,
        candidates: &CandidateSet,
    ) -> Result<EnrichmentOutcome> {
        let reply = self
            .complete(CHOOSE_SYSTEM, &choose_prompt(name, locality, candidates))
            .await?;
        Ok(restrict_to_candidates(name, decode_outcome(name, &reply), candidates))
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Raw fields of a model answer before filtering.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelAnswer {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub website: String,
    #[serde(default, alias = "handle", deserialize_with = "null_as_empty")]
    pub instagram: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"'<>()\[\]{}`,]+"#).expect("url regex"));

/// Strict stage: fenced or bare JSON, else the first `{…}` object in the text.
pub fn decode_strict(text: &str) -> Option<ModelAnswer> {
    let stripped = strip_code_fence(text);
    if let Ok(answer) = serde_json::from_str::<ModelAnswer>(stripped) {
        return Some(answer);
    }
    first_object(stripped)
}

/// Salvage stage: first URL passing the official filter, first URL that
/// normalizes to a profile handle.
pub fn salvage(name: &str, text: &str) -> EnrichmentOutcome {
    let mut outcome = EnrichmentOutcome::default();
    for m in URL_RE.find_iter(text) {
        let url = m.as_str().trim_end_matches(['.', ';', ':']);
        if outcome.handle.is_none() && url.to_ascii_lowercase().contains("instagram.com/") {
            let handle = normalize_handle(url);
            if !handle.is_empty() {
                outcome.handle = Some(handle);
                continue;
            }
        }
        if outcome.website.is_none() && looks_official(name, url) {
            outcome.website = Some(trim_url(url));
        }
    }
    outcome
}

/// Both stages with the same filters applied to either result.
pub fn decode_outcome(name: &str, text: &str) -> EnrichmentOutcome {
    match decode_strict(text) {
        Some(answer) => {
            let website = Some(answer.website.trim())
                .filter(|w| looks_official(name, w))
                .map(trim_url);
            let handle = Some(normalize_handle(&answer.instagram)).filter(|h| !h.is_empty());
            EnrichmentOutcome { website, handle }
        }
        None => {
            debug!("model answer was not JSON, salvaging");
            salvage(name, text)
        }
    }
}

/// Drop choices that are not in the gathered lists.
pub fn restrict_to_candidates(
    name: &str,
    outcome: EnrichmentOutcome,
    candidates: &CandidateSet,
) -> EnrichmentOutcome {
    let website = outcome.website.filter(|w| {
        looks_official(name, w) && candidates.websites.iter().any(|c| trim_url(c) == *w)
    });
    let handle = outcome.handle.filter(|h| {
        candidates
            .socials
            .iter()
            .any(|s| normalize_handle(s).eq_ignore_ascii_case(h))
    });
    EnrichmentOutcome { website, handle }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) on the opening fence line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().trim_end_matches("```").trim()
}

/// Decode the first JSON object in `text`, ignoring whatever follows it.
fn first_object(text: &str) -> Option<ModelAnswer> {
    let start = text.find('{')?;
    serde_json::Deserializer::from_str(&text[start..])
        .into_iter::<ModelAnswer>()
        .next()?
        .ok()
}
