//! Enrichment providers: find a missing website and social handle by name.

use reqwest::Client;
use tracing::{debug, info, instrument, warn};

use brandscout_search::{
    CandidateGatherer, DuckDuckGoBackend, SearchBackend, SerpApiBackend, select_heuristic,
};
use brandscout_shared::{BrandScoutError, EnrichConfig, EnrichmentOutcome, ProviderKind, Result};

use crate::llm::ChatClient;

/// One provider, chosen at construction time from [`ProviderKind`].
pub enum Enricher {
    /// Keyless web search with the official-match filter.
    Heuristic(CandidateGatherer),
    /// Authenticated search API, same selection as [`Enricher::Heuristic`].
    SearchApi(CandidateGatherer),
    /// Single-shot language-model guess. `None` when no key is configured.
    Llm {
        chat: Option<ChatClient>,
        locality: String,
    },
    /// Gather candidates, then let the model choose among them.
    Hybrid {
        gatherer: CandidateGatherer,
        chat: Option<ChatClient>,
        locality: String,
    },
}

impl Enricher {
    /// Build the provider for `kind`.
    ///
    /// A search-API provider without a key degrades to the keyless one. The
    /// hybrid provider gathers with the search API when a key is present.
    pub fn from_config(kind: ProviderKind, config: &EnrichConfig, client: Client) -> Self {
        let chat = config.llm_key.as_deref().map(|key| {
            ChatClient::new(
                client.clone(),
                config.llm_base_url.as_str(),
                config.llm_model.as_str(),
                key,
            )
        });

        match kind {
            ProviderKind::Ddg => Self::Heuristic(gatherer(client, duckduckgo(config), config)),
            ProviderKind::Serpapi => match serpapi(config) {
                Some(backend) => Self::SearchApi(gatherer(client, backend, config)),
                None => {
                    warn!("no SerpAPI key configured, using keyless search");
                    Self::Heuristic(gatherer(client, duckduckgo(config), config))
                }
            },
            ProviderKind::Openai => Self::Llm {
                chat,
                locality: config.locality.clone(),
            },
            ProviderKind::Hybrid => {
                let backend = serpapi(config).unwrap_or_else(|| duckduckgo(config));
                Self::Hybrid {
                    gatherer: gatherer(client, backend, config),
                    chat,
                    locality: config.locality.clone(),
                }
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Heuristic(_) => "heuristic",
            Self::SearchApi(_) => "search-api",
            Self::Llm { .. } => "llm",
            Self::Hybrid { .. } => "hybrid",
        }
    }

    /// Look up `name`. An empty outcome means nothing was found.
    #[instrument(skip_all, fields(provider = self.name(), name = %name))]
    pub async fn enrich(&self, name: &str) -> Result<EnrichmentOutcome> {
        let outcome = match self {
            Self::Heuristic(gatherer) | Self::SearchApi(gatherer) => {
                let candidates = gatherer.gather(name).await?;
                select_heuristic(name, &candidates)
            }
            Self::Llm { chat, locality } => {
                let chat = chat.as_ref().ok_or_else(|| {
                    BrandScoutError::Enrichment("no language-model key configured".into())
                })?;
                chat.guess(name, locality).await?
            }
            Self::Hybrid {
                gatherer,
                chat,
                locality,
            } => hybrid(gatherer, chat.as_ref(), name, locality).await,
        };

        info!(
            website = outcome.website.as_deref().unwrap_or(""),
            handle = outcome.handle.as_deref().unwrap_or(""),
            "enrichment finished"
        );
        Ok(outcome)
    }
}

/// Never fails: every path that cannot produce an answer ends in an empty
/// outcome.
async fn hybrid(
    gatherer: &CandidateGatherer,
    chat: Option<&ChatClient>,
    name: &str,
    locality: &str,
) -> EnrichmentOutcome {
    match gatherer.gather(name).await {
        Ok(candidates) if !candidates.is_empty() => {
            if let Some(chat) = chat {
                match chat.choose(name, locality, &candidates).await {
                    Ok(choice) if !choice.is_empty() => return choice,
                    Ok(_) => debug!("model chose nothing, using heuristic selection"),
                    Err(e) => warn!(error = %e, "model choice failed, using heuristic selection"),
                }
            }
            select_heuristic(name, &candidates)
        }
        gathered => {
            if let Err(e) = gathered {
                warn!(error = %e, "candidate gathering failed");
            }
            let Some(chat) = chat else {
                debug!("no candidates and no language model, giving up");
                return EnrichmentOutcome::default();
            };
            chat.guess(name, locality).await.unwrap_or_else(|e| {
                warn!(error = %e, "single-shot guess failed");
                EnrichmentOutcome::default()
            })
        }
    }
}

fn gatherer(
    client: Client,
    backend: Box<dyn SearchBackend>,
    config: &EnrichConfig,
) -> CandidateGatherer {
    CandidateGatherer::new(client, backend, config.locality.as_str())
}

fn duckduckgo(config: &EnrichConfig) -> Box<dyn SearchBackend> {
    Box::new(DuckDuckGoBackend::new(config.duckduckgo_base_url.as_str()))
}

fn serpapi(config: &EnrichConfig) -> Option<Box<dyn SearchBackend>> {
    config.serpapi_key.as_deref().map(|key| {
        let backend = SerpApiBackend::new(config.serpapi_base_url.as_str(), key);
        Box::new(backend) as Box<dyn SearchBackend>
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> EnrichConfig {
        EnrichConfig {
            provider: ProviderKind::Ddg,
            locality: String::new(),
            serpapi_key: None,
            llm_key: None,
            duckduckgo_base_url: server.uri(),
            serpapi_base_url: server.uri(),
            llm_base_url: server.uri(),
            llm_model: "gpt-4o-mini".into(),
        }
    }

    fn ddg_page(hrefs: &[&str]) -> String {
        hrefs
            .iter()
            .map(|h| format!(r#"<a class="result__a" href="{h}">r</a>"#))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn provider_selection() {
        let cfg = EnrichConfig {
            provider: ProviderKind::Ddg,
            locality: String::new(),
            serpapi_key: None,
            llm_key: None,
            duckduckgo_base_url: "http://127.0.0.1:9".into(),
            serpapi_base_url: "http://127.0.0.1:9".into(),
            llm_base_url: "http://127.0.0.1:9".into(),
            llm_model: "m".into(),
        };
        let client = Client::new();
        let name = |kind, cfg: &EnrichConfig| {
            Enricher::from_config(kind, cfg, client.clone()).name()
        };
        assert_eq!(name(ProviderKind::Ddg, &cfg), "heuristic");
        // No key: degrades.
        assert_eq!(name(ProviderKind::Serpapi, &cfg), "heuristic");
        let keyed = EnrichConfig {
            serpapi_key: Some("k".into()),
            ..cfg.clone()
        };
        assert_eq!(name(ProviderKind::Serpapi, &keyed), "search-api");
        assert_eq!(name(ProviderKind::Openai, &cfg), "llm");
        assert_eq!(name(ProviderKind::Hybrid, &cfg), "hybrid");
    }

    #[tokio::test]
    async fn heuristic_finds_website_and_handle() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/html/"))
            .and(query_param("q", "Ale Tales Taproom official site"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ddg_page(&[
                "https://www.yelp.com/biz/ale-tales",
                "https://aletalestaproom.com/",
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/html/"))
            .and(query_param("q", "Ale Tales Taproom instagram"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ddg_page(&[
                "https://www.instagram.com/aletales/",
            ])))
            .mount(&server)
            .await;

        let enricher = Enricher::from_config(ProviderKind::Ddg, &config(&server), Client::new());
        let outcome = enricher.enrich("Ale Tales Taproom").await.unwrap();
        assert_eq!(outcome.website.as_deref(), Some("https://aletalestaproom.com/"));
        assert_eq!(outcome.handle.as_deref(), Some("aletales"));
    }

    #[tokio::test]
    async fn llm_without_key_is_an_error() {
        let server = MockServer::start().await;
        let enricher = Enricher::from_config(ProviderKind::Openai, &config(&server), Client::new());
        let err = enricher.enrich("Finca").await.unwrap_err();
        assert!(matches!(err, BrandScoutError::Enrichment(_)));
    }

    #[tokio::test]
    async fn hybrid_without_candidates_or_key_is_empty_not_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let cfg = EnrichConfig {
            serpapi_key: Some("k".into()),
            ..config(&server)
        };
        let enricher = Enricher::from_config(ProviderKind::Hybrid, &cfg, Client::new());
        let outcome = enricher.enrich("Finca").await.unwrap();
        assert!(outcome.is_empty());
    }

    #[tokio::test]
    async fn hybrid_falls_back_to_single_shot_guess() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/html/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ddg_page(&[])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "{\"website\":\"https://finca.wine/\",\"instagram\":\"\"}"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cfg = EnrichConfig {
            llm_key: Some("sk".into()),
            ..config(&server)
        };
        let enricher = Enricher::from_config(ProviderKind::Hybrid, &cfg, Client::new());
        let outcome = enricher.enrich("Finca").await.unwrap();
        assert_eq!(outcome.website.as_deref(), Some("https://finca.wine/"));
        assert_eq!(outcome.handle, None);
    }

    #[tokio::test]
    async fn hybrid_model_choice_is_closed_set() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/html/"))
            .and(query_param("q", "Finca official site"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(ddg_page(&["https://finca.wine/"])),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/html/"))
            .and(query_param("q", "Finca instagram"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ddg_page(&[
                "https://www.instagram.com/fincawine/",
            ])))
            .mount(&server)
            .await;
        // Model invents a site that was never gathered; only the handle survives.
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "{\"website\":\"https://fincawinery.com/\",\"instagram\":\"fincawine\"}"}}]
            })))
            .mount(&server)
            .await;

        let cfg = EnrichConfig {
            llm_key: Some("sk".into()),
            ..config(&server)
        };
        let enricher = Enricher::from_config(ProviderKind::Hybrid, &cfg, Client::new());
        let outcome = enricher.enrich("Finca").await.unwrap();
        assert_eq!(outcome.website, None);
        assert_eq!(outcome.handle.as_deref(), Some("fincawine"));
    }

    #[tokio::test]
    async fn hybrid_empty_model_choice_uses_heuristic_selection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/html/"))
            .and(query_param("q", "Finca official site"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ddg_page(&[
                "https://www.yelp.com/biz/finca",
                "https://finca.wine/",
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/html/"))
            .and(query_param("q", "Finca instagram"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ddg_page(&[
                "https://www.instagram.com/fincawine/",
            ])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "{\"website\":\"\",\"instagram\":\"\"}"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cfg = EnrichConfig {
            llm_key: Some("sk".into()),
            ..config(&server)
        };
        let enricher = Enricher::from_config(ProviderKind::Hybrid, &cfg, Client::new());
        let outcome = enricher.enrich("Finca").await.unwrap();
        assert_eq!(outcome.website.as_deref(), Some("https://finca.wine/"));
        assert_eq!(outcome.handle.as_deref(), Some("fincawine"));
    }
}
