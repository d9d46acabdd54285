//! Turns a list of identifiers into one HTML string of cards and notices.

use tracing::{debug, info, warn};

use crate::api::CatalogClient;
use crate::error::FetchError;
use crate::models::{CardRequest, Identifier, PluginRecord};
use crate::render::CardRenderer;
use crate::sanitize::esc_html;

/// Card embedding surface. Build one at startup and share it.
pub struct PluginCards {
    client: CatalogClient,
    renderer: CardRenderer,
}

impl PluginCards {
    pub fn new(client: CatalogClient, renderer: CardRenderer) -> Self {
        Self { client, renderer }
    }

    pub async fn render_request(&self, request: &CardRequest) -> String {
        self.render_many(&request.identifiers()).await
    }

    /// Renders every identifier in order. Failures become inline notices;
    /// this never fails as a whole.
    pub async fn render_many(&self, identifiers: &[Identifier]) -> String {
        let mut out = String::new();
        for identifier in identifiers {
            if identifier.is_blank() {
                debug!("skipping blank identifier");
                continue;
            }
            match identifier {
                Identifier::Author(author) => match self.client.fetch_by_author(author).await {
                    Ok(records) => {
                        info!(author = %author, count = records.len(), "rendering author cards");
                        for record in &records {
                            out.push_str(&self.card_or_notice(record));
                        }
                    }
                    Err(e) => {
                        warn!(author = %author, error = %e, "author lookup failed");
                        out.push_str(&fetch_notice(&format!("plugins by {}", author), &e));
                    }
                },
                Identifier::Slug(slug) => match self.client.fetch_by_slug(slug).await {
                    Ok(record) => out.push_str(&self.card_or_notice(&record)),
                    Err(e) => {
                        warn!(slug = %slug, error = %e, "plugin lookup failed");
                        out.push_str(&fetch_notice(slug, &e));
                    }
                },
            }
        }
        out
    }

    fn card_or_notice(&self, record: &PluginRecord) -> String {
        match self.renderer.render_card(record) {
            Ok(card) => card,
            Err(e) => {
                warn!(slug = %record.slug, error = %e, "skipping invalid plugin record");
                notice(&format!(
                    "Unable to display plugin &quot;{}&quot;: {}",
                    esc_html(&record.slug),
                    esc_html(&e.to_string())
                ))
            }
        }
    }
}

fn fetch_notice(subject: &str, err: &FetchError) -> String {
    let reason = match err {
        FetchError::Transport { message, .. } => message.clone(),
        FetchError::MalformedResponse { message, .. } => message.clone(),
        FetchError::Catalog(message) => message.clone(),
    };
    notice(&format!(
        "Unable to fetch information for &quot;{}&quot;. {}",
        esc_html(subject),
        esc_html(&reason)
    ))
}

fn notice(html: &str) -> String {
    format!(r#"<p class="plugin-card-error">{}</p>"#, html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::config::{CatalogConfig, RenderConfig};
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cards(server: &MockServer) -> PluginCards {
        let config = CatalogConfig {
            plain_url: server.uri(),
            use_tls: false,
            ..CatalogConfig::default()
        };
        let client = CatalogClient::new(config, Arc::new(MemoryCache::new())).unwrap();
        PluginCards::new(client, CardRenderer::new(RenderConfig::default()))
    }

    fn plugin_json(slug: &str) -> serde_json::Value {
        json!({
            "slug": slug,
            "name": format!("{} plugin", slug),
            "icons": {"default": "https://s.w.org/plugins/geopattern-icon/x.svg"}
        })
    }

    #[tokio::test]
    async fn malformed_reply_becomes_notice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not serialized data"))
            .mount(&server)
            .await;

        let html = cards(&server)
            .render_many(&[Identifier::Slug("example-plugin".into())])
            .await;
        assert!(html.contains("plugin-card-error"));
        assert!(html.contains("&quot;example-plugin&quot;"));
        assert!(!html.contains("plugin-card-example-plugin"));
    }

    #[tokio::test]
    async fn keeps_input_order_and_continues_after_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("request%5Bslug%5D=first"))
            .respond_with(ResponseTemplate::new(200).set_body_json(plugin_json("first")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("request%5Bslug%5D=broken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "Plugin not found."})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("request%5Bslug%5D=last"))
            .respond_with(ResponseTemplate::new(200).set_body_json(plugin_json("last")))
            .mount(&server)
            .await;

        let ids: Vec<Identifier> = ["first", "broken", "last"]
            .iter()
            .map(|s| Identifier::Slug(s.to_string()))
            .collect();
        let html = cards(&server).render_many(&ids).await;

        let first = html.find("plugin-card-first").unwrap();
        let broken = html.find("&quot;broken&quot;").unwrap();
        let last = html.find("plugin-card-last").unwrap();
        assert!(first < broken && broken < last);
        assert!(html.contains("Plugin not found."));
    }

    #[tokio::test]
    async fn author_group_precedes_slugs() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("action=query_plugins"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "plugins": [plugin_json("one"), plugin_json("two"), {"slug": "iconless", "icons": []}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("action=plugin_information"))
            .respond_with(ResponseTemplate::new(200).set_body_json(plugin_json("solo")))
            .expect(1)
            .mount(&server)
            .await;

        let request = CardRequest::new(Some("someone"), "solo");
        let html = cards(&server).render_request(&request).await;

        let one = html.find("plugin-card-one").unwrap();
        let two = html.find("plugin-card-two").unwrap();
        let iconless = html.find("&quot;iconless&quot;").unwrap();
        let solo = html.find("plugin-card-solo").unwrap();
        assert!(one < two && two < iconless && iconless < solo);
    }

    #[tokio::test]
    async fn author_failure_names_the_author() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("42"))
            .mount(&server)
            .await;

        let html = cards(&server)
            .render_many(&[Identifier::Author("ghost".into())])
            .await;
        assert!(html.contains("&quot;plugins by ghost&quot;"));
    }

    #[tokio::test]
    async fn blank_identifiers_never_reach_the_catalog() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(plugin_json("unused")))
            .expect(0)
            .mount(&server)
            .await;

        let html = cards(&server)
            .render_many(&[Identifier::Slug("".into()), Identifier::Author("  ".into())])
            .await;
        assert!(html.is_empty());
    }
}
