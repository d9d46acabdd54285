use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{author_key, plugin_key, CacheStore, CachedValue};
use crate::config::CatalogConfig;
use crate::error::{AppError, FetchError};
use crate::models::PluginRecord;

/// Catalog API actions this client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    PluginInformation,
    QueryPlugins,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::PluginInformation => "plugin_information",
            Action::QueryPlugins => "query_plugins",
        }
    }
}

/// Which fields the catalog should include in its reply.
///
/// Defaults are the catalog's own; a card only overrides a handful of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestFields {
    pub short_description: bool,
    pub description: bool,
    pub sections: bool,
    pub tested: bool,
    pub requires: bool,
    pub rating: bool,
    pub ratings: bool,
    pub downloaded: bool,
    pub downloadlink: bool,
    pub last_updated: bool,
    pub added: bool,
    pub tags: bool,
    pub compatibility: bool,
    pub homepage: bool,
    pub versions: bool,
    pub donate_link: bool,
    pub reviews: bool,
    pub banners: bool,
    pub icons: bool,
    pub active_installs: bool,
    pub group: bool,
    pub contributors: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshots: Option<bool>,
}

impl Default for RequestFields {
    fn default() -> Self {
        Self {
            short_description: true,
            description: false,
            sections: false,
            tested: true,
            requires: true,
            rating: true,
            ratings: true,
            downloaded: true,
            downloadlink: true,
            last_updated: true,
            added: true,
            tags: true,
            compatibility: true,
            homepage: true,
            versions: false,
            donate_link: true,
            reviews: false,
            banners: false,
            icons: false,
            active_installs: false,
            group: false,
            contributors: false,
            screenshots: None,
        }
    }
}

impl RequestFields {
    /// Fields for an author listing: icons and installs on, bulky sections off.
    pub fn for_listing() -> Self {
        Self {
            sections: false,
            icons: true,
            active_installs: true,
            versions: false,
            short_description: true,
            ..Self::default()
        }
    }

    /// Fields for a single plugin: as a listing, without screenshots.
    pub fn for_card() -> Self {
        Self {
            screenshots: Some(false),
            ..Self::for_listing()
        }
    }
}

/// Arguments serialized into the `request[...]` form fields.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    pub locale: String,
    pub fields: RequestFields,
}

impl CatalogQuery {
    /// Flattens the query into bracketed form pairs:
    /// `request[fields][icons]=1`.
    pub fn form_pairs(&self, action: Action) -> Vec<(String, String)> {
        let mut pairs = vec![("action".to_string(), action.as_str().to_string())];
        if let Ok(value) = serde_json::to_value(self) {
            flatten("request", &value, &mut pairs);
        }
        pairs
    }
}

fn flatten(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, v) in map {
                flatten(&format!("{}[{}]", prefix, key), v, out);
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                flatten(&format!("{}[{}]", prefix, i), v, out);
            }
        }
        Value::Bool(b) => out.push((prefix.to_string(), if *b { "1" } else { "0" }.to_string())),
        Value::Number(n) => out.push((prefix.to_string(), n.to_string())),
        Value::String(s) => out.push((prefix.to_string(), s.clone())),
        Value::Null => {}
    }
}

/// Decoded catalog body. Anything other than an object or array has
/// already been rejected.
enum CatalogReply {
    Object(serde_json::Map<String, Value>),
    Array(Vec<Value>),
}

fn decode_reply(body: &str) -> Result<CatalogReply, FetchError> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(CatalogReply::Object(map)),
        Ok(Value::Array(items)) => Ok(CatalogReply::Array(items)),
        _ => Err(FetchError::malformed(body)),
    }
}

fn catalog_error(map: &serde_json::Map<String, Value>) -> Option<FetchError> {
    map.get("error")
        .and_then(|e| e.as_str())
        .map(|e| FetchError::Catalog(e.to_string()))
}

/// Resolves slugs and authors to plugin records through the catalog API,
/// caching successful answers.
pub struct CatalogClient {
    http: reqwest::Client,
    config: CatalogConfig,
    cache: Arc<dyn CacheStore>,
}

impl CatalogClient {
    pub fn new(config: CatalogConfig, cache: Arc<dyn CacheStore>) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { http, config, cache })
    }

    pub async fn fetch_by_slug(&self, slug: &str) -> Result<PluginRecord, FetchError> {
        let key = plugin_key(slug);
        if let Some(CachedValue::Plugin(record)) = self.cache.get(&key) {
            debug!(slug = %slug, "plugin cache hit");
            return Ok(record);
        }
        debug!(slug = %slug, "plugin cache miss");

        let query = CatalogQuery {
            slug: Some(slug.to_string()),
            author: None,
            per_page: None,
            locale: self.config.locale.clone(),
            fields: RequestFields::for_card(),
        };
        let reply = match self.request(Action::PluginInformation, &query).await? {
            CatalogReply::Object(map) => {
                if let Some(err) = catalog_error(&map) {
                    warn!(slug = %slug, error = %err, "catalog rejected plugin lookup");
                    return Err(err);
                }
                Value::Object(map)
            }
            CatalogReply::Array(items) => Value::Array(items),
        };

        // Only complete records are cached.
        let record = PluginRecord::from_catalog(&reply);
        if record.slug.trim().is_empty() {
            warn!(slug = %slug, "plugin lookup reply has no slug");
            return Err(FetchError::malformed(reply.to_string()));
        }

        self.cache.set(&key, CachedValue::Plugin(record.clone()), self.config.cache_ttl);
        Ok(record)
    }

    pub async fn fetch_by_author(&self, author: &str) -> Result<Vec<PluginRecord>, FetchError> {
        let key = author_key(author);
        if let Some(CachedValue::Plugins(records)) = self.cache.get(&key) {
            debug!(author = %author, "author cache hit");
            return Ok(records);
        }
        debug!(author = %author, "author cache miss");

        let query = CatalogQuery {
            slug: None,
            author: Some(author.to_string()),
            per_page: Some(self.config.per_page),
            locale: self.config.locale.clone(),
            fields: RequestFields::for_listing(),
        };
        let plugins = match self.request(Action::QueryPlugins, &query).await? {
            CatalogReply::Object(mut map) => {
                if let Some(err) = catalog_error(&map) {
                    warn!(author = %author, error = %err, "catalog rejected author query");
                    return Err(err);
                }
                match map.remove("plugins") {
                    Some(Value::Array(plugins)) => plugins,
                    _ => {
                        warn!(author = %author, "author query reply has no plugin list");
                        return Err(FetchError::malformed(Value::Object(map).to_string()));
                    }
                }
            }
            CatalogReply::Array(plugins) => plugins,
        };

        let records: Vec<PluginRecord> = plugins.iter().map(PluginRecord::from_catalog).collect();
        debug!(author = %author, count = records.len(), "author plugins fetched");
        self.cache.set(&key, CachedValue::Plugins(records.clone()), self.config.cache_ttl);
        Ok(records)
    }

    /// Posts the query, falling back once to the plain endpoint when the
    /// secure one fails at the transport level.
    async fn request(&self, action: Action, query: &CatalogQuery) -> Result<CatalogReply, FetchError> {
        let form = query.form_pairs(action);

        let body = if self.config.use_tls {
            match self.post(&self.config.secure_url, &form).await {
                Ok(body) => body,
                Err(e) => {
                    warn!(error = %e, url = %self.config.plain_url, "secure catalog request failed, retrying over plain HTTP");
                    self.post(&self.config.plain_url, &form)
                        .await
                        .map_err(|e| FetchError::transport(e.to_string()))?
                }
            }
        } else {
            self.post(&self.config.plain_url, &form)
                .await
                .map_err(|e| FetchError::transport(e.to_string()))?
        };

        decode_reply(&body).map_err(|e| {
            warn!(action = action.as_str(), "catalog reply is not an object or array");
            e
        })
    }

    async fn post(&self, url: &str, form: &[(String, String)]) -> Result<String, reqwest::Error> {
        debug!(url = %url, "posting catalog request");
        let response = self.http.post(url).form(form).send().await?;
        response.text().await
    }
}
