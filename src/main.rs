use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

use plugin_cards::config::{CatalogConfig, RenderConfig};
use plugin_cards::{AppError, CardRenderer, CardRequest, CatalogClient, Config, Identifier, MemoryCache, PluginCards};

#[derive(Parser, Debug)]
#[command(name = "plugin-cards")]
#[command(about = "Render WordPress.org plugin info cards as HTML")]
struct Args {
    /// Plugin slugs, or `author:<handle>` for every plugin of an author
    identifiers: Vec<String>,

    /// Author whose plugins are rendered before any slugs
    #[arg(short = 'a', long)]
    author: Option<String>,

    /// Comma separated plugin slugs
    #[arg(short = 's', long, default_value = "")]
    slugs: String,

    /// Locale sent to the catalog
    #[arg(short = 'l', long, default_value = "en_US")]
    locale: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 15)]
    timeout: u64,

    /// Cache lifetime in seconds
    #[arg(long, default_value_t = 3600)]
    cache_ttl: u64,

    /// Plugins per page for author queries
    #[arg(long, default_value_t = 24)]
    per_page: u32,

    /// Only use the plain HTTP endpoint
    #[arg(long, default_value_t = false)]
    no_tls: bool,

    /// Secure catalog endpoint
    #[arg(long, default_value = plugin_cards::config::SECURE_API_URL)]
    api_url: String,

    /// Plain HTTP catalog endpoint, also the fallback
    #[arg(long, default_value = plugin_cards::config::PLAIN_API_URL)]
    plain_api_url: String,

    /// Host serving the public plugin pages
    #[arg(long, default_value = plugin_cards::config::CATALOG_HOST)]
    catalog_host: String,

    /// Write the HTML here instead of stdout
    #[arg(short = 'o', long)]
    output: Option<String>,
}

impl Args {
    fn config(&self) -> Config {
        Config {
            catalog: CatalogConfig {
                secure_url: self.api_url.clone(),
                plain_url: self.plain_api_url.clone(),
                use_tls: !self.no_tls,
                locale: self.locale.clone(),
                timeout: Duration::from_secs(self.timeout),
                cache_ttl: Duration::from_secs(self.cache_ttl),
                per_page: self.per_page,
                ..CatalogConfig::default()
            },
            render: RenderConfig {
                catalog_host: self.catalog_host.clone(),
            },
        }
    }

    /// Request built from `--author`/`--slugs` first, then positional identifiers.
    fn identifiers(&self) -> Vec<Identifier> {
        let request = CardRequest::new(self.author.as_deref(), &self.slugs);
        let mut identifiers = request.identifiers();
        identifiers.extend(
            self.identifiers
                .iter()
                .filter_map(|s| s.parse::<Identifier>().ok()),
        );
        identifiers
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("plugin_cards=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.config();
    let identifiers = args.identifiers();
    if identifiers.is_empty() {
        tracing::warn!("no plugin slugs or author given, nothing to render");
        return Ok(());
    }

    let client = CatalogClient::new(config.catalog, Arc::new(MemoryCache::new()))?;
    let cards = PluginCards::new(client, CardRenderer::new(config.render));
    let html = cards.render_many(&identifiers).await;

    match args.output {
        Some(path) => {
            tokio::fs::write(&path, html.as_bytes()).await?;
            tracing::info!(path = %path, "cards written");
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(html.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn author_flag_comes_before_positional_slugs() {
        let args = Args::parse_from(["plugin-cards", "--author", "me", "--slugs", "a,b", "c", "", "author:", "author:you"]);
        assert_eq!(
            args.identifiers(),
            vec![
                Identifier::Author("me".into()),
                Identifier::Slug("a".into()),
                Identifier::Slug("b".into()),
                Identifier::Slug("c".into()),
                Identifier::Author("you".into()),
            ]
        );
    }

    #[test]
    fn maps_flags_onto_config() {
        let args = Args::parse_from(["plugin-cards", "--no-tls", "--timeout", "5", "--locale", "fr_FR"]);
        let config = args.config();
        assert!(!config.catalog.use_tls);
        assert_eq!(config.catalog.timeout, Duration::from_secs(5));
        assert_eq!(config.catalog.locale, "fr_FR");
        assert_eq!(config.catalog.per_page, 24);
    }
}
