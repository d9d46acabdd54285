use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::ValidationError;

/// Icon size keys in the order a card prefers them.
pub const ICON_PRIORITY: [&str; 4] = ["svg", "2x", "1x", "default"];

/// The subset of catalog fields a card needs. Everything else the catalog
/// returns is dropped before the record is cached.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginRecord {
    pub slug: String,
    pub name: String,
    pub version: String,
    pub last_updated: String,
    pub author: String,
    pub short_description: String,
    /// Percent scale, 0 to 100.
    pub rating: f64,
    pub num_ratings: u64,
    pub active_installs: u64,
    pub downloaded: u64,
    pub download_link: String,
    pub icons: BTreeMap<String, String>,
}

impl PluginRecord {
    /// Builds a record from one plugin object of a catalog reply.
    pub fn from_catalog(p: &Value) -> Self {
        let text = |key: &str| {
            p.get(key)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string()
        };

        let icons = p
            .get("icons")
            .and_then(|i| i.as_object())
            .map(|icons| {
                icons
                    .iter()
                    .filter_map(|(size, url)| url.as_str().map(|u| (size.clone(), u.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        PluginRecord {
            slug: text("slug"),
            name: text("name"),
            version: text("version"),
            last_updated: text("last_updated"),
            author: text("author"),
            short_description: text("short_description"),
            rating: p.get("rating").and_then(as_float).unwrap_or(0.0),
            num_ratings: p.get("num_ratings").and_then(as_count).unwrap_or(0),
            active_installs: p.get("active_installs").and_then(as_count).unwrap_or(0),
            downloaded: p.get("downloaded").and_then(as_count).unwrap_or(0),
            download_link: text("download_link"),
            icons,
        }
    }

    /// First icon present in [`ICON_PRIORITY`] order.
    pub fn preferred_icon(&self) -> Option<&str> {
        ICON_PRIORITY
            .iter()
            .find_map(|size| self.icons.get(*size))
            .map(String::as_str)
    }
}

fn as_float(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_decimal(s),
        _ => None,
    }
}

fn as_count(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parses a decimal that may use a comma as separator ("4,5").
pub fn parse_decimal(s: &str) -> Option<f64> {
    s.trim().replace(',', ".").parse().ok()
}

/// One entry of a card request: a single plugin, or every plugin of an author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Author(String),
    Slug(String),
}

impl Identifier {
    /// True when there is nothing to look up.
    pub fn is_blank(&self) -> bool {
        match self {
            Identifier::Author(value) | Identifier::Slug(value) => value.trim().is_empty(),
        }
    }
}

impl FromStr for Identifier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let identifier = match s.strip_prefix("author:") {
            Some(author) => Identifier::Author(author.trim().to_string()),
            None => Identifier::Slug(s.to_string()),
        };
        if identifier.is_blank() {
            return Err(ValidationError::MissingSlug);
        }
        Ok(identifier)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Author(author) => write!(f, "author:{}", author),
            Identifier::Slug(slug) => f.write_str(slug),
        }
    }
}

/// Shortcode-style request: an optional author plus a list of slugs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardRequest {
    pub author: Option<String>,
    pub slugs: Vec<String>,
}

impl CardRequest {
    /// `slugs` is comma separated; blanks are skipped.
    pub fn new(author: Option<&str>, slugs: &str) -> Self {
        let author = author
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string);
        let slugs = slugs
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        CardRequest { author, slugs }
    }

    /// Author group first, then slugs in the order given.
    pub fn identifiers(&self) -> Vec<Identifier> {
        self.author
            .iter()
            .map(|a| Identifier::Author(a.clone()))
            .chain(self.slugs.iter().map(|s| Identifier::Slug(s.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_catalog_keeps_only_card_fields() {
        let raw = json!({
            "slug": "akismet",
            "name": "Akismet Anti-spam",
            "version": "5.3",
            "author": "<a href=\"https://automattic.com\">Automattic</a>",
            "rating": 94,
            "num_ratings": 1024,
            "active_installs": 5000000,
            "downloaded": "312345678",
            "last_updated": "2024-01-15 3:02pm GMT",
            "short_description": "Spam protection.",
            "download_link": "https://downloads.wordpress.org/plugin/akismet.5.3.zip",
            "icons": {"2x": "https://ps.w.org/akismet/icon-256.png", "1x": "https://ps.w.org/akismet/icon-128.png"},
            "sections": {"description": "long text"},
            "versions": {"5.2": "x"}
        });
        let record = PluginRecord::from_catalog(&raw);
        assert_eq!(record.slug, "akismet");
        assert_eq!(record.rating, 94.0);
        assert_eq!(record.num_ratings, 1024);
        assert_eq!(record.downloaded, 312_345_678);
        assert_eq!(record.icons.len(), 2);
        assert_eq!(record.preferred_icon(), Some("https://ps.w.org/akismet/icon-256.png"));
    }

    #[test]
    fn empty_icon_array_means_no_icons() {
        let record = PluginRecord::from_catalog(&json!({"slug": "bare", "icons": []}));
        assert!(record.icons.is_empty());
        assert_eq!(record.preferred_icon(), None);
    }

    #[test]
    fn missing_fields_default() {
        let record = PluginRecord::from_catalog(&json!({"rating": "4,5", "downloaded": null}));
        assert_eq!(record.slug, "");
        assert_eq!(record.rating, 4.5);
        assert_eq!(record.downloaded, 0);
    }

    #[test]
    fn icon_priority_prefers_svg() {
        let mut record = PluginRecord::default();
        record.icons.insert("default".into(), "d.png".into());
        assert_eq!(record.preferred_icon(), Some("d.png"));
        record.icons.insert("1x".into(), "1x.png".into());
        assert_eq!(record.preferred_icon(), Some("1x.png"));
        record.icons.insert("svg".into(), "icon.svg".into());
        assert_eq!(record.preferred_icon(), Some("icon.svg"));
    }

    #[test]
    fn parses_identifiers() {
        assert_eq!("author:automattic".parse::<Identifier>(), Ok(Identifier::Author("automattic".into())));
        assert_eq!(" akismet ".parse::<Identifier>(), Ok(Identifier::Slug("akismet".into())));
        assert_eq!(Identifier::Author("me".into()).to_string(), "author:me");
    }

    #[test]
    fn blank_identifiers_are_rejected() {
        assert_eq!("author:".parse::<Identifier>(), Err(ValidationError::MissingSlug));
        assert_eq!("author:   ".parse::<Identifier>(), Err(ValidationError::MissingSlug));
        assert_eq!("".parse::<Identifier>(), Err(ValidationError::MissingSlug));
        assert!(Identifier::Slug(" ".into()).is_blank());
        assert!(!Identifier::Slug("akismet".into()).is_blank());
    }

    #[test]
    fn card_request_puts_author_first() {
        let request = CardRequest::new(Some("automattic"), "akismet, ,jetpack,");
        assert_eq!(
            request.identifiers(),
            vec![
                Identifier::Author("automattic".into()),
                Identifier::Slug("akismet".into()),
                Identifier::Slug("jetpack".into()),
            ]
        );
        assert_eq!(CardRequest::new(Some("  "), "").identifiers(), vec![]);
    }
}
