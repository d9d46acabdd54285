//! Escaping and markup filtering for catalog text.

use std::collections::{HashMap, HashSet};

use htmlescape::{decode_html, encode_minimal};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// URL schemes a card may link to.
const ALLOWED_SCHEMES: [&str; 2] = ["http", "https"];

static SCRIPT_STYLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script[^>]*?>.*?</script>|<style[^>]*?>.*?</style>").unwrap()
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(?:#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\r\n\t ]+").unwrap());

/// Escapes text for HTML bodies and quoted attributes.
///
/// Catalog text often carries entities already (`&#8211;`), so each one is
/// decoded first and never double-escaped. A stray `&` stays literal.
pub fn esc_html(text: &str) -> String {
    let decoded = ENTITY_RE.replace_all(text, |caps: &regex::Captures<'_>| {
        decode_html(&caps[0]).unwrap_or_else(|_| caps[0].to_string())
    });
    encode_minimal(&decoded)
}

/// Escaped URL for an `href`/`src` attribute, or an empty string when the
/// URL is not absolute http(s).
pub fn esc_url(raw: &str) -> String {
    match Url::parse(raw.trim()) {
        Ok(url) if ALLOWED_SCHEMES.contains(&url.scheme()) => esc_html(url.as_str()),
        _ => String::new(),
    }
}

/// Removes every tag, dropping `<script>`/`<style>` bodies entirely.
/// The result is plain text and still needs escaping before output.
pub fn strip_all_tags(text: &str) -> String {
    let text = SCRIPT_STYLE_RE.replace_all(text, "");
    let text = TAG_RE.replace_all(&text, "");
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

/// Keeps only characters valid in a CSS class token.
pub fn sanitize_class(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

/// Filters markup down to the tags allowed in plugin author and version
/// fields.
pub fn kses_plugin(html: &str) -> String {
    let tags: HashSet<&str> = [
        "a", "abbr", "acronym", "cite", "code", "pre", "em", "strong", "ul", "ol", "li", "p", "br",
    ]
    .into_iter()
    .collect();

    let mut tag_attributes: HashMap<&str, HashSet<&str>> = HashMap::new();
    tag_attributes.insert("a", ["href", "title", "target"].into_iter().collect());
    tag_attributes.insert("abbr", ["title"].into_iter().collect());
    tag_attributes.insert("acronym", ["title"].into_iter().collect());
    tag_attributes.insert("ul", ["class"].into_iter().collect());

    ammonia::Builder::default()
        .tags(tags)
        .tag_attributes(tag_attributes)
        .generic_attributes(HashSet::new())
        .clean(html)
        .to_string()
}
