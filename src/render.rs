use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::config::RenderConfig;
use crate::error::ValidationError;
use crate::models::{parse_decimal, PluginRecord};
use crate::sanitize::{esc_html, esc_url, kses_plugin, sanitize_class, strip_all_tags};

/// Scale a rating is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingKind {
    /// Already on the 0..5 star scale.
    Raw,
    /// 0..100, as the catalog reports it.
    Percent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StarCounts {
    pub full: u8,
    pub half: u8,
    pub empty: u8,
}

impl StarCounts {
    pub fn new(scaled: f64) -> Self {
        let full = scaled.floor();
        let half = (scaled - full).ceil();
        let empty = 5.0 - full - half;
        StarCounts {
            full: full as u8,
            half: half as u8,
            empty: empty as u8,
        }
    }
}

/// Maps a rating onto 0..5 stars. Percentages are rounded to the nearest
/// 10% bucket first and then halved, which snaps to half stars.
pub fn scale_rating(rating: f64, kind: RatingKind) -> f64 {
    let scaled = match kind {
        RatingKind::Percent => (rating / 10.0).round() / 2.0,
        RatingKind::Raw => rating,
    };
    if scaled.is_nan() {
        return 0.0;
    }
    scaled.clamp(0.0, 5.0)
}

/// Star rating block with a screen-reader title.
pub fn star_rating(rating: f64, kind: RatingKind, number: u64) -> String {
    let scaled = scale_rating(rating, kind);
    let stars = StarCounts::new(scaled);

    let title = if number > 0 {
        let noun = if number == 1 { "rating" } else { "ratings" };
        format!(
            "{:.1} rating based on {} {}",
            scaled,
            format_number(number),
            noun
        )
    } else {
        format!("{:.1} rating", scaled)
    };

    let mut out = String::from(r#"<div class="star-rating">"#);
    out.push_str(&format!(
        r#"<span class="screen-reader-text">{}</span>"#,
        esc_html(&title)
    ));
    out.push_str(&r#"<div class="star star-full" aria-hidden="true"></div>"#.repeat(stars.full.into()));
    out.push_str(&r#"<div class="star star-half" aria-hidden="true"></div>"#.repeat(stars.half.into()));
    out.push_str(&r#"<div class="star star-empty" aria-hidden="true"></div>"#.repeat(stars.empty.into()));
    out.push_str("</div>");
    out
}

/// Same as [`star_rating`] for ratings given as text, e.g. "4,5".
pub fn star_rating_str(rating: &str, kind: RatingKind, number: u64) -> String {
    star_rating(parse_decimal(rating).unwrap_or(0.0), kind, number)
}

/// Groups digits in threes: 1234567 -> "1,234,567".
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Install and download counts: a million and over collapses, zero means the
/// catalog does not report small numbers.
pub fn format_count(n: u64, suffix: &str) -> String {
    if n >= 1_000_000 {
        "1+ Million".to_string()
    } else if n == 0 {
        "Less Than 10".to_string()
    } else {
        format!("{}{}", format_number(n), suffix)
    }
}

/// Parses the catalog's `last_updated` value.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %I:%M%p GMT", "%Y-%m-%d %I:%M%p", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    text.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// Human readable distance between two instants, e.g. "3 weeks".
pub fn human_time_diff(from: DateTime<Utc>, to: DateTime<Utc>) -> String {
    const MINUTE: i64 = 60;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;
    const WEEK: i64 = 7 * DAY;
    const MONTH: i64 = 30 * DAY;
    const YEAR: i64 = 365 * DAY;

    let diff = (to - from).num_seconds().abs();
    let (amount, unit, units) = if diff < MINUTE {
        (diff, "second", "seconds")
    } else if diff < HOUR {
        (div_round(diff, MINUTE), "min", "mins")
    } else if diff < DAY {
        (div_round(diff, HOUR), "hour", "hours")
    } else if diff < WEEK {
        (div_round(diff, DAY), "day", "days")
    } else if diff < MONTH {
        (div_round(diff, WEEK), "week", "weeks")
    } else if diff < YEAR {
        (div_round(diff, MONTH), "month", "months")
    } else {
        (div_round(diff, YEAR), "year", "years")
    };

    let amount = amount.max(1);
    format!("{} {}", amount, if amount == 1 { unit } else { units })
}

fn div_round(value: i64, unit: i64) -> i64 {
    (value as f64 / unit as f64).round() as i64
}

/// Renders [`PluginRecord`]s as plugin cards.
#[derive(Debug, Clone, Default)]
pub struct CardRenderer {
    config: RenderConfig,
}

impl CardRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn details_url(&self, slug: &str) -> String {
        format!("https://{}/plugins/{}/", self.config.catalog_host, slug)
    }

    pub fn render_card(&self, record: &PluginRecord) -> Result<String, ValidationError> {
        self.render_card_at(record, Utc::now())
    }

    /// Renders one card, measuring "last updated" against `now`.
    pub fn render_card_at(
        &self,
        record: &PluginRecord,
        now: DateTime<Utc>,
    ) -> Result<String, ValidationError> {
        if record.slug.trim().is_empty() {
            return Err(ValidationError::MissingSlug);
        }
        let icon = record
            .preferred_icon()
            .ok_or_else(|| ValidationError::MissingIcons {
                slug: record.slug.clone(),
            })?;

        let slug = esc_html(&record.slug);
        let name = esc_html(&record.name);
        let details_url = esc_html(&self.details_url(&record.slug));
        let version = kses_plugin(&record.version);
        let author = kses_plugin(&record.author);
        let description = esc_html(&strip_all_tags(&record.short_description));
        let label = esc_html(&strip_all_tags(&format!("{} {}", record.name, record.version)));

        let action_links = [
            format!(
                r#"<a class="install-now button" data-slug="{slug}" href="{href}" aria-label="Download {label} now" data-name="{name}">Download</a>"#,
                slug = slug,
                href = esc_url(&record.download_link),
                label = label,
                name = name,
            ),
            format!(
                r#"<a href="{href}" class="open-plugin-details" aria-label="More information about {label}" data-title="{name}">More Details</a>"#,
                href = details_url,
                label = label,
                name = name,
            ),
        ];

        let last_updated = match parse_timestamp(&record.last_updated) {
            Some(updated) => format!("{} ago", human_time_diff(updated, now)),
            None => esc_html(&record.last_updated),
        };

        let mut out = String::new();
        out.push_str(&format!(
            r#"<div class="plugin-card plugin-card-{}">"#,
            sanitize_class(&record.slug)
        ));
        out.push_str(r#"<div class="plugin-card-top">"#);
        out.push_str(&format!(
            r#"<div class="name column-name"><h3><a href="{}" class="open-plugin-details">{} <span class="plugin-version">{}</span><img src="{}" class="plugin-icon" alt=""></a></h3></div>"#,
            details_url,
            name,
            version,
            esc_url(icon)
        ));
        out.push_str(&format!(
            r#"<div class="action-links"><ul class="plugin-action-buttons"><li>{}</li></ul></div>"#,
            action_links.join("</li><li>")
        ));
        out.push_str(&format!(
            r#"<div class="desc column-description"><p>{}</p><p class="authors"><cite>By {}</cite></p></div>"#,
            description, author
        ));
        out.push_str("</div>");

        out.push_str(r#"<div class="plugin-card-bottom">"#);
        out.push_str(&format!(
            r#"<div class="vers column-rating">{}<span class="num-ratings" aria-hidden="true">({})</span></div>"#,
            star_rating(record.rating, RatingKind::Percent, record.num_ratings),
            format_number(record.num_ratings)
        ));
        out.push_str(&format!(
            r#"<div class="column-updated"><strong>Last Updated:</strong> {}</div>"#,
            last_updated
        ));
        out.push_str(&format!(
            r#"<div class="column-installs">{} Active Installations</div>"#,
            format_count(record.active_installs, "+")
        ));
        out.push_str(&format!(
            r#"<div class="column-downloaded">{} Downloads</div>"#,
            format_count(record.downloaded, "")
        ));
        out.push_str("</div></div>");

        Ok(out)
    }
}
