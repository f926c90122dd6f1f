//! Workshop item page parsing.
//!
//! An item page carries three things the resolver needs:
//! - the title (`div.workshopItemTitle`)
//! - one or more `Mod ID: <id>` lines in the description (`div#highlightContent`)
//! - an optional `div#RequiredItems` container whose anchors link to required items

use super::traits::{CatalogError, CatalogResult};
use regex::Regex;
use std::sync::LazyLock;

static CATALOG_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]id=(\d+)").expect("static regex"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h1\b[^>]*>(.*?)</h1\s*>").expect("static regex"));
static TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<div\b[^>]*\bclass\s*=\s*"[^"]*\bworkshopItemTitle\b[^"]*"[^>]*>(.*?)</div\s*>"#)
        .expect("static regex")
});
static DESCRIPTION_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<div\b[^>]*\bid\s*=\s*"highlightContent"[^>]*>"#).expect("static regex")
});
static REQUIRED_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<div\b[^>]*\bid\s*=\s*"RequiredItems"[^>]*>"#).expect("static regex")
});
static DIV_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<div\b|</div\s*>").expect("static regex"));
static ANCHOR_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*\bhref\s*=\s*"([^"]*)""#).expect("static regex")
});
static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|</p\s*>").expect("static regex"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("static regex"));
static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#([0-9]{1,7})|#[xX]([0-9a-fA-F]{1,6})|([a-zA-Z]+));").expect("static regex")
});
static MOD_ID_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Mod ID\s*:").expect("static regex"));

/// Structural content extracted from one item page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemPage {
    pub title: String,
    pub mod_ids: Vec<String>,
    /// Link targets of the required-items container, in page order
    pub required_urls: Vec<String>,
}

/// Extract the numeric catalog id from an item URL.
pub fn catalog_id_from_url(url: &str) -> Option<String> {
    CATALOG_ID
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Build the canonical item URL for a catalog id.
pub fn url_for_catalog_id(prefix: &str, catalog_id: &str) -> String {
    format!("{}{}", prefix, catalog_id)
}

/// The catalog answers unknown ids with a normal page headed "Sorry!".
pub fn is_missing_item_page(html: &str) -> bool {
    HEADING
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| html_to_text(m.as_str()).trim() == "Sorry!")
        .unwrap_or(false)
}

/// Parse an item page.
///
/// Missing title or missing `Mod ID:` entries is a parse failure; a missing
/// required-items container just means the item has no dependencies.
pub fn parse_item_page(url: &str, html: &str) -> CatalogResult<ItemPage> {
    let parse_error = |reason: &str| CatalogError::Parse {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let title = TITLE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| html_to_text(m.as_str()).trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| parse_error("missing item title"))?;

    let description =
        div_inner(html, &DESCRIPTION_OPEN).ok_or_else(|| parse_error("missing description"))?;
    let mod_ids = mod_ids_from_text(&html_to_text(description));
    if mod_ids.is_empty() {
        return Err(parse_error("no Mod ID entries in description"));
    }

    let mut required_urls: Vec<String> = Vec::new();
    if let Some(container) = div_inner(html, &REQUIRED_OPEN) {
        for caps in ANCHOR_HREF.captures_iter(container) {
            let href = decode_entities(caps[1].trim());
            if !href.is_empty() && !required_urls.contains(&href) {
                required_urls.push(href);
            }
        }
    }

    Ok(ItemPage {
        title,
        mod_ids,
        required_urls,
    })
}

/// Split description text on `Mod ID:` labels.
///
/// Each value runs to the next label or the end of its line.
fn mod_ids_from_text(text: &str) -> Vec<String> {
    let labels: Vec<_> = MOD_ID_LABEL.find_iter(text).collect();
    let mut ids = Vec::new();

    for (i, label) in labels.iter().enumerate() {
        let end = labels
            .get(i + 1)
            .map(|next| next.start())
            .unwrap_or(text.len());
        let segment = &text[label.end()..end];
        let value = segment.lines().next().unwrap_or("").trim();
        if !value.is_empty() {
            ids.push(value.to_string());
        }
    }

    ids
}

/// Inner HTML of the first div matched by `open`, honouring nested divs.
fn div_inner<'a>(html: &'a str, open: &Regex) -> Option<&'a str> {
    let start = open.find(html)?.end();
    let mut depth = 1usize;

    for tag in DIV_TAG.find_iter(&html[start..]) {
        if tag.as_str().starts_with("</") {
            depth -= 1;
            if depth == 0 {
                return Some(&html[start..start + tag.start()]);
            }
        } else {
            depth += 1;
        }
    }

    // Unbalanced markup: take the rest of the document
    Some(&html[start..])
}

fn html_to_text(fragment: &str) -> String {
    let with_breaks = LINE_BREAK.replace_all(fragment, "\n");
    let stripped = TAG.replace_all(&with_breaks, "");
    decode_entities(&stripped)
}

/// Decode named and numeric character references in one pass, leaving
/// unknown or invalid ones as written
fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &regex::Captures| {
            let decoded = if let Some(dec) = caps.get(1) {
                dec.as_str().parse::<u32>().ok().and_then(char::from_u32)
            } else if let Some(hex) = caps.get(2) {
                u32::from_str_radix(hex.as_str(), 16)
                    .ok()
                    .and_then(char::from_u32)
            } else {
                match &caps[3] {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    _ => None,
                }
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
pub(crate) fn item_page_html(title: &str, mod_ids: &[&str], required_urls: &[&str]) -> String {
    let description = mod_ids
        .iter()
        .map(|id| format!("Mod ID: {}<br>", id))
        .collect::<String>();
    let required = if required_urls.is_empty() {
        String::new()
    } else {
        let anchors = required_urls
            .iter()
            .map(|u| {
                format!(
                    r#"<a href="{}" target="_blank"><div class="requiredItem">dep</div></a>"#,
                    u
                )
            })
            .collect::<String>();
        format!(
            r#"<div class="requiredItemsContainer" id="RequiredItems">{}</div>"#,
            anchors
        )
    };
    format!(
        r#"<html><body><div class="workshopItemTitle">{}</div>
<div class="workshopItemDescription" id="highlightContent">Workshop ID: 1<br>{}</div>
{}</body></html>"#,
        title, description, required
    )
}
