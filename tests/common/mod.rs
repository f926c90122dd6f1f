//! Shared fixtures for integration tests

#![allow(dead_code)]

use modwarden::catalog::MockCatalog;

pub const ITEM_PREFIX: &str = "https://steamcommunity.com/sharedfiles/filedetails/?id=";

/// Link form used by item pages for their requirements
pub fn required_link(catalog_id: &str) -> String {
    format!(
        "https://steamcommunity.com/workshop/filedetails/?id={}",
        catalog_id
    )
}

/// Minimal catalog item page
pub fn item_page(title: &str, mod_ids: &[&str], required_links: &[String]) -> String {
    let description: String = mod_ids
        .iter()
        .map(|id| format!("Mod ID: {}<br>", id))
        .collect();
    let required = if required_links.is_empty() {
        String::new()
    } else {
        let anchors: String = required_links
            .iter()
            .map(|link| format!(r#"<a href="{}"><div class="requiredItem">{}</div></a>"#, link, link))
            .collect();
        format!(r#"<div class="requiredItemsContainer" id="RequiredItems">{}</div>"#, anchors)
    };
    format!(
        r#"<html><head><title>Steam Workshop::{title}</title></head><body>
<div class="workshopItemTitle">{title}</div>
<div class="workshopItemDescription" id="highlightContent">{description}Workshop ID: 0</div>
{required}
</body></html>"#
    )
}

/// Register an item whose single internal mod id is `<name>Mod`
pub fn add_item(catalog: &MockCatalog, catalog_id: &str, name: &str, required: &[&str]) {
    let links: Vec<String> = required.iter().map(|id| required_link(id)).collect();
    let mod_id = format!("{}Mod", name);
    catalog.add_page(catalog_id, item_page(name, &[&mod_id], &links));
}
