use scraper::{Html, Selector};
use url::Url;

use crate::{AppError, Result};

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| AppError::Browser(format!("Invalid CSS selector '{}': {:?}", selector, e)))
}

/// Resolves every `href` under `selector` against `base_url`.
pub fn hrefs(html: &str, base_url: &str, selector: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let css_selector = parse_selector(selector)?;
    let base = Url::parse(base_url).ok();

    let urls = document
        .select(&css_selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| match &base {
            Some(base) => base.join(href).ok().map(|u| u.to_string()),
            None => Url::parse(href).ok().map(|u| u.to_string()),
        })
        .collect();

    Ok(urls)
}

pub fn last_text(html: &str, selector: &str) -> Result<Option<String>> {
    let document = Html::parse_document(html);
    let css_selector = parse_selector(selector)?;

    Ok(document
        .select(&css_selector)
        .last()
        .map(|element| element.text().collect::<Vec<_>>().join(" ").trim().to_string()))
}
