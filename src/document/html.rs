use scraper::{Html, Selector};
use std::path::Path;

use crate::error::{FactCheckError, Result};

pub fn extract_text(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path).map_err(FactCheckError::Io)?;
    Ok(html_to_text(&content))
}

fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut text_parts = Vec::new();

    for selector_str in ["main", "article", "body", "html"] {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(element) = document.select(&selector).next() {
                extract_element_text(&element, &mut text_parts);
                break;
            }
        }
    }

    clean_html_text(&text_parts.join(" "))
}

fn extract_element_text(element: &scraper::ElementRef, parts: &mut Vec<String>) {
    let tag_name = element.value().name();
    if tag_name == "script" || tag_name == "style" || tag_name == "noscript" {
        return;
    }

    for node in element.children() {
        if let Some(text) = node.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed.to_string());
            }
        } else if let Some(child_element) = scraper::ElementRef::wrap(node) {
            extract_element_text(&child_element, parts);
            if matches!(
                child_element.value().name(),
                "p" | "div" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "li" | "br" | "tr"
            ) {
                parts.push("\n".to_string());
            }
        }
    }
}

fn clean_html_text(text: &str) -> String {
    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");

    let text: String = text.split_whitespace().collect::<Vec<_>>().join(" ");

    text.replace(" \n ", "\n\n")
        .replace("\n ", "\n")
        .replace(" \n", "\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_body_text_and_skips_scripts() {
        let html = r#"
            <html><body>
                <h1>Hello World</h1>
                <p>This is a <strong>test</strong> paragraph.</p>
                <script>console.log('ignored');</script>
            </body></html>
        "#;
        let text = html_to_text(html);
        assert!(text.contains("Hello World"));
        assert!(text.contains("test paragraph"));
        assert!(!text.contains("console.log"));
    }
}
