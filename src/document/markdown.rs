use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use std::path::Path;

use crate::error::{FactCheckError, Result};

pub fn extract_text(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path).map_err(FactCheckError::Io)?;
    Ok(markdown_to_text(&content))
}

fn markdown_to_text(markdown: &str) -> String {
    let parser = Parser::new(markdown);
    let mut text = String::new();

    for event in parser {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(&t),
            Event::SoftBreak | Event::HardBreak => text.push('\n'),
            Event::Start(Tag::Paragraph) | Event::Start(Tag::Heading { .. }) => {
                if !text.is_empty() && !text.ends_with('\n') {
                    text.push('\n');
                }
            }
            Event::End(TagEnd::Paragraph) | Event::End(TagEnd::Heading(_)) => {
                text.push_str("\n\n");
            }
            Event::Start(Tag::Item) => text.push_str("- "),
            Event::End(TagEnd::Item) => text.push('\n'),
            _ => {}
        }
    }

    text.lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markdown_syntax_into_plain_text() {
        let md = "# Hello\n\nThis is a **test** with `code`.\n\n- Item 1\n- Item 2";
        let text = markdown_to_text(md);
        assert!(text.contains("Hello"));
        assert!(text.contains("test"));
        assert!(text.contains("Item 1"));
    }
}
