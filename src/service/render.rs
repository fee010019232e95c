//! Markdown to display HTML

use pulldown_cmark::{html, Options, Parser};

/// Turns a stored Markdown body into HTML safe to embed in a page.
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, markdown: &str) -> String;
}

/// CommonMark with tables and strikethrough, sanitized through ammonia.
///
/// Raw HTML in the input is passed to the sanitizer like everything else, so
/// script tags, event handlers and `javascript:` links never survive.
#[derive(Debug, Default, Clone, Copy)]
pub struct SanitizingMarkdown;

impl SanitizingMarkdown {
    pub fn new() -> Self {
        Self
    }
}

impl MarkdownRenderer for SanitizingMarkdown {
    fn render(&self, markdown: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);

        let parser = Parser::new_ext(markdown, options);
        let mut unsafe_html = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut unsafe_html, parser);

        ammonia::Builder::default()
            .link_rel(Some("nofollow noopener noreferrer"))
            .clean(&unsafe_html)
            .to_string()
    }
}
