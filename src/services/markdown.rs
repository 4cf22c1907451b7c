//! Markdown rendering service
//!
//! Renders journal post bodies to HTML with pulldown-cmark. Fenced code
//! blocks with a language hint (exploit scripts, shell sessions, config
//! snippets) are highlighted by syntect with inline styles.
//!
//! Raw HTML in the source is escaped rather than passed through, and link or
//! image targets outside `http`, `https`, `mailto` and relative URLs are
//! replaced by `#`.
//!
//! # Example
//!
//! ```
//! use jcpc::services::markdown::MarkdownRenderer;
//!
//! let renderer = MarkdownRenderer::new();
//! let html = renderer.render("# Writeup\n\nThe flag was **hidden** in the cookie.");
//! assert!(html.contains("<h1>"));
//! assert!(html.contains("<strong>"));
//! ```

use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use std::sync::Arc;
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

/// Highlighting theme matching the dark site palette
const DEFAULT_THEME: &str = "base16-ocean.dark";

const SAFE_URL_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// A thread-safe Markdown renderer with syntax highlighting support.
///
/// Enabled extensions: tables, strikethrough, task lists, heading
/// attributes and smart punctuation.
#[derive(Clone)]
pub struct MarkdownRenderer {
    syntax_set: Arc<SyntaxSet>,
    theme_set: Arc<ThemeSet>,
    theme_name: String,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MarkdownRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkdownRenderer")
            .field("theme_name", &self.theme_name)
            .finish()
    }
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self::with_theme(DEFAULT_THEME)
    }

    /// Renderer using a specific syntect theme.
    ///
    /// Unknown theme names fall back to the default theme.
    pub fn with_theme(theme_name: &str) -> Self {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let theme_set = ThemeSet::load_defaults();

        let theme_name = if theme_set.themes.contains_key(theme_name) {
            theme_name.to_string()
        } else {
            DEFAULT_THEME.to_string()
        };

        Self {
            syntax_set: Arc::new(syntax_set),
            theme_set: Arc::new(theme_set),
            theme_name,
        }
    }

    /// Renders Markdown text to HTML.
    pub fn render(&self, markdown: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
        options.insert(Options::ENABLE_SMART_PUNCTUATION);

        let parser = Parser::new_ext(markdown, options);
        let events = self.process_events(parser);

        let mut html_output = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut html_output, events.into_iter());
        html_output
    }

    /// Highlights code blocks, neutralizes raw HTML and unsafe link targets.
    fn process_events<'a>(&self, parser: Parser<'a>) -> Vec<Event<'a>> {
        let mut events = Vec::new();
        let mut code_block: Option<(Option<String>, String)> = None;

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split_whitespace()
                            .next()
                            .map(str::to_string),
                        CodeBlockKind::Indented => None,
                    };
                    code_block = Some((lang, String::new()));
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some((lang, content)) = code_block.take() {
                        let html = match lang {
                            Some(lang) => self.highlight_code(&content, &lang),
                            None => plain_code_block(&content, None),
                        };
                        events.push(Event::Html(html.into()));
                    }
                }
                Event::Text(text) if code_block.is_some() => {
                    if let Some((_, content)) = code_block.as_mut() {
                        content.push_str(&text);
                    }
                }
                Event::Html(raw) | Event::InlineHtml(raw) => events.push(Event::Text(raw)),
                Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => events.push(Event::Start(Tag::Link {
                    link_type,
                    dest_url: safe_url(dest_url),
                    title,
                    id,
                })),
                Event::Start(Tag::Image {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => events.push(Event::Start(Tag::Image {
                    link_type,
                    dest_url: safe_url(dest_url),
                    title,
                    id,
                })),
                event => events.push(event),
            }
        }

        events
    }

    /// Applies syntax highlighting to a code block.
    ///
    /// Unknown languages render as a plain block tagged with a
    /// `language-*` class.
    fn highlight_code(&self, code: &str, lang: &str) -> String {
        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang));

        match (syntax, self.theme_set.themes.get(&self.theme_name)) {
            (Some(syntax), Some(theme)) => {
                highlighted_html_for_string(code, &self.syntax_set, syntax, theme)
                    .unwrap_or_else(|_| plain_code_block(code, Some(lang)))
            }
            _ => plain_code_block(code, Some(lang)),
        }
    }
}

/// Keeps relative URLs and the allowed schemes, anything else becomes `#`
fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    let trimmed = url.trim();
    // A ':' before any '/', '?' or '#' means the URL carries a scheme
    let scheme_end = trimmed
        .find(|c: char| matches!(c, ':' | '/' | '?' | '#'))
        .filter(|&i| trimmed[i..].starts_with(':'));

    match scheme_end {
        None => url,
        Some(end) => {
            let scheme = &trimmed[..end];
            if SAFE_URL_SCHEMES
                .iter()
                .any(|allowed| scheme.eq_ignore_ascii_case(allowed))
            {
                url
            } else {
                CowStr::Borrowed("#")
            }
        }
    }
}

fn plain_code_block(code: &str, lang: Option<&str>) -> String {
    match lang {
        Some(lang) => format!(
            "<pre><code class=\"language-{}\">{}</code></pre>",
            html_escape(lang),
            html_escape(code)
        ),
        None => format!("<pre><code>{}</code></pre>", html_escape(code)),
    }
}

/// Escapes HTML special characters in a string.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_invalid_theme_falls_back() {
        let renderer = MarkdownRenderer::with_theme("nonexistent-theme");
        assert_eq!(renderer.theme_name, DEFAULT_THEME);
        assert_eq!(MarkdownRenderer::with_theme("InspiredGitHub").theme_name, "InspiredGitHub");
    }

    #[test]
    fn test_render_basic_blocks() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("## Reconnaissance\n\n- nmap\n- gobuster\n\n> Note\n\n~~faux~~ *vrai*");
        assert!(html.contains("<h2>Reconnaissance</h2>"));
        assert!(html.contains("<ul>"));
        assert!(html.contains("<blockquote>"));
        assert!(html.contains("<del>faux</del>"));
        assert!(html.contains("<em>vrai</em>"));
    }

    #[test]
    fn test_render_link_and_table() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("[404CTF](https://www.404ctf.fr)\n\n| Rang | Équipe |\n|---|---|\n| 1 | JCPC |");
        assert!(html.contains("<a href=\"https://www.404ctf.fr\">404CTF</a>"));
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>JCPC</td>"));
    }

    #[test]
    fn test_code_block_highlighted() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("```python\nfrom pwn import *\nr = remote('host', 1337)\n```");
        assert!(html.contains("<pre"));
        assert!(html.contains("style="));
        assert!(html.contains("remote"));
    }

    #[test]
    fn test_code_block_info_string_with_attributes() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("```bash title=\"exploit\"\necho flag\n```");
        assert!(html.contains("style="));
        assert!(html.contains("echo"));
    }

    #[test]
    fn test_code_block_without_or_with_unknown_language() {
        let renderer = MarkdownRenderer::new();

        let html = renderer.render("```\n<script>alert(1)</script>\n```");
        assert!(html.contains("<pre><code>"));
        assert!(html.contains("&lt;script&gt;"));

        let html = renderer.render("```asm-x42\nnop\n```");
        assert!(html.contains("language-asm-x42"));
        assert!(html.contains("nop"));
    }

    #[test]
    fn test_raw_html_is_escaped() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("<script>alert('xss')</script>\n\nTexte <b>gras</b>");
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<b>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_task_list() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("- [x] Flag 1\n- [ ] Flag 2");
        assert!(html.contains("type=\"checkbox\""));
        assert!(html.contains("checked"));
    }

    #[test]
    fn test_render_empty_input() {
        assert!(MarkdownRenderer::new().render("").is_empty());
    }

    #[test]
    fn test_html_escape_function() {
        assert_eq!(html_escape("<>&\"'"), "&lt;&gt;&amp;&quot;&#x27;");
    }

    #[test]
    fn test_unsafe_link_targets_are_replaced() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render(
            "[clic](javascript:alert(document.cookie)) ![i](javascript:x) [b](JavaScript:alert(1)) [d](data:text/html,x)",
        );
        assert!(!html.to_lowercase().contains("javascript:"));
        assert!(!html.contains("data:"));
        assert!(html.contains("href=\"#\""));
        assert!(html.contains("src=\"#\""));
    }

    #[test]
    fn test_safe_link_targets_are_kept() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render(
            "[site](https://jcpc.fr/services) [mail](mailto:contact@jcpc.fr) [rel](/journal/ctf) [ancre](#methode)",
        );
        assert!(html.contains("href=\"https://jcpc.fr/services\""));
        assert!(html.contains("href=\"mailto:contact@jcpc.fr\""));
        assert!(html.contains("href=\"/journal/ctf\""));
        assert!(html.contains("href=\"#methode\""));
    }
}
