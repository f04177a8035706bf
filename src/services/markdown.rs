//! Markdown rendering service
//!
//! Markdown to HTML with syntect highlighting for fenced code blocks, plus a
//! plain-text flattening used to derive excerpts.
//!
//! ```
//! use folio::services::markdown::MarkdownRenderer;
//!
//! let renderer = MarkdownRenderer::new();
//! let html = renderer.render("# Hello World\n\nThis is **bold** text.");
//! assert!(html.contains("<h1>"));
//! assert!(html.contains("<strong>"));
//! ```

use once_cell::sync::Lazy;
use pulldown_cmark::{html, CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

const DEFAULT_THEME: &str = "base16-ocean.dark";

// Loading the bundled syntaxes is slow; share one copy per process.
static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);

/// Thread-safe Markdown renderer.
///
/// Supports tables, strikethrough, task lists and smart punctuation. Fenced
/// code blocks with a recognized language are highlighted; unknown languages
/// keep a `language-*` class for client-side highlighters.
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    theme_name: String,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self::with_theme(DEFAULT_THEME)
    }

    /// Use a specific syntect theme, falling back to the default when unknown
    pub fn with_theme(theme_name: &str) -> Self {
        let theme_name = if THEME_SET.themes.contains_key(theme_name) {
            theme_name.to_string()
        } else {
            DEFAULT_THEME.to_string()
        };
        Self { theme_name }
    }

    fn options() -> Options {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_SMART_PUNCTUATION);
        options
    }

    /// Render Markdown to HTML
    pub fn render(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, Self::options());
        let events = self.process_events(parser);

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());
        html_output
    }

    /// Flatten Markdown to whitespace-normalized text, cut at `max_chars`
    /// on a word boundary with a trailing ellipsis.
    pub fn plain_text(&self, markdown: &str, max_chars: usize) -> String {
        let mut text = String::new();
        let mut in_code_block = false;

        for event in Parser::new_ext(markdown, Self::options()) {
            match event {
                Event::Start(Tag::CodeBlock(_)) => in_code_block = true,
                Event::End(TagEnd::CodeBlock) => in_code_block = false,
                Event::Text(t) | Event::Code(t) if !in_code_block => {
                    text.push_str(&t);
                }
                Event::SoftBreak
                | Event::HardBreak
                | Event::End(TagEnd::Paragraph)
                | Event::End(TagEnd::Heading(_))
                | Event::End(TagEnd::Item) => text.push(' '),
                _ => {}
            }
        }

        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        truncate_words(&normalized, max_chars)
    }

    /// Collapse code blocks into pre-rendered HTML events
    fn process_events<'a>(&self, parser: Parser<'a>) -> Vec<Event<'a>> {
        let mut events = Vec::new();
        let mut in_code_block = false;
        let mut code_lang: Option<String> = None;
        let mut code_content = String::new();

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    in_code_block = true;
                    code_content.clear();
                    code_lang = match kind {
                        CodeBlockKind::Fenced(lang) => {
                            let lang = lang.split_whitespace().next().unwrap_or("").to_string();
                            (!lang.is_empty()).then_some(lang)
                        }
                        CodeBlockKind::Indented => None,
                    };
                }
                Event::End(TagEnd::CodeBlock) => {
                    in_code_block = false;
                    let rendered = match code_lang.take() {
                        Some(lang) => self.highlight_code(&code_content, &lang),
                        None => plain_code_block(&code_content, None),
                    };
                    events.push(Event::Html(rendered.into()));
                }
                Event::Text(text) if in_code_block => code_content.push_str(&text),
                _ => events.push(event),
            }
        }

        events
    }

    fn highlight_code(&self, code: &str, lang: &str) -> String {
        let syntax = SYNTAX_SET
            .find_syntax_by_token(lang)
            .or_else(|| SYNTAX_SET.find_syntax_by_extension(lang));

        match (syntax, THEME_SET.themes.get(&self.theme_name)) {
            (Some(syntax), Some(theme)) => {
                highlighted_html_for_string(code, &SYNTAX_SET, syntax, theme)
                    .unwrap_or_else(|_| plain_code_block(code, Some(lang)))
            }
            _ => plain_code_block(code, Some(lang)),
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

fn truncate_words(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut: String = text.chars().take(max_chars).collect();
    let trimmed = match cut.rfind(' ') {
        Some(idx) if idx > 0 => &cut[..idx],
        _ => cut.as_str(),
    };
    format!("{}…", trimmed.trim_end_matches(|c: char| c.is_ascii_punctuation()))
}

fn html_escape(s: &str) -> String {
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
    fn test_invalid_theme_falls_back() {
        assert_eq!(MarkdownRenderer::with_theme("nope").theme_name, DEFAULT_THEME);
        assert_eq!(MarkdownRenderer::with_theme("InspiredGitHub").theme_name, "InspiredGitHub");
    }

    #[test]
    fn test_render_basic_markdown() {
        let html = MarkdownRenderer::new().render("# Title\n\nSome *em* and **strong**.");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<em>em</em>"));
        assert!(html.contains("<strong>strong</strong>"));
    }

    #[test]
    fn test_render_table_and_strikethrough() {
        let html = MarkdownRenderer::new().render("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~");
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
    }

    #[test]
    fn test_render_task_list() {
        let html = MarkdownRenderer::new().render("- [x] done\n- [ ] todo");
        assert!(html.contains("type=\"checkbox\""));
    }

    #[test]
    fn test_known_language_is_highlighted() {
        let html = MarkdownRenderer::new().render("```rust\nfn main() {}\n```");
        assert!(html.contains("<pre style="));
        assert!(html.contains("main"));
    }

    #[test]
    fn test_unknown_language_keeps_class_and_escapes() {
        let html = MarkdownRenderer::new().render("```zzz-lang\n<script>\n```");
        assert!(html.contains("class=\"language-zzz-lang\""));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_plain_code_block_without_language() {
        let html = MarkdownRenderer::new().render("    indented & code");
        assert!(html.contains("<pre><code>indented &amp; code"));
    }

    #[test]
    fn test_plain_text_strips_markup_and_code() {
        let text = MarkdownRenderer::new().plain_text(
            "# Heading\n\nA [link](https://x.y) and `code`.\n\n```rust\nlet hidden = 1;\n```\n\n- item",
            500,
        );
        assert_eq!(text, "Heading A link and code. item");
    }

    #[test]
    fn test_plain_text_truncates_on_word_boundary() {
        let text = MarkdownRenderer::new().plain_text("alpha beta gamma delta", 13);
        assert_eq!(text, "alpha beta…");
    }

    #[test]
    fn test_truncate_handles_multibyte() {
        assert_eq!(truncate_words("héllo wörld", 20), "héllo wörld");
        assert_eq!(truncate_words("héllo wörld", 8), "héllo…");
    }
}
