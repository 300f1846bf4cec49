use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::config::TemplateEngine;
use crate::models::ArticleRecord;

pub const TEMPLATE_FILE: &str = "newsletter.html";

pub const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <title>{{ subject }}</title>
</head>
<body>
  <h1>{{ subject }}</h1>
  <ul>
{% for article in articles %}
    <li><a href="{{ article.link }}">{{ article.title }}</a> - {{ article.date }}</li>
{% endfor %}
  </ul>
</body>
</html>
"#;

/// Turns a template and a list of articles into HTML.
pub trait TemplateRenderer {
    fn render(&self, template: &str, subject: &str, articles: &[ArticleRecord]) -> String;
}

/// Passthrough renderer: hands back the template untouched.
pub struct RawRenderer;

impl TemplateRenderer for RawRenderer {
    fn render(&self, template: &str, _subject: &str, _articles: &[ArticleRecord]) -> String {
        template.to_string()
    }
}

/// Minimal engine: `{% for x in articles %}...{% endfor %}` blocks and
/// `{{ x.field }}` / `{{ subject }}` / `{{ article_count }}` expressions.
pub struct LoopRenderer;

impl TemplateRenderer for LoopRenderer {
    fn render(&self, template: &str, subject: &str, articles: &[ArticleRecord]) -> String {
        let mut html = String::with_capacity(template.len());
        let mut rest = template;

        while let Some((before, var, body, after)) = next_loop(rest) {
            html.push_str(&substitute(before, |expr| top_level(expr, subject, articles)));
            for article in articles {
                html.push_str(&substitute(body, |expr| {
                    article_field(expr, var, article)
                        .or_else(|| top_level(expr, subject, articles))
                }));
            }
            rest = after;
        }

        html.push_str(&substitute(rest, |expr| top_level(expr, subject, articles)));
        html
    }
}

pub fn renderer_for(engine: TemplateEngine) -> Box<dyn TemplateRenderer> {
    match engine {
        TemplateEngine::Loop => Box::new(LoopRenderer),
        TemplateEngine::Raw => Box::new(RawRenderer),
    }
}

/// Read `<dir>/newsletter.html`, falling back to the built-in template.
pub fn load_template(dir: &Path) -> String {
    let path = dir.join(TEMPLATE_FILE);
    match fs::read_to_string(&path) {
        Ok(template) => {
            debug!(path = %path.display(), "using template");
            template
        }
        Err(e) => {
            if path.exists() {
                warn!("Could not read {}: {}; using built-in template", path.display(), e);
            }
            DEFAULT_TEMPLATE.to_string()
        }
    }
}

pub struct Composer {
    renderer: Box<dyn TemplateRenderer>,
    template: String,
}

impl Composer {
    pub fn new(renderer: Box<dyn TemplateRenderer>, template: String) -> Self {
        Self { renderer, template }
    }

    pub fn compose(&self, articles: &[ArticleRecord], subject: &str) -> String {
        self.renderer.render(&self.template, subject, articles)
    }
}

/// Find the next loop block, returning (text before, loop variable, body, text after).
/// An unterminated or malformed block is left as literal text.
fn next_loop(text: &str) -> Option<(&str, &str, &str, &str)> {
    let mut search_from = 0;

    while let Some(offset) = text[search_from..].find("{%") {
        let open = search_from + offset;
        let close = open + text[open..].find("%}")?;
        let tag: Vec<&str> = text[open + 2..close].split_whitespace().collect();

        if let ["for", var, "in", "articles"] = tag.as_slice() {
            let body_start = close + 2;
            let (body_end, after) = find_endfor(text, body_start)?;
            return Some((&text[..open], *var, &text[body_start..body_end], &text[after..]));
        }

        search_from = close + 2;
    }

    None
}

fn find_endfor(text: &str, from: usize) -> Option<(usize, usize)> {
    let mut search_from = from;

    while let Some(offset) = text[search_from..].find("{%") {
        let open = search_from + offset;
        let close = open + text[open..].find("%}")?;
        if text[open + 2..close].trim() == "endfor" {
            return Some((open, close + 2));
        }
        search_from = close + 2;
    }

    None
}

/// Replace every `{{ expr }}` using `resolve`; unknown expressions become empty.
fn substitute<F>(text: &str, resolve: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find("{{") {
        let Some(len) = rest[open..].find("}}") else {
            break;
        };
        out.push_str(&rest[..open]);
        let expr = rest[open + 2..open + len].trim();
        out.push_str(&resolve(expr).unwrap_or_default());
        rest = &rest[open + len + 2..];
    }

    out.push_str(rest);
    out
}

fn top_level(expr: &str, subject: &str, articles: &[ArticleRecord]) -> Option<String> {
    match expr {
        "subject" => Some(escape_html(subject)),
        "article_count" => Some(articles.len().to_string()),
        _ => None,
    }
}

fn article_field(expr: &str, var: &str, article: &ArticleRecord) -> Option<String> {
    let field = expr.strip_prefix(var)?.strip_prefix('.')?;
    let value = match field {
        "title" => escape_html(&article.title),
        "date" => escape_html(&article.date),
        "link" => escape_html(&article.link),
        "source" => escape_html(&article.source),
        "slug" => escape_html(&article.slug),
        "excerpt" => escape_html(&article.excerpt()),
        // Feed summaries are trusted HTML
        "summary" => article.body.clone(),
        other => escape_html(article.extra.get(other)?),
    };
    Some(value)
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
