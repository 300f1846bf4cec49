use std::cmp::{Ordering, Reverse};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{ArticleRecord, UNTITLED_ARTICLE};

const DELIMITER: &str = "---";
const EXTENSION: &str = "md";

/// Render a record as a front-matter block followed by the raw body.
pub fn serialize_article(record: &ArticleRecord) -> String {
    format!(
        "{DELIMITER}\ntitle: \"{}\"\ndate: {}\nlink: {}\nsource: {}\n{DELIMITER}\n\n{}\n",
        single_line(&record.title),
        single_line(&record.date),
        single_line(&record.link),
        single_line(&record.source),
        record.body
    )
}

/// Collapse all whitespace runs, newlines included, to single spaces so a
/// value fits on its metadata line.
fn single_line(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Path an article with this slug lives at.
pub fn article_path(dir: &Path, slug: &str) -> PathBuf {
    dir.join(format!("{}.{}", slug, EXTENSION))
}

/// Write `record` unless a file with its slug already exists.
///
/// Returns `Ok(None)` when the article was already on disk; the existing
/// file is left untouched.
pub fn write_article_if_absent(dir: &Path, record: &ArticleRecord) -> Result<Option<PathBuf>> {
    let path = article_path(dir, &record.slug);

    let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            debug!(path = %path.display(), "article already exists, skipping");
            return Ok(None);
        }
        Err(e) => return Err(Error::io(&path, e)),
    };

    fill_new_file(&path, &mut file, serialize_article(record).as_bytes())?;

    Ok(Some(path))
}

/// Write `contents` into a file just created at `path`. On failure the file
/// is removed, since a leftover would mark the article as already ingested.
fn fill_new_file<W: Write>(path: &Path, file: &mut W, contents: &[u8]) -> Result<()> {
    if let Err(e) = file.write_all(contents).and_then(|()| file.flush()) {
        let _ = fs::remove_file(path);
        return Err(Error::io(path, e));
    }
    Ok(())
}

/// Parse an article file. Never fails: anything without a complete
/// front-matter block is read as body text under a placeholder title.
pub fn parse_article(slug: &str, content: &str) -> ArticleRecord {
    let mut record = ArticleRecord {
        slug: slug.to_string(),
        title: UNTITLED_ARTICLE.to_string(),
        date: String::new(),
        link: String::new(),
        source: String::new(),
        body: String::new(),
        extra: BTreeMap::new(),
    };

    let Some((meta, body)) = split_front_matter(content) else {
        record.body = content.to_string();
        return record;
    };

    for line in meta {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = unquote(value.trim()).to_string();

        match key {
            "title" => record.title = value,
            "date" => record.date = value,
            "link" => record.link = value,
            "source" => record.source = value,
            _ => {
                record.extra.insert(key.to_string(), value);
            }
        }
    }

    record.body = body.trim().to_string();
    record
}

/// Strip one matching pair of surrounding quotes, if present.
fn unquote(value: &str) -> &str {
    ['"', '\'']
        .iter()
        .find_map(|&q| value.strip_prefix(q).and_then(|v| v.strip_suffix(q)))
        .unwrap_or(value)
}

/// Split into metadata lines and the text after the closing delimiter.
fn split_front_matter(content: &str) -> Option<(Vec<&str>, &str)> {
    let mut lines = content.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim() != DELIMITER {
        return None;
    }

    let mut offset = first.len();
    let mut meta = Vec::new();
    for line in lines {
        offset += line.len();
        if line.trim() == DELIMITER {
            return Some((meta, &content[offset..]));
        }
        meta.push(line.trim_end_matches(['\r', '\n']));
    }

    None
}

/// Read a single article file, taking its slug from the file stem.
pub fn read_article(path: &Path) -> Result<ArticleRecord> {
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let slug = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(parse_article(&slug, &content))
}

/// Load the `limit` newest articles from `dir`, newest first.
///
/// Ordering uses the embedded `date` field; undated or unparsable files sort
/// after dated ones, most recently modified first.
pub fn load_articles(dir: &Path, limit: usize) -> Result<Vec<ArticleRecord>> {
    if !dir.is_dir() {
        return Err(Error::MissingDirectory(dir.to_path_buf()));
    }

    let mut articles: Vec<(ArticleRecord, Option<SystemTime>)> = Vec::new();

    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();

        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some(EXTENSION) {
            continue;
        }

        match read_article(&path) {
            Ok(record) => {
                let modified = entry.metadata().and_then(|m| m.modified()).ok();
                articles.push((record, modified));
            }
            Err(e) => {
                warn!("Could not load {}: {}", path.display(), e);
            }
        }
    }

    articles.sort_by(|(a, a_modified), (b, b_modified)| {
        let by_date = match (a.published_at(), b.published_at()) {
            (Some(a_date), Some(b_date)) => b_date.cmp(&a_date),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Reverse(a_modified).cmp(&Reverse(b_modified)),
        };
        by_date.then_with(|| a.slug.cmp(&b.slug))
    });

    Ok(articles
        .into_iter()
        .take(limit)
        .map(|(record, _)| record)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(slug: &str, title: &str, date: &str) -> ArticleRecord {
        ArticleRecord {
            slug: slug.to_string(),
            title: title.to_string(),
            date: date.to_string(),
            link: format!("https://x.test/{}", slug),
            source: "Example".to_string(),
            body: "<p>body</p>".to_string(),
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn test_serialize_article_layout() {
        let mut article = record("hello-world", "Hello, World!", "2026-10-16T08:00:00Z");
        article.link = "https://x.test/1".to_string();
        article.body = "<p>hi</p>".to_string();

        assert_eq!(
            serialize_article(&article),
            "---\ntitle: \"Hello, World!\"\ndate: 2026-10-16T08:00:00Z\nlink: https://x.test/1\nsource: Example\n---\n\n<p>hi</p>\n"
        );
    }

    #[test]
    fn test_serialize_folds_multiline_title() {
        let article = record("a", "Line one\nline two", "");
        assert!(serialize_article(&article).contains("title: \"Line one line two\"\n"));
    }

    #[test]
    fn test_serialize_folds_source_and_link() {
        let mut article = record("kyiv", "Kyiv", "2026-10-16T08:00:00Z");
        article.source = "Kyiv\nIndependent".to_string();
        article.link = "https://x.test/a\r\n".to_string();

        let parsed = parse_article("kyiv", &serialize_article(&article));
        assert_eq!(parsed.source, "Kyiv Independent");
        assert_eq!(parsed.link, "https://x.test/a");
        assert_eq!(parsed.date, "2026-10-16T08:00:00Z");
        assert_eq!(parsed.body, "<p>body</p>");
    }

    #[test]
    fn test_title_with_inner_quotes_round_trips() {
        let article = record("yes", "He said \"yes\"", "2026-10-16T08:00:00Z");
        let parsed = parse_article("yes", &serialize_article(&article));
        assert_eq!(parsed.title, "He said \"yes\"");
    }

    #[test]
    fn test_title_starting_with_quote_round_trips() {
        let article = record("q", "'Quoted' start", "");
        let parsed = parse_article("q", &serialize_article(&article));
        assert_eq!(parsed.title, "'Quoted' start");
    }

    #[test]
    fn test_unquote_strips_one_matching_pair() {
        assert_eq!(unquote("\"a\""), "a");
        assert_eq!(unquote("'a'"), "a");
        assert_eq!(unquote("\"\"a\"\""), "\"a\"");
        assert_eq!(unquote("\"a'"), "\"a'");
        assert_eq!(unquote("\""), "\"");
        assert_eq!(unquote("plain"), "plain");
    }

    /// Accepts nothing, like a full disk.
    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(ErrorKind::Other, "no space left on device"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_write_removes_new_file() {
        let dir = TempDir::new().unwrap();
        let path = article_path(dir.path(), "partial");
        fs::write(&path, "").unwrap();

        let err = fill_new_file(&path, &mut FullDisk, b"content").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(!path.exists());

        let article = record("partial", "Partial", "2026-10-16T08:00:00Z");
        assert_eq!(
            write_article_if_absent(dir.path(), &article).unwrap(),
            Some(path.clone())
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), serialize_article(&article));
    }

    #[test]
    fn test_parse_recovers_written_fields() {
        let original = record("hello-world", "Hello, World!", "2026-10-16T08:00:00Z");
        let parsed = parse_article("hello-world", &serialize_article(&original));
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_parse_unquoted_and_single_quoted_values() {
        let text = "---\ntitle: 'Single'\ndate: 2026-01-01\nlink: https://x.test/a?b=c:d\n---\nbody";
        let parsed = parse_article("s", text);
        assert_eq!(parsed.title, "Single");
        assert_eq!(parsed.date, "2026-01-01");
        assert_eq!(parsed.link, "https://x.test/a?b=c:d");
        assert_eq!(parsed.body, "body");
    }

    #[test]
    fn test_parse_keeps_unknown_keys() {
        let parsed = parse_article("s", "---\ntitle: T\nauthor: \"Someone\"\n---\n");
        assert_eq!(parsed.extra.get("author").map(String::as_str), Some("Someone"));
        assert_eq!(parsed.body, "");
    }

    #[test]
    fn test_parse_without_delimiter_is_all_body() {
        let text = "Just some text\nwith: a colon\n";
        let parsed = parse_article("plain", text);
        assert_eq!(parsed.title, UNTITLED_ARTICLE);
        assert_eq!(parsed.body, text);
        assert!(parsed.date.is_empty());
    }

    #[test]
    fn test_parse_unclosed_front_matter_is_all_body() {
        let text = "---\ntitle: Never closed\n";
        let parsed = parse_article("open", text);
        assert_eq!(parsed.title, UNTITLED_ARTICLE);
        assert_eq!(parsed.body, text);
    }

    #[test]
    fn test_parse_crlf_line_endings() {
        let parsed = parse_article("w", "---\r\ntitle: \"Win\"\r\n---\r\n\r\nbody\r\n");
        assert_eq!(parsed.title, "Win");
        assert_eq!(parsed.body, "body");
    }

    #[test]
    fn test_parse_empty_file() {
        let parsed = parse_article("empty", "");
        assert_eq!(parsed.title, UNTITLED_ARTICLE);
        assert_eq!(parsed.body, "");
    }

    #[test]
    fn test_write_if_absent_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let first = record("same", "First", "2026-10-16T08:00:00Z");
        let second = record("same", "Second", "2026-10-17T08:00:00Z");

        let written = write_article_if_absent(dir.path(), &first).unwrap();
        assert_eq!(written, Some(article_path(dir.path(), "same")));
        assert_eq!(write_article_if_absent(dir.path(), &second).unwrap(), None);

        let on_disk = fs::read_to_string(article_path(dir.path(), "same")).unwrap();
        assert_eq!(on_disk, serialize_article(&first));
    }

    #[test]
    fn test_load_articles_missing_dir() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            load_articles(&missing, 5),
            Err(Error::MissingDirectory(_))
        ));
    }

    #[test]
    fn test_load_articles_newest_first_with_limit() {
        let dir = TempDir::new().unwrap();
        for (slug, date) in [
            ("old", "2026-01-01T00:00:00Z"),
            ("newest", "2026-10-16T00:00:00Z"),
            ("middle", "Sun, 01 Mar 2026 12:00:00 +0000"),
            ("undated", ""),
        ] {
            write_article_if_absent(dir.path(), &record(slug, slug, date)).unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let slugs: Vec<String> = load_articles(dir.path(), 3)
            .unwrap()
            .into_iter()
            .map(|a| a.slug)
            .collect();
        assert_eq!(slugs, vec!["newest", "middle", "old"]);

        let all = load_articles(dir.path(), 10).unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[3].slug, "undated");
    }

    #[test]
    fn test_load_articles_reads_plain_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("loose.md"), "no front matter here").unwrap();

        let articles = load_articles(dir.path(), 5).unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].slug, "loose");
        assert_eq!(articles[0].title, UNTITLED_ARTICLE);
        assert_eq!(articles[0].body, "no front matter here");
    }
}
