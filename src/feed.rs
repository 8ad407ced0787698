use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde_json::Value;
use url::Url;

use crate::post::{self, RawPost};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub http_client: Option<HttpClient>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("post-feed/{}", crate::VERSION),
            timeout: Duration::from_secs(20),
            http_client: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Http(Url),
    File(PathBuf),
    Demo,
}

impl Source {
    /// `http(s)://` goes over the network, `file://` and anything that is
    /// not a URL is read from disk.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            bail!("feed source is empty");
        }
        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Source::Http(url)),
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map(Source::File)
                .map_err(|_| anyhow::anyhow!("feed source {raw:?} is not a usable file URL")),
            _ => Ok(Source::File(PathBuf::from(raw))),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Source::Http(url) => url.to_string(),
            Source::File(path) => path.display().to_string(),
            Source::Demo => "built-in demo posts".to_string(),
        }
    }
}

pub struct Client {
    http: HttpClient,
    user_agent: String,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("feed client user agent required");
        }

        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout)
                .build()
                .context("build feed HTTP client")?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
        })
    }

    pub fn fetch(&self, url: &Url) -> Result<Vec<RawPost>> {
        let response = self
            .http
            .get(url.clone())
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json")
            .send()
            .with_context(|| format!("request feed {url}"))?;

        if !response.status().is_success() {
            bail!("feed request failed with status {}", response.status());
        }

        let document: Value = response.json().context("decode feed response")?;
        let posts = post::parse_document(&document)?;
        Ok(posts)
    }
}

pub fn read_file(path: &Path) -> Result<Vec<RawPost>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read feed file {}", path.display()))?;
    let posts = post::parse_document_str(&text)?;
    Ok(posts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parses_sources() {
        assert_eq!(
            Source::parse("https://example.com/feed.json").unwrap(),
            Source::Http(Url::parse("https://example.com/feed.json").unwrap())
        );
        assert_eq!(
            Source::parse("file:///tmp/feed.json").unwrap(),
            Source::File(PathBuf::from("/tmp/feed.json"))
        );
        assert_eq!(
            Source::parse("fixtures/feed.json").unwrap(),
            Source::File(PathBuf::from("fixtures/feed.json"))
        );
        assert!(Source::parse("   ").is_err());
    }

    #[test]
    fn client_requires_user_agent() {
        let config = ClientConfig {
            user_agent: " ".into(),
            ..ClientConfig::default()
        };
        assert!(Client::new(config).is_err());
    }

    #[test]
    fn reads_feed_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("feed.json");
        fs::write(
            &path,
            r#"{"data":[{"title":"Hi","tags":["a"],"createdAt":"2020-01-01T00:00:00Z"}]}"#,
        )
        .unwrap();
        let posts = read_file(&path).unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "Hi");

        fs::write(&path, r#"{"data":[{"title":"Hi"}]}"#).unwrap();
        let err = read_file(&path).unwrap_err();
        assert!(err.downcast_ref::<post::LoadError>().is_some());
    }
}
