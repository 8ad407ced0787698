use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, TimeZone, Utc};
use url::Url;

use crate::config::FeedConfig;
use crate::feed::{self, Source};
use crate::post::RawPost;

pub trait FeedService: Send + Sync {
    fn load_posts(&self) -> Result<Vec<RawPost>>;
}

pub struct HttpFeedService {
    client: Arc<feed::Client>,
    url: Url,
}

impl HttpFeedService {
    pub fn new(client: Arc<feed::Client>, url: Url) -> Self {
        Self { client, url }
    }
}

impl FeedService for HttpFeedService {
    fn load_posts(&self) -> Result<Vec<RawPost>> {
        self.client.fetch(&self.url).context("fetch posts")
    }
}

pub struct FileFeedService {
    path: PathBuf,
}

impl FileFeedService {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl FeedService for FileFeedService {
    fn load_posts(&self) -> Result<Vec<RawPost>> {
        feed::read_file(&self.path).context("load posts from file")
    }
}

#[derive(Default)]
pub struct MockFeedService;

impl FeedService for MockFeedService {
    fn load_posts(&self) -> Result<Vec<RawPost>> {
        Ok(mock_posts())
    }
}

pub fn service_for(source: &Source, cfg: &FeedConfig) -> Result<Arc<dyn FeedService + Send + Sync>> {
    let service: Arc<dyn FeedService + Send + Sync> = match source {
        Source::Http(url) => {
            let client = feed::Client::new(feed::ClientConfig {
                user_agent: cfg.user_agent.clone(),
                timeout: cfg.timeout,
                http_client: None,
            })
            .context("create feed client")?;
            Arc::new(HttpFeedService::new(Arc::new(client), url.clone()))
        }
        Source::File(path) => Arc::new(FileFeedService::new(path.clone())),
        Source::Demo => Arc::new(MockFeedService),
    };
    Ok(service)
}

fn mock_posts() -> Vec<RawPost> {
    const SAMPLES: [(&str, &str, &[&str]); 12] = [
        ("Hello from post-feed", "Posts are fetched once and kept in memory.", &["welcome"]),
        ("Ranking by tags", "Select tags on the left: posts carrying more of them float to the top.", &["guide", "tags"]),
        ("Searching titles", "Press / and type. The text is matched as a case-insensitive pattern.", &["guide", "search"]),
        ("Sorting by date", "Press s to flip between newest and oldest first. Selected tags are cleared.", &["guide"]),
        ("Deleting posts", "Press d to drop the selected post for this session.", &["guide"]),
        ("Infinite scroll", "Scroll down to reveal ten more posts at a time.", &["guide", "scroll"]),
        ("Rust in the terminal", "ratatui draws the interface, crossterm reads the keyboard.", &["rust", "tui"]),
        ("Borrowing without tears", "Views borrow posts straight out of the store.", &["rust"]),
        ("Stable sorts", "Equal dates keep the order the feed delivered them in.", &["rust", "algorithms"]),
        ("Preferences", "The last sort or tag choice survives restarts.", &["storage"]),
        ("Offline demo", "Run with --feed to point at your own JSON document.", &["welcome", "guide"]),
        ("Hello again", "Try searching for hello.", &["search"]),
    ];

    let origin = Utc.with_ymd_and_hms(2019, 3, 1, 9, 0, 0).single().unwrap_or_else(Utc::now);
    SAMPLES
        .iter()
        .enumerate()
        .map(|(index, (title, description, tags))| RawPost {
            source_id: None,
            title: title.to_string(),
            description: description.to_string(),
            image: format!("https://picsum.photos/seed/post-{index}/320/200"),
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            created_at: origin + Duration::hours(index as i64 * 7),
        })
        .collect()
}
