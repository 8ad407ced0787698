use std::fs;
use std::path::Path;

use assert_cmd::Command;
use post_feed::preferences::{self, Preference, PreferenceStore, SqlitePreferences};
use post_feed::selection::SortDirection;
use predicates::prelude::*;
use tempfile::{tempdir, TempDir};

const DAY_MS: i64 = 86_400_000;

fn write_feed(dir: &Path, count: usize) -> String {
    let posts: Vec<serde_json::Value> = (0..count)
        .map(|idx| {
            let tag = if idx % 2 == 0 { "even" } else { "odd" };
            serde_json::json!({
                "id": idx + 1,
                "title": format!("Post {:02}", idx + 1),
                "description": "",
                "image": "",
                "tags": [tag],
                "createdAt": 1_546_300_800_000_i64 + idx as i64 * DAY_MS,
            })
        })
        .collect();
    let path = dir.join("feed.json");
    fs::write(&path, serde_json::json!({ "data": posts }).to_string()).unwrap();
    path.display().to_string()
}

fn post_feed(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("post-feed").unwrap();
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env("XDG_CACHE_HOME", home.path().join("cache"))
        .env("POSTFEED_STORAGE__PATH", home.path().join("state.db"))
        .env("POSTFEED_LOG__FILE", home.path().join("post-feed.log"))
        .env("TZ", "UTC")
        .env_remove("POSTFEED_FEED__URL")
        .env_remove("POSTFEED_LOG");
    cmd
}

fn titles(stdout: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|line| line.starts_with("Post "))
        .map(str::to_string)
        .collect()
}

#[test]
fn lists_first_page_newest_first() {
    let home = tempdir().unwrap();
    let feed = write_feed(home.path(), 12);

    let output = post_feed(&home)
        .args(["--list", "--feed", &feed])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "Showing 10 of 12 posts, sorted by date (newest first)",
        ))
        .get_output()
        .stdout
        .clone();

    let titles = titles(&output);
    assert_eq!(titles.len(), 10);
    assert_eq!(titles.first().map(String::as_str), Some("Post 12"));
    assert_eq!(titles.last().map(String::as_str), Some("Post 03"));
}

#[test]
fn stored_preference_is_applied() {
    let home = tempdir().unwrap();
    let feed = write_feed(home.path(), 4);

    let prefs = SqlitePreferences::open(preferences::Options {
        path: Some(home.path().join("state.db")),
    })
    .unwrap();
    prefs
        .save(&Preference::ByDate(SortDirection::Ascending))
        .unwrap();
    prefs.close().unwrap();

    let output = post_feed(&home)
        .args(["--list", "--feed", &feed])
        .assert()
        .success()
        .stdout(predicate::str::contains("sorted by date (oldest first)"))
        .get_output()
        .stdout
        .clone();
    assert_eq!(titles(&output), ["Post 01", "Post 02", "Post 03", "Post 04"]);

    let prefs = SqlitePreferences::open(preferences::Options {
        path: Some(home.path().join("state.db")),
    })
    .unwrap();
    prefs
        .save(&Preference::ByTags(vec!["odd".into()]))
        .unwrap();
    prefs.close().unwrap();

    let output = post_feed(&home)
        .args(["--list", "--feed", &feed])
        .assert()
        .success()
        .stdout(predicate::str::contains("ranked by 1 selected tag(s)"))
        .get_output()
        .stdout
        .clone();
    assert_eq!(titles(&output), ["Post 04", "Post 02", "Post 03", "Post 01"]);
}

#[test]
fn prints_dates_and_tags() {
    let home = tempdir().unwrap();
    let feed = write_feed(home.path(), 1);

    post_feed(&home)
        .args(["--list", "--feed", &feed])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tuesday, January 1st 2019, 12:00 am"))
        .stdout(predicate::str::contains("#even"));
}

#[test]
fn demo_posts_need_no_network() {
    let home = tempdir().unwrap();

    post_feed(&home)
        .args(["--list", "--demo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Showing 10 of 12 posts"))
        .stdout(predicate::str::contains("Hello again"));
}

#[test]
fn malformed_feed_fails() {
    let home = tempdir().unwrap();
    let path = home.path().join("feed.json");
    fs::write(&path, r#"{"posts": []}"#).unwrap();

    post_feed(&home)
        .args(["--list", "--feed"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn unusable_log_file_is_reported_on_stderr() {
    let home = tempdir().unwrap();
    let feed = write_feed(home.path(), 2);
    let blocker = home.path().join("not-a-dir");
    fs::write(&blocker, "").unwrap();

    post_feed(&home)
        .env("POSTFEED_LOG__FILE", blocker.join("post-feed.log"))
        .args(["--list", "--feed", &feed])
        .assert()
        .success()
        .stderr(predicate::str::contains("Logging disabled"))
        .stdout(predicate::str::contains("Showing 2 of 2 posts"));
}
