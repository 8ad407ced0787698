use std::fmt::Display;

use chrono::{DateTime, Datelike, Local, TimeZone};

use crate::pipeline::Ranked;
use crate::post::PostId;
use crate::selection::SortDirection;

#[derive(Debug, Clone, PartialEq)]
pub struct ViewRecord {
    pub id: PostId,
    pub title: String,
    pub description: String,
    pub image: String,
    pub tags: Vec<String>,
    pub formatted_date: String,
    pub matching_tags: usize,
}

impl ViewRecord {
    pub fn from_ranked(entry: &Ranked<'_>) -> Self {
        let post = entry.post;
        Self {
            id: post.id,
            title: post.title.clone(),
            description: post.description.clone(),
            image: post.image.clone(),
            tags: post.tags.clone(),
            formatted_date: format_date(&post.created_at.with_timezone(&Local)),
            matching_tags: entry.matching_tags,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedView {
    pub posts: Vec<ViewRecord>,
    pub tags: Vec<String>,
    pub selected_tags: Vec<String>,
    pub sort_direction: SortDirection,
    pub search_text: String,
    pub total: usize,
    pub visible_count: usize,
    pub exhausted: bool,
    pub expanded: bool,
}

impl FeedView {
    pub fn is_selected(&self, tag: &str) -> bool {
        self.selected_tags.iter().any(|selected| selected == tag)
    }

    pub fn summary(&self) -> String {
        let ordering = if self.selected_tags.is_empty() {
            format!("sorted by date ({})", self.sort_direction.label())
        } else {
            format!("ranked by {} selected tag(s)", self.selected_tags.len())
        };
        format!(
            "Showing {} of {} posts, {}",
            self.posts.len(),
            self.total,
            ordering
        )
    }
}

/// Formats like `Monday, January 1st 2024, 3:05 pm`.
pub fn format_date<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let day = at.day();
    format!(
        "{}, {} {}{} {}, {}",
        at.format("%A"),
        at.format("%B"),
        day,
        ordinal_suffix(day),
        at.format("%Y"),
        at.format("%-I:%M %P")
    )
}

fn ordinal_suffix(day: u32) -> &'static str {
    match day % 100 {
        11..=13 => "th",
        _ => match day % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn formats_like_the_feed_page() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 15, 5, 0).unwrap();
        assert_eq!(format_date(&at), "Monday, January 1st 2024, 3:05 pm");

        let morning = Utc.with_ymd_and_hms(2019, 3, 22, 0, 30, 0).unwrap();
        assert_eq!(format_date(&morning), "Friday, March 22nd 2019, 12:30 am");
    }

    #[test]
    fn ordinal_suffixes() {
        let cases = [
            (1, "st"),
            (2, "nd"),
            (3, "rd"),
            (4, "th"),
            (11, "th"),
            (12, "th"),
            (13, "th"),
            (21, "st"),
            (22, "nd"),
            (23, "rd"),
            (31, "st"),
        ];
        for (day, suffix) in cases {
            assert_eq!(ordinal_suffix(day), suffix, "day {day}");
        }
    }

    #[test]
    fn summary_mentions_ordering() {
        let mut view = FeedView {
            total: 25,
            ..FeedView::default()
        };
        assert_eq!(view.summary(), "Showing 0 of 25 posts, sorted by date (newest first)");
        view.selected_tags = vec!["rust".into()];
        assert_eq!(view.summary(), "Showing 0 of 25 posts, ranked by 1 selected tag(s)");
    }
}
