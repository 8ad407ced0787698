use regex::{Regex, RegexBuilder};

use crate::post::Post;
use crate::selection::SelectionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    #[default]
    Pattern,
    Literal,
}

#[derive(Debug, Clone)]
pub enum SearchMatcher {
    Everything,
    Pattern(Regex),
    Literal(String),
}

impl SearchMatcher {
    pub fn new(text: &str, mode: SearchMode) -> Self {
        if text.is_empty() {
            return SearchMatcher::Everything;
        }
        if mode == SearchMode::Pattern {
            match RegexBuilder::new(text).case_insensitive(true).build() {
                Ok(regex) => return SearchMatcher::Pattern(regex),
                Err(err) => {
                    tracing::debug!(pattern = text, error = %err, "search text is not a pattern, matching literally");
                }
            }
        }
        SearchMatcher::Literal(text.to_lowercase())
    }

    pub fn is_match(&self, title: &str) -> bool {
        match self {
            SearchMatcher::Everything => true,
            SearchMatcher::Pattern(regex) => regex.is_match(title),
            SearchMatcher::Literal(needle) => title.to_lowercase().contains(needle.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranked<'a> {
    pub post: &'a Post,
    pub matching_tags: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ViewPipeline {
    search_mode: SearchMode,
}

impl ViewPipeline {
    pub fn new(search_mode: SearchMode) -> Self {
        Self { search_mode }
    }

    pub fn search_mode(&self) -> SearchMode {
        self.search_mode
    }

    /// Date order, then tag ranking, then title search, then truncation.
    pub fn run<'a>(
        &self,
        posts: &'a [Post],
        selection: &SelectionState,
        visible_count: usize,
    ) -> Vec<Ranked<'a>> {
        let selected = selection.selected_tags();
        let mut ranked: Vec<Ranked<'a>> = posts
            .iter()
            .map(|post| Ranked {
                post,
                matching_tags: post.matching_tags(selected),
            })
            .collect();

        let direction = selection.sort_direction();
        ranked.sort_by(|a, b| direction.apply(&a.post.created_at, &b.post.created_at));

        if !selected.is_empty() {
            ranked.sort_by(|a, b| {
                b.matching_tags
                    .cmp(&a.matching_tags)
                    .then_with(|| b.post.created_at.cmp(&a.post.created_at))
            });
        }

        let matcher = SearchMatcher::new(selection.search_text(), self.search_mode);
        if !matches!(matcher, SearchMatcher::Everything) {
            ranked.retain(|entry| matcher.is_match(&entry.post.title));
        }

        ranked.truncate(visible_count);
        ranked
    }
}
