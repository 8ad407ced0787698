use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SortDirection {
    #[serde(rename = "asc")]
    Ascending,
    #[default]
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "oldest first",
            SortDirection::Descending => "newest first",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    /// Orders two keys so that a stable sort yields this direction.
    pub fn apply<T: Ord>(&self, a: &T, b: &T) -> Ordering {
        match self {
            SortDirection::Ascending => a.cmp(b),
            SortDirection::Descending => b.cmp(a),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected_tags: Vec<String>,
    sort_direction: SortDirection,
    search_text: String,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_tags(&self) -> &[String] {
        &self.selected_tags
    }

    pub fn is_selected(&self, tag: &str) -> bool {
        self.selected_tags.iter().any(|selected| selected == tag)
    }

    pub fn sort_direction(&self) -> SortDirection {
        self.sort_direction
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn toggle_tag(&mut self, tag: &str) -> bool {
        match self.selected_tags.iter().position(|selected| selected == tag) {
            Some(index) => {
                self.selected_tags.remove(index);
                false
            }
            None => {
                self.selected_tags.push(tag.to_string());
                true
            }
        }
    }

    pub fn set_sort_direction(&mut self, direction: SortDirection) {
        self.sort_direction = direction;
        self.selected_tags.clear();
    }

    pub fn toggle_sort_direction(&mut self) -> SortDirection {
        let next = self.sort_direction.toggled();
        self.set_sort_direction(next);
        next
    }

    pub fn set_search_text<S: Into<String>>(&mut self, text: S) {
        self.search_text = text.into();
    }

    pub fn seed_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_tags.clear();
        for tag in tags {
            let tag = tag.into();
            if !self.is_selected(&tag) {
                self.selected_tags.push(tag);
            }
        }
    }

    pub fn seed_sort_direction(&mut self, direction: SortDirection) {
        self.sort_direction = direction;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_newest_first_without_tags() {
        let state = SelectionState::new();
        assert_eq!(state.sort_direction(), SortDirection::Descending);
        assert!(state.selected_tags().is_empty());
        assert_eq!(state.search_text(), "");
    }

    #[test]
    fn toggling_adds_once_and_removes() {
        let mut state = SelectionState::new();
        assert!(state.toggle_tag("rust"));
        assert!(state.toggle_tag("tui"));
        assert_eq!(state.selected_tags(), ["rust", "tui"]);
        assert!(!state.toggle_tag("rust"));
        assert_eq!(state.selected_tags(), ["tui"]);
        assert!(!state.toggle_tag("tui"));
        assert!(state.selected_tags().is_empty());
    }

    #[test]
    fn changing_direction_clears_tags() {
        let mut state = SelectionState::new();
        state.toggle_tag("rust");
        state.set_search_text("hello");
        assert_eq!(state.toggle_sort_direction(), SortDirection::Ascending);
        assert!(state.selected_tags().is_empty());
        assert_eq!(state.search_text(), "hello");

        state.toggle_tag("rust");
        state.set_sort_direction(SortDirection::Ascending);
        assert!(state.selected_tags().is_empty());
    }

    #[test]
    fn search_text_leaves_tags_alone() {
        let mut state = SelectionState::new();
        state.toggle_tag("rust");
        state.set_search_text("x");
        assert_eq!(state.selected_tags(), ["rust"]);
        assert_eq!(state.sort_direction(), SortDirection::Descending);
    }

    #[test]
    fn seeding_tags_drops_duplicates() {
        let mut state = SelectionState::new();
        state.seed_tags(["a", "b", "a"]);
        assert_eq!(state.selected_tags(), ["a", "b"]);
    }

    #[test]
    fn direction_serializes_like_stored_preference() {
        assert_eq!(
            serde_json::to_string(&SortDirection::Ascending).unwrap(),
            "\"asc\""
        );
        let parsed: SortDirection = serde_json::from_str("\"desc\"").unwrap();
        assert_eq!(parsed, SortDirection::Descending);
    }
}
