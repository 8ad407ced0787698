use anyhow::Result;

use crate::pagination::{PaginationController, PAGE_SIZE};
use crate::pipeline::{SearchMode, ViewPipeline};
use crate::post::{PostId, RawPost};
use crate::preferences::{Preference, PreferenceError, PreferenceStore};
use crate::selection::{SelectionState, SortDirection};
use crate::store::PostStore;
use crate::view::{FeedView, ViewRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Pending,
    Loaded(usize),
    Failed(String),
}

pub struct Controller {
    store: PostStore,
    selection: SelectionState,
    pagination: PaginationController,
    pipeline: ViewPipeline,
    preferences: Box<dyn PreferenceStore>,
    load_state: LoadState,
}

impl Controller {
    pub fn new(preferences: Box<dyn PreferenceStore>, search_mode: SearchMode) -> Self {
        Self {
            store: PostStore::new(),
            selection: SelectionState::new(),
            pagination: PaginationController::new(),
            pipeline: ViewPipeline::new(search_mode),
            preferences,
            load_state: LoadState::Pending,
        }
    }

    pub fn store(&self) -> &PostStore {
        &self.store
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn pagination(&self) -> &PaginationController {
        &self.pagination
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn start(&mut self) {
        match self.preferences.load() {
            Ok(Some(Preference::ByTags(tags))) => {
                tracing::debug!(?tags, "restoring selected tags");
                self.selection.seed_tags(tags);
            }
            Ok(Some(Preference::ByDate(direction))) => {
                tracing::debug!(direction = direction.as_str(), "restoring sort direction");
                self.selection.seed_sort_direction(direction);
            }
            Ok(None) => {}
            Err(PreferenceError::Parse(err)) => {
                tracing::warn!(error = %err, "ignoring corrupt stored preference");
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not read stored preference");
            }
        }
    }

    /// A failed load keeps whatever was already loaded, so a failed first
    /// load leaves an empty feed and a failed reload keeps the old posts.
    pub fn load_posts(&mut self, result: Result<Vec<RawPost>>) {
        match result {
            Ok(posts) => {
                self.store.load(posts);
                tracing::info!(count = self.store.len(), "posts loaded");
                self.load_state = LoadState::Loaded(self.store.len());
            }
            Err(err) => {
                let message = format!("{err:#}");
                tracing::warn!(error = %message, kept = self.store.len(), "failed to load posts");
                self.load_state = LoadState::Failed(message);
            }
        }
    }

    pub fn toggle_tag(&mut self, tag: &str) -> bool {
        let selected = self.selection.toggle_tag(tag);
        self.pagination.reset();
        let preference = if self.selection.selected_tags().is_empty() {
            Preference::ByDate(self.selection.sort_direction())
        } else {
            Preference::ByTags(self.selection.selected_tags().to_vec())
        };
        self.persist(&preference);
        tracing::debug!(tag, selected, "tag toggled");
        selected
    }

    pub fn toggle_sort(&mut self) -> SortDirection {
        let next = self.selection.sort_direction().toggled();
        self.set_sort_direction(next);
        next
    }

    pub fn set_sort_direction(&mut self, direction: SortDirection) {
        self.selection.set_sort_direction(direction);
        self.pagination.reset();
        self.persist(&Preference::ByDate(direction));
        tracing::debug!(direction = direction.as_str(), "sort direction set");
    }

    pub fn set_search_text<S: Into<String>>(&mut self, text: S) {
        self.selection.set_search_text(text);
    }

    /// Returns true when the visible set may have changed. Growth stops one
    /// page past the total.
    pub fn on_near_bottom(&mut self, remaining: u32) -> bool {
        let before = self.pagination.visible_count();
        if before >= self.store.len() + PAGE_SIZE {
            return false;
        }
        let grew = self.pagination.on_near_bottom(remaining);
        if grew {
            tracing::debug!(
                remaining,
                visible = self.pagination.visible_count(),
                "revealed another page"
            );
        }
        grew && before < self.store.len()
    }

    pub fn delete(&mut self, id: PostId) -> bool {
        let removed = self.store.remove(id);
        tracing::debug!(%id, removed, "delete requested");
        removed
    }

    pub fn show_less(&mut self) -> bool {
        if !self.pagination.is_expanded() {
            return false;
        }
        self.pagination.reset();
        true
    }

    pub fn view(&self) -> FeedView {
        let total = self.store.len();
        let visible_count = self.pagination.visible_count();
        let posts = self
            .pipeline
            .run(self.store.all(), &self.selection, visible_count)
            .iter()
            .map(ViewRecord::from_ranked)
            .collect();

        FeedView {
            posts,
            tags: self.store.tag_vocabulary(),
            selected_tags: self.selection.selected_tags().to_vec(),
            sort_direction: self.selection.sort_direction(),
            search_text: self.selection.search_text().to_string(),
            total,
            visible_count,
            exhausted: self.pagination.is_exhausted(total),
            expanded: self.pagination.is_expanded(),
        }
    }

    fn persist(&self, preference: &Preference) {
        if let Err(err) = self.preferences.save(preference) {
            tracing::warn!(error = %err, "could not store preference");
        }
    }
}
