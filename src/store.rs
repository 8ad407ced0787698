use std::collections::HashSet;

use crate::post::{Post, PostId, RawPost};

#[derive(Debug, Clone, Default)]
pub struct PostStore {
    posts: Vec<Post>,
}

impl PostStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the contents. Source ids are kept only when every post has
    /// one and none repeat; otherwise posts are numbered by load position.
    pub fn load(&mut self, raw: Vec<RawPost>) {
        let keep_source_ids = source_ids_are_usable(&raw);
        self.posts = raw
            .into_iter()
            .enumerate()
            .map(|(index, post)| {
                let id = match (keep_source_ids, post.source_id) {
                    (true, Some(id)) => id,
                    _ => index as u64,
                };
                post.into_post(PostId(id))
            })
            .collect();
    }

    pub fn remove(&mut self, id: PostId) -> bool {
        match self.posts.iter().position(|post| post.id == id) {
            Some(index) => {
                self.posts.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn all(&self) -> &[Post] {
        &self.posts
    }

    pub fn get(&self, id: PostId) -> Option<&Post> {
        self.posts.iter().find(|post| post.id == id)
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn tag_vocabulary(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut tags = Vec::new();
        for tag in self.posts.iter().flat_map(|post| post.tags.iter()) {
            if seen.insert(tag.as_str()) {
                tags.push(tag.clone());
            }
        }
        tags
    }
}

fn source_ids_are_usable(raw: &[RawPost]) -> bool {
    let mut seen = HashSet::new();
    raw.iter()
        .all(|post| matches!(post.source_id, Some(id) if seen.insert(id)))
}
