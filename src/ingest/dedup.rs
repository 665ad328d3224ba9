use std::collections::HashSet;

/// Ids of posts that are fully captured (uploaded and persisted).
#[derive(Debug, Default)]
pub struct DedupStore {
    known: HashSet<String>,
}

impl DedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.known.extend(ids);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.known.contains(id)
    }

    /// Record `id` as captured. Only call once every side effect succeeded.
    pub fn add(&mut self, id: &str) {
        self.known.insert(id.to_string());
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}
