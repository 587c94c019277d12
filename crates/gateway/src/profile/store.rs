//! In-memory profile storage keyed by generated id.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use super::Profile;

/// Thread-safe, cheaply cloneable profile store.
#[derive(Clone, Default)]
pub struct ProfileStore {
    inner: Arc<RwLock<HashMap<Uuid, Profile>>>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `profile` under a fresh id.
    pub async fn insert(&self, profile: Profile) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.write().await.insert(id, profile);
        id
    }

    pub async fn get(&self, id: &Uuid) -> Option<Profile> {
        self.inner.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Profile {
        Profile {
            name: "Ada".into(),
            phone: "555-0100".into(),
            emails: vec!["ada@example.com".into()],
            tags: Default::default(),
            attributes: Default::default(),
        }
    }

    #[tokio::test]
    async fn insert_then_get() {
        let store = ProfileStore::new();
        let id = store.insert(profile()).await;
        assert_eq!(store.get(&id).await, Some(profile()));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn unknown_id_is_none() {
        let store = ProfileStore::new();
        assert!(store.get(&Uuid::new_v4()).await.is_none());
    }
}
