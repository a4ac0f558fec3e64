//! Id-keyed user directory.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use crate::domain::{Contact, User, UserId};
use crate::error::{ChatError, Result};

/// Directory of registered users, keyed by id.
///
/// Ids are monotonic, so the `BTreeMap` iteration order is also registration
/// order. Reads hand out clones; callers never see live views.
pub struct UserDirectory {
    users: RwLock<BTreeMap<UserId, User>>,
    next_user_id: AtomicU64,
    next_contact_id: AtomicU64,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(BTreeMap::new()),
            next_user_id: AtomicU64::new(1),
            next_contact_id: AtomicU64::new(1),
        }
    }

    /// Create a user with a freshly allocated id
    pub async fn create_user(&self, username: &str) -> Result<User> {
        let name = username.trim();
        if name.is_empty() {
            return Err(ChatError::validation("Username must not be empty"));
        }

        let id = self.next_user_id.fetch_add(1, Ordering::Relaxed);
        let user = User::new(id, name.to_string());
        self.users.write().await.insert(id, user.clone());
        Ok(user)
    }

    /// Get a user by id
    pub async fn get_user(&self, user_id: UserId) -> Result<User> {
        self.users
            .read()
            .await
            .get(&user_id)
            .cloned()
            .ok_or_else(|| ChatError::user_not_found(format!("userId={}", user_id)))
    }

    /// Display name for a user, if they exist
    pub async fn username(&self, user_id: UserId) -> Option<String> {
        self.users
            .read()
            .await
            .get(&user_id)
            .map(|u| u.username.clone())
    }

    pub async fn contains(&self, user_id: UserId) -> bool {
        self.users.read().await.contains_key(&user_id)
    }

    /// All users in registration order
    pub async fn list_users(&self) -> Vec<User> {
        self.users.read().await.values().cloned().collect()
    }

    /// Change a user's display name
    pub async fn rename_user(&self, user_id: UserId, new_name: &str) -> Result<()> {
        let name = new_name.trim();
        if name.is_empty() {
            return Err(ChatError::validation("Username must not be empty"));
        }

        let mut users = self.users.write().await;
        let user = users
            .get_mut(&user_id)
            .ok_or_else(|| ChatError::user_not_found(format!("userId={}", user_id)))?;
        user.username = name.to_string();
        Ok(())
    }

    /// Remove a user record. Chat membership cleanup is the chat directory's
    /// job; use `ChatDirectory::delete_user` for the full operation.
    pub(crate) async fn remove(&self, user_id: UserId) -> Result<User> {
        self.users
            .write()
            .await
            .remove(&user_id)
            .ok_or_else(|| ChatError::user_not_found(format!("userId={}", user_id)))
    }

    /// Add or re-alias a contact in `owner_id`'s contact list
    pub async fn add_contact(
        &self,
        owner_id: UserId,
        target_id: UserId,
        alias: &str,
    ) -> Result<Contact> {
        let alias = alias.trim();
        if alias.is_empty() {
            return Err(ChatError::validation("Alias must not be empty"));
        }

        let mut users = self.users.write().await;
        if !users.contains_key(&target_id) {
            return Err(ChatError::user_not_found(format!("userId={}", target_id)));
        }
        let owner = users
            .get_mut(&owner_id)
            .ok_or_else(|| ChatError::user_not_found(format!("userId={}", owner_id)))?;

        let contact = Contact {
            id: self.next_contact_id.fetch_add(1, Ordering::Relaxed),
            target_id,
            alias: alias.to_string(),
        };
        owner.upsert_contact(contact.clone());
        Ok(contact)
    }

    pub async fn list_contacts(&self, owner_id: UserId) -> Result<Vec<Contact>> {
        Ok(self.get_user(owner_id).await?.contacts().to_vec())
    }

    /// Remove the contact pointing at `target_id`; returns whether one existed
    pub async fn remove_contact(&self, owner_id: UserId, target_id: UserId) -> Result<bool> {
        let mut users = self.users.write().await;
        let owner = users
            .get_mut(&owner_id)
            .ok_or_else(|| ChatError::user_not_found(format!("userId={}", owner_id)))?;
        Ok(owner.remove_contact(target_id))
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }
}

impl Default for UserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_user_allocates_monotonic_ids() {
        let users = UserDirectory::new();

        let alice = users.create_user("alice").await.unwrap();
        let bob = users.create_user("bob").await.unwrap();

        assert_eq!(alice.id, 1);
        assert_eq!(bob.id, 2);
        assert_eq!(users.user_count().await, 2);

        let listed: Vec<_> = users
            .list_users()
            .await
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(listed, vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn test_create_user_rejects_blank_name() {
        let users = UserDirectory::new();
        let err = users.create_user("   ").await.unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
    }

    #[tokio::test]
    async fn test_get_unknown_user() {
        let users = UserDirectory::new();
        let err = users.get_user(7).await.unwrap_err();
        assert!(matches!(err, ChatError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn test_rename_user() {
        let users = UserDirectory::new();
        let alice = users.create_user("alice").await.unwrap();

        users.rename_user(alice.id, "alicia").await.unwrap();
        assert_eq!(users.get_user(alice.id).await.unwrap().username, "alicia");

        let err = users.rename_user(alice.id, "").await.unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
    }

    #[tokio::test]
    async fn test_contacts_roundtrip() {
        let users = UserDirectory::new();
        let alice = users.create_user("alice").await.unwrap();
        let bob = users.create_user("bob").await.unwrap();

        users.add_contact(alice.id, bob.id, "bobby").await.unwrap();
        users
            .add_contact(alice.id, bob.id, "robert")
            .await
            .unwrap();

        let contacts = users.list_contacts(alice.id).await.unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].alias, "robert");

        assert!(users.remove_contact(alice.id, bob.id).await.unwrap());
        assert!(!users.remove_contact(alice.id, bob.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_add_contact_requires_existing_target() {
        let users = UserDirectory::new();
        let alice = users.create_user("alice").await.unwrap();

        let err = users.add_contact(alice.id, 42, "ghost").await.unwrap_err();
        assert!(matches!(err, ChatError::UserNotFound(_)));
    }
}
