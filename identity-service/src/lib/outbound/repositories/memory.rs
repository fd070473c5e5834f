use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::user::models::Credential;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::ports::CredentialRepository;
use crate::domain::user::ports::UserRepository;
use crate::user::errors::UserError;

#[derive(Debug, Default)]
struct Directory {
    /// Map of user_id -> User
    users: HashMap<UserId, User>,
    /// Map of normalized email -> user_id, only for users with an email
    emails: HashMap<String, UserId>,
}

/// User directory held in process memory.
///
/// Used when no database is configured and in tests. Email uniqueness is
/// checked and claimed under the same write lock, so concurrent inserts of
/// one address cannot both succeed.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    directory: RwLock<Directory>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> Result<User, UserError> {
        let mut directory = self.directory.write().await;

        if let Some(email) = &user.email {
            if directory.emails.contains_key(email.as_str()) {
                return Err(UserError::EmailAlreadyUsed(email.to_string()));
            }
            directory.emails.insert(email.to_string(), user.id);
        }
        directory.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError> {
        Ok(self.directory.read().await.users.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        let directory = self.directory.read().await;

        Ok(directory
            .emails
            .get(email)
            .and_then(|id| directory.users.get(id))
            .cloned())
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, UserError> {
        Ok(self.directory.read().await.emails.contains_key(email))
    }

    async fn update(&self, mut user: User) -> Result<User, UserError> {
        let mut directory = self.directory.write().await;

        let previous_email = match directory.users.get(&user.id) {
            Some(existing) => existing.email.clone(),
            None => return Err(UserError::NotFound(user.id.to_string())),
        };

        if user.email != previous_email {
            if let Some(email) = &user.email {
                if directory.emails.contains_key(email.as_str()) {
                    return Err(UserError::EmailAlreadyUsed(email.to_string()));
                }
                directory.emails.insert(email.to_string(), user.id);
            }
            if let Some(email) = previous_email {
                directory.emails.remove(email.as_str());
            }
        }

        user.touch();
        directory.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn delete(&self, id: &UserId) -> Result<(), UserError> {
        let mut directory = self.directory.write().await;

        let user = directory
            .users
            .remove(id)
            .ok_or(UserError::NotFound(id.to_string()))?;
        if let Some(email) = user.email {
            directory.emails.remove(email.as_str());
        }

        Ok(())
    }
}

/// Credential store held in process memory, keyed by user id.
#[derive(Debug, Default)]
pub struct InMemoryCredentialRepository {
    credentials: RwLock<HashMap<UserId, Credential>>,
}

impl InMemoryCredentialRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialRepository for InMemoryCredentialRepository {
    async fn create(&self, credential: Credential) -> Result<Credential, UserError> {
        let mut credentials = self.credentials.write().await;

        if credentials.contains_key(&credential.user_id) {
            return Err(UserError::CredentialAlreadyExists(
                credential.user_id.to_string(),
            ));
        }
        credentials.insert(credential.user_id, credential.clone());

        Ok(credential)
    }

    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Option<Credential>, UserError> {
        Ok(self.credentials.read().await.get(user_id).cloned())
    }

    async fn update(&self, mut credential: Credential) -> Result<Credential, UserError> {
        let mut credentials = self.credentials.write().await;

        let Some(stored) = credentials.get_mut(&credential.user_id) else {
            return Err(UserError::NotFound(credential.user_id.to_string()));
        };
        credential.touch();
        *stored = credential.clone();

        Ok(credential)
    }

    async fn delete(&self, user_id: &UserId) -> Result<(), UserError> {
        self.credentials
            .write()
            .await
            .remove(user_id)
            .map(|_| ())
            .ok_or(UserError::NotFound(user_id.to_string()))
    }
}
