use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;

use crate::domain::user::models::Credential;
use crate::domain::user::models::LoginCommand;
use crate::domain::user::models::RegisterCommand;
use crate::domain::user::models::Session;
use crate::domain::user::models::UpdateProfileCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::user::errors::UserError;
use crate::user::ports::CredentialRepository;
use crate::user::ports::PasswordHasher;
use crate::user::ports::TokenIssuer;
use crate::user::ports::UserRepository;
use crate::user::ports::UserServicePort;

/// Lifetime of tokens issued on login.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// Domain service implementation for registration, login and profiles.
///
/// Concrete implementation of UserServicePort with dependency injection.
/// Holds no mutable state of its own; concurrency safety comes from the
/// injected handles.
pub struct UserService<UR, CR, PH, TI>
where
    UR: UserRepository,
    CR: CredentialRepository,
    PH: PasswordHasher,
    TI: TokenIssuer,
{
    users: Arc<UR>,
    credentials: Arc<CR>,
    password_hasher: Arc<PH>,
    token_issuer: Arc<TI>,
    session_ttl: Duration,
}

impl<UR, CR, PH, TI> UserService<UR, CR, PH, TI>
where
    UR: UserRepository,
    CR: CredentialRepository,
    PH: PasswordHasher,
    TI: TokenIssuer,
{
    /// Create a new user service with injected dependencies.
    ///
    /// # Arguments
    /// * `users` - User directory implementation
    /// * `credentials` - Credential store implementation
    /// * `password_hasher` - Password hashing strategy
    /// * `token_issuer` - Session token issuer
    ///
    /// # Returns
    /// Service issuing 24 hour sessions
    pub fn new(
        users: Arc<UR>,
        credentials: Arc<CR>,
        password_hasher: Arc<PH>,
        token_issuer: Arc<TI>,
    ) -> Self {
        Self {
            users,
            credentials,
            password_hasher,
            token_issuer,
            session_ttl: Duration::hours(DEFAULT_SESSION_TTL_HOURS),
        }
    }

    /// Override the lifetime of issued sessions.
    pub fn with_session_ttl(mut self, session_ttl: Duration) -> Self {
        self.session_ttl = session_ttl;
        self
    }
}

#[async_trait]
impl<UR, CR, PH, TI> UserServicePort for UserService<UR, CR, PH, TI>
where
    UR: UserRepository,
    CR: CredentialRepository,
    PH: PasswordHasher,
    TI: TokenIssuer,
{
    async fn register(&self, command: RegisterCommand) -> Result<User, UserError> {
        // Fast path only. Two concurrent registrations can both pass this
        // check; the repository's unique constraint rejects the second insert.
        if let Some(email) = &command.email {
            if self.users.exists_by_email(email.as_str()).await? {
                return Err(UserError::EmailAlreadyUsed(email.to_string()));
            }
        }

        let user = self
            .users
            .create(User::new(command.display_name, command.email))
            .await?;

        let password_hash = self.password_hasher.hash(&command.password)?;
        self.credentials
            .create(Credential::new(user.id, password_hash))
            .await?;

        tracing::info!(user_id = %user.id, "User registered");

        Ok(user)
    }

    async fn login(&self, command: LoginCommand) -> Result<Session, UserError> {
        // Every rejection path runs one hash comparison so response time
        // does not reveal whether the account exists.
        if command.email.is_empty() {
            self.password_hasher.compare_dummy(&command.password);
            return Err(UserError::InvalidCredentials);
        }

        let Some(user) = self.users.find_by_email(&command.email).await? else {
            self.password_hasher.compare_dummy(&command.password);
            tracing::debug!("Login rejected: unknown email");
            return Err(UserError::InvalidCredentials);
        };

        let password_matches = match self.credentials.find_by_user_id(&user.id).await? {
            Some(credential) => self
                .password_hasher
                .compare(&credential.password_hash, &command.password),
            None => {
                self.password_hasher.compare_dummy(&command.password);
                false
            }
        };

        if !password_matches {
            tracing::debug!(user_id = %user.id, "Login rejected: credential mismatch");
            return Err(UserError::InvalidCredentials);
        }

        let session =
            self.token_issuer
                .issue(&user.id.to_string(), self.session_ttl, HashMap::new())?;

        tracing::info!(user_id = %user.id, expires_at = %session.expires_at, "User logged in");

        Ok(session)
    }

    async fn logout(&self, user_id: &UserId) -> Result<(), UserError> {
        tracing::info!(user_id = %user_id, "User logged out");
        Ok(())
    }

    async fn get_profile(&self, id: &UserId) -> Result<User, UserError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id.to_string()))
    }

    async fn update_profile(
        &self,
        id: &UserId,
        command: UpdateProfileCommand,
    ) -> Result<User, UserError> {
        let mut user = self
            .users
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id.to_string()))?;

        if let Some(display_name) = command.display_name {
            user.display_name = display_name;
        }

        if let Some(avatar_url) = command.avatar_url {
            user.avatar_url = Some(avatar_url).filter(|url| !url.is_empty());
        }

        let updated_user = self.users.update(user).await?;
        tracing::info!(user_id = %updated_user.id, "Profile updated");

        Ok(updated_user)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use mockall::mock;
    use mockall::predicate::*;

    use super::*;
    use crate::domain::user::models::DisplayName;
    use crate::domain::user::models::EmailAddress;
    use crate::domain::user::models::TokenClaims;
    use crate::user::errors::PasswordError;
    use crate::user::errors::TokenError;

    // Define mocks in the test module using mockall
    mock! {
        pub TestUserRepository {}

        #[async_trait]
        impl UserRepository for TestUserRepository {
            async fn create(&self, user: User) -> Result<User, UserError>;
            async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError>;
            async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError>;
            async fn exists_by_email(&self, email: &str) -> Result<bool, UserError>;
            async fn update(&self, user: User) -> Result<User, UserError>;
            async fn delete(&self, id: &UserId) -> Result<(), UserError>;
        }
    }

    mock! {
        pub TestCredentialRepository {}

        #[async_trait]
        impl CredentialRepository for TestCredentialRepository {
            async fn create(&self, credential: Credential) -> Result<Credential, UserError>;
            async fn find_by_user_id(&self, user_id: &UserId) -> Result<Option<Credential>, UserError>;
            async fn update(&self, credential: Credential) -> Result<Credential, UserError>;
            async fn delete(&self, user_id: &UserId) -> Result<(), UserError>;
        }
    }

    mock! {
        pub TestPasswordHasher {}

        impl PasswordHasher for TestPasswordHasher {
            fn hash(&self, password: &str) -> Result<String, PasswordError>;
            fn compare(&self, stored_hash: &str, password: &str) -> bool;
            fn compare_dummy(&self, password: &str);
        }
    }

    mock! {
        pub TestTokenIssuer {}

        impl TokenIssuer for TestTokenIssuer {
            fn issue(
                &self,
                subject: &str,
                ttl: Duration,
                custom: HashMap<String, serde_json::Value>,
            ) -> Result<Session, TokenError>;
            fn parse_and_verify(&self, token: &str) -> Result<TokenClaims, TokenError>;
        }
    }

    type TestService = UserService<
        MockTestUserRepository,
        MockTestCredentialRepository,
        MockTestPasswordHasher,
        MockTestTokenIssuer,
    >;

    fn service(
        users: MockTestUserRepository,
        credentials: MockTestCredentialRepository,
        hasher: MockTestPasswordHasher,
        issuer: MockTestTokenIssuer,
    ) -> TestService {
        UserService::new(
            Arc::new(users),
            Arc::new(credentials),
            Arc::new(hasher),
            Arc::new(issuer),
        )
    }

    fn alice() -> User {
        User::new(
            DisplayName::new("Alice".to_string()).unwrap(),
            Some(EmailAddress::new("alice@example.com").unwrap()),
        )
    }

    fn register_command(email: &str) -> RegisterCommand {
        RegisterCommand::new("Alice".to_string(), email, "password123".to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_register_success() {
        let mut users = MockTestUserRepository::new();
        let mut credentials = MockTestCredentialRepository::new();
        let mut hasher = MockTestPasswordHasher::new();
        let issuer = MockTestTokenIssuer::new();

        users
            .expect_exists_by_email()
            .with(eq("alice@example.com"))
            .times(1)
            .returning(|_| Ok(false));
        users
            .expect_create()
            .withf(|user| {
                user.display_name.as_str() == "Alice" && user.email_str() == "alice@example.com"
            })
            .times(1)
            .returning(Ok);
        hasher
            .expect_hash()
            .with(eq("password123"))
            .times(1)
            .returning(|_| Ok("$argon2id$hash".to_string()));
        credentials
            .expect_create()
            .withf(|credential| credential.password_hash == "$argon2id$hash")
            .times(1)
            .returning(Ok);

        let service = service(users, credentials, hasher, issuer);

        let user = service
            .register(register_command(" Alice@Example.com "))
            .await
            .unwrap();

        assert_eq!(user.display_name.as_str(), "Alice");
        assert_eq!(user.email_str(), "alice@example.com");
        assert!(!user.id.to_string().is_empty());
    }

    #[tokio::test]
    async fn test_register_credential_is_linked_to_user() {
        let mut users = MockTestUserRepository::new();
        let mut credentials = MockTestCredentialRepository::new();
        let mut hasher = MockTestPasswordHasher::new();

        users.expect_exists_by_email().returning(|_| Ok(false));
        let created = alice();
        let created_id = created.id;
        users
            .expect_create()
            .returning(move |_| Ok(created.clone()));
        hasher
            .expect_hash()
            .returning(|_| Ok("$argon2id$hash".to_string()));
        credentials
            .expect_create()
            .withf(move |credential| credential.user_id == created_id)
            .times(1)
            .returning(Ok);

        let service = service(users, credentials, hasher, MockTestTokenIssuer::new());

        let user = service
            .register(register_command("alice@example.com"))
            .await
            .unwrap();
        assert_eq!(user.id, created_id);
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let mut users = MockTestUserRepository::new();
        let mut credentials = MockTestCredentialRepository::new();
        let mut hasher = MockTestPasswordHasher::new();

        users.expect_exists_by_email().returning(|_| Ok(true));
        users.expect_create().times(0);
        hasher.expect_hash().times(0);
        credentials.expect_create().times(0);

        let service = service(users, credentials, hasher, MockTestTokenIssuer::new());

        let result = service.register(register_command("alice@example.com")).await;
        assert!(matches!(result, Err(UserError::EmailAlreadyUsed(_))));
    }

    #[tokio::test]
    async fn test_register_lost_race_surfaces_conflict() {
        let mut users = MockTestUserRepository::new();
        let mut credentials = MockTestCredentialRepository::new();
        let mut hasher = MockTestPasswordHasher::new();

        // Pre-check passes, the store's constraint rejects the insert.
        users.expect_exists_by_email().returning(|_| Ok(false));
        users
            .expect_create()
            .returning(|user| Err(UserError::EmailAlreadyUsed(user.email_str().to_string())));
        hasher.expect_hash().times(0);
        credentials.expect_create().times(0);

        let service = service(users, credentials, hasher, MockTestTokenIssuer::new());

        let result = service.register(register_command("alice@example.com")).await;
        assert!(matches!(result, Err(UserError::EmailAlreadyUsed(_))));
    }

    #[tokio::test]
    async fn test_register_without_email_skips_uniqueness_check() {
        let mut users = MockTestUserRepository::new();
        let mut credentials = MockTestCredentialRepository::new();
        let mut hasher = MockTestPasswordHasher::new();

        users.expect_exists_by_email().times(0);
        users
            .expect_create()
            .withf(|user| user.email.is_none())
            .times(1)
            .returning(Ok);
        hasher
            .expect_hash()
            .returning(|_| Ok("$argon2id$hash".to_string()));
        credentials.expect_create().times(1).returning(Ok);

        let service = service(users, credentials, hasher, MockTestTokenIssuer::new());

        let user = service.register(register_command("  ")).await.unwrap();
        assert_eq!(user.email_str(), "");
    }

    #[tokio::test]
    async fn test_register_hashing_failure() {
        let mut users = MockTestUserRepository::new();
        let mut credentials = MockTestCredentialRepository::new();
        let mut hasher = MockTestPasswordHasher::new();

        users.expect_exists_by_email().returning(|_| Ok(false));
        users.expect_create().returning(Ok);
        hasher
            .expect_hash()
            .returning(|_| Err(PasswordError::HashingFailed("boom".to_string())));
        credentials.expect_create().times(0);

        let service = service(users, credentials, hasher, MockTestTokenIssuer::new());

        let result = service.register(register_command("alice@example.com")).await;
        assert!(matches!(result, Err(UserError::Password(_))));
    }

    #[tokio::test]
    async fn test_register_storage_failure() {
        let mut users = MockTestUserRepository::new();

        users
            .expect_exists_by_email()
            .returning(|_| Err(UserError::DatabaseError("connection reset".to_string())));

        let service = service(
            users,
            MockTestCredentialRepository::new(),
            MockTestPasswordHasher::new(),
            MockTestTokenIssuer::new(),
        );

        let result = service.register(register_command("alice@example.com")).await;
        assert!(matches!(result, Err(UserError::DatabaseError(_))));
    }

    #[tokio::test]
    async fn test_login_success() {
        let user = alice();
        let user_id = user.id;
        let expires_at = Utc::now() + Duration::hours(24);

        let mut users = MockTestUserRepository::new();
        let mut credentials = MockTestCredentialRepository::new();
        let mut hasher = MockTestPasswordHasher::new();
        let mut issuer = MockTestTokenIssuer::new();

        users
            .expect_find_by_email()
            .with(eq("alice@example.com"))
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));
        credentials
            .expect_find_by_user_id()
            .with(eq(user_id))
            .times(1)
            .returning(|id| Ok(Some(Credential::new(*id, "stored".to_string()))));
        hasher
            .expect_compare()
            .with(eq("stored"), eq("password123"))
            .times(1)
            .returning(|_, _| true);
        issuer
            .expect_issue()
            .withf(move |subject, ttl, custom| {
                subject == user_id.to_string()
                    && *ttl == Duration::hours(24)
                    && custom.is_empty()
            })
            .times(1)
            .returning(move |_, _, _| {
                Ok(Session {
                    token: "signed.token.value".to_string(),
                    expires_at,
                })
            });

        let service = service(users, credentials, hasher, issuer);

        let session = service
            .login(LoginCommand::new(" ALICE@example.com", "password123".to_string()))
            .await
            .unwrap();

        assert_eq!(session.token, "signed.token.value");
        assert_eq!(session.expires_at, expires_at);
    }

    #[tokio::test]
    async fn test_login_uses_configured_ttl() {
        let user = alice();
        let mut users = MockTestUserRepository::new();
        let mut credentials = MockTestCredentialRepository::new();
        let mut hasher = MockTestPasswordHasher::new();
        let mut issuer = MockTestTokenIssuer::new();

        users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));
        credentials
            .expect_find_by_user_id()
            .returning(|id| Ok(Some(Credential::new(*id, "stored".to_string()))));
        hasher.expect_compare().returning(|_, _| true);
        issuer
            .expect_issue()
            .withf(|_, ttl, _| *ttl == Duration::minutes(5))
            .times(1)
            .returning(|_, ttl, _| {
                Ok(Session {
                    token: "t".to_string(),
                    expires_at: Utc::now() + ttl,
                })
            });

        let service =
            service(users, credentials, hasher, issuer).with_session_ttl(Duration::minutes(5));

        assert!(service
            .login(LoginCommand::new("alice@example.com", "password123".to_string()))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_login_wrong_password_and_unknown_email_are_indistinguishable() {
        let user = alice();

        let mut users = MockTestUserRepository::new();
        let mut credentials = MockTestCredentialRepository::new();
        let mut hasher = MockTestPasswordHasher::new();
        let mut issuer = MockTestTokenIssuer::new();

        users
            .expect_find_by_email()
            .with(eq("alice@example.com"))
            .returning(move |_| Ok(Some(user.clone())));
        users
            .expect_find_by_email()
            .with(eq("nobody@example.com"))
            .returning(|_| Ok(None));
        credentials
            .expect_find_by_user_id()
            .returning(|id| Ok(Some(Credential::new(*id, "stored".to_string()))));
        hasher.expect_compare().times(1).returning(|_, _| false);
        hasher
            .expect_compare_dummy()
            .with(eq("password123"))
            .times(1)
            .return_const(());
        issuer.expect_issue().times(0);

        let service = service(users, credentials, hasher, issuer);

        let wrong_password = service
            .login(LoginCommand::new("alice@example.com", "wrong".to_string()))
            .await
            .unwrap_err();
        let unknown_email = service
            .login(LoginCommand::new("nobody@example.com", "password123".to_string()))
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, UserError::InvalidCredentials));
        assert!(matches!(unknown_email, UserError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn test_login_without_credential() {
        let user = alice();
        let mut users = MockTestUserRepository::new();
        let mut credentials = MockTestCredentialRepository::new();
        let mut hasher = MockTestPasswordHasher::new();
        let mut issuer = MockTestTokenIssuer::new();

        users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));
        credentials.expect_find_by_user_id().returning(|_| Ok(None));
        hasher.expect_compare().times(0);
        hasher.expect_compare_dummy().times(1).return_const(());
        issuer.expect_issue().times(0);

        let service = service(users, credentials, hasher, issuer);

        let result = service
            .login(LoginCommand::new("alice@example.com", "password123".to_string()))
            .await;
        assert!(matches!(result, Err(UserError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_blank_email() {
        let mut users = MockTestUserRepository::new();
        let mut hasher = MockTestPasswordHasher::new();
        users.expect_find_by_email().times(0);
        hasher.expect_compare_dummy().times(1).return_const(());

        let service = service(
            users,
            MockTestCredentialRepository::new(),
            hasher,
            MockTestTokenIssuer::new(),
        );

        let result = service
            .login(LoginCommand::new("   ", "password123".to_string()))
            .await;
        assert!(matches!(result, Err(UserError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_signing_failure() {
        let user = alice();
        let mut users = MockTestUserRepository::new();
        let mut credentials = MockTestCredentialRepository::new();
        let mut hasher = MockTestPasswordHasher::new();
        let mut issuer = MockTestTokenIssuer::new();

        users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));
        credentials
            .expect_find_by_user_id()
            .returning(|id| Ok(Some(Credential::new(*id, "stored".to_string()))));
        hasher.expect_compare().returning(|_, _| true);
        issuer
            .expect_issue()
            .returning(|_, _, _| Err(TokenError::SigningFailed("bad key".to_string())));

        let service = service(users, credentials, hasher, issuer);

        let result = service
            .login(LoginCommand::new("alice@example.com", "password123".to_string()))
            .await;
        assert!(matches!(result, Err(UserError::Token(_))));
    }

    #[tokio::test]
    async fn test_logout_is_noop() {
        let service = service(
            MockTestUserRepository::new(),
            MockTestCredentialRepository::new(),
            MockTestPasswordHasher::new(),
            MockTestTokenIssuer::new(),
        );

        assert!(service.logout(&UserId::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_get_profile_not_found() {
        let mut users = MockTestUserRepository::new();
        users.expect_find_by_id().returning(|_| Ok(None));

        let service = service(
            users,
            MockTestCredentialRepository::new(),
            MockTestPasswordHasher::new(),
            MockTestTokenIssuer::new(),
        );

        let result = service.get_profile(&UserId::new()).await;
        assert!(matches!(result, Err(UserError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_profile() {
        let user = alice();
        let user_id = user.id;
        let mut users = MockTestUserRepository::new();

        users
            .expect_find_by_id()
            .with(eq(user_id))
            .returning(move |_| Ok(Some(user.clone())));
        users
            .expect_update()
            .withf(|user| {
                user.display_name.as_str() == "Alice B"
                    && user.avatar_url.as_deref() == Some("https://cdn.example.com/a.png")
                    && user.email_str() == "alice@example.com"
            })
            .times(1)
            .returning(Ok);

        let service = service(
            users,
            MockTestCredentialRepository::new(),
            MockTestPasswordHasher::new(),
            MockTestTokenIssuer::new(),
        );

        let command = UpdateProfileCommand {
            display_name: Some(DisplayName::new("Alice B".to_string()).unwrap()),
            avatar_url: Some("https://cdn.example.com/a.png".to_string()),
        };

        let updated = service.update_profile(&user_id, command).await.unwrap();
        assert_eq!(updated.display_name.as_str(), "Alice B");
    }

    #[tokio::test]
    async fn test_update_profile_clears_avatar() {
        let mut user = alice();
        user.avatar_url = Some("https://cdn.example.com/a.png".to_string());
        let user_id = user.id;
        let mut users = MockTestUserRepository::new();

        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(user.clone())));
        users
            .expect_update()
            .withf(|user| user.avatar_url.is_none() && user.display_name.as_str() == "Alice")
            .times(1)
            .returning(Ok);

        let service = service(
            users,
            MockTestCredentialRepository::new(),
            MockTestPasswordHasher::new(),
            MockTestTokenIssuer::new(),
        );

        let command = UpdateProfileCommand {
            display_name: None,
            avatar_url: Some(String::new()),
        };

        assert!(service.update_profile(&user_id, command).await.is_ok());
    }
}
