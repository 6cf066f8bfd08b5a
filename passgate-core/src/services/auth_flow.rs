//! The authentication session flow
//!
//! Orchestrates login, three-step registration, code resend, password
//! change, and password reset over the repositories, the password hasher,
//! the token service, and the verification-code service.
//!
//! Expected outcomes (wrong password, expired or wrong code, lockout) come
//! back as typed errors; nothing here panics for a domain failure. All
//! notification sends are fire-and-forget with a delivery deadline: the
//! primary operation has already succeeded and is never failed by a slow
//! or broken transport.

use std::sync::Arc;

use chrono::Utc;

use crate::{
    config::AuthConfig,
    error::{AuthError, CodeError, Error, TokenError, ValidationError},
    notifier::{self, Notifier},
    password::{PasswordCredential, PasswordHasher},
    repositories::{CredentialRepository, RepositoryProvider, RoleRepository},
    services::{UserService, VerificationCodeService},
    token::{IssuedToken, TokenService},
    user::{User, UserId},
    validation::{normalize_email, validate_display_name, validate_email, validate_password},
};

/// The result of a successful login or completed registration. The token
/// is handed to the transport layer to be set as a cookie; it must not be
/// echoed into a response body.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub user: User,
    pub roles: Vec<String>,
    pub token: IssuedToken,
}

/// Orchestrates the credential lifecycle for one deployment.
pub struct AuthFlow<R: RepositoryProvider> {
    users: UserService<R::UserRepo>,
    credentials: Arc<R::CredentialRepo>,
    roles: Arc<R::RoleRepo>,
    codes: VerificationCodeService<R::ChallengeRepo>,
    tokens: Arc<TokenService>,
    hasher: PasswordHasher,
    notifier: Arc<dyn Notifier>,
    config: AuthConfig,
}

impl<R: RepositoryProvider> AuthFlow<R> {
    pub fn new(repositories: &R, notifier: Arc<dyn Notifier>, config: AuthConfig) -> Self {
        Self {
            users: UserService::new(repositories.user()),
            credentials: repositories.credential(),
            roles: repositories.role(),
            codes: VerificationCodeService::new(
                repositories.challenge(),
                config.verification.clone(),
            ),
            tokens: Arc::new(TokenService::new(config.token.clone())),
            hasher: PasswordHasher::new(),
            notifier,
            config,
        }
    }

    /// The token service this flow signs and validates with. The gateway
    /// middleware shares it to validate session cookies.
    pub fn tokens(&self) -> Arc<TokenService> {
        Arc::clone(&self.tokens)
    }

    /// Authenticate with email and password.
    ///
    /// The same [`AuthError::InvalidCredentials`] covers an unknown address
    /// and a wrong password; inactive and unconfirmed accounts are rejected
    /// before the password is checked.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthenticatedSession, Error> {
        let user = self
            .users
            .get_user_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AuthError::AccountInactive.into());
        }
        if !user.is_email_confirmed() {
            return Err(AuthError::EmailNotConfirmed.into());
        }

        let credential = self
            .credentials
            .get_active(&user.id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self
            .hasher
            .verify(password, &credential.hash, &credential.salt)
        {
            return Err(AuthError::InvalidCredentials.into());
        }

        self.users.record_login(&user.id, Utc::now()).await?;
        let user = self
            .users
            .get_user(&user.id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let roles = self.roles.roles_for(&user.id).await?;
        let token = self.tokens.issue_session(&user, &roles)?;

        tracing::debug!(user_id = %user.id, "login succeeded");
        Ok(AuthenticatedSession { user, roles, token })
    }

    /// Registration step one: create a minimal identity and send a
    /// verification code to the address.
    ///
    /// For an address that already belongs to a confirmed account this
    /// succeeds without doing anything, so the endpoint cannot be used to
    /// probe which addresses are registered. An unconfirmed identity gets a
    /// fresh code, subject to the lockout.
    pub async fn register_start(&self, email: &str) -> Result<(), Error> {
        let email = normalize_email(email);
        validate_email(&email)?;

        match self.users.get_user_by_email(&email).await? {
            Some(user) if user.is_email_confirmed() => {
                tracing::debug!(user_id = %user.id, "registration restarted for confirmed account");
                Ok(())
            }
            Some(user) => self.issue_and_send_code(&user).await,
            None => {
                let user = self.users.create_user(&email, None).await?;
                self.issue_and_send_code(&user).await
            }
        }
    }

    /// Registration step two: check the verification code and mark the
    /// email confirmed.
    pub async fn register_verify(&self, email: &str, code: &str) -> Result<(), Error> {
        // An unknown address gets the same outcome as a wrong code.
        let Some(user) = self.users.get_user_by_email(email).await? else {
            return Err(CodeError::Invalid.into());
        };
        if user.is_email_confirmed() {
            return Err(AuthError::EmailAlreadyConfirmed.into());
        }

        self.codes.check(&user.id, code).await?;
        self.users.mark_email_confirmed(&user.id).await?;
        self.codes.clear(&user.id).await?;

        tracing::debug!(user_id = %user.id, "email confirmed");
        Ok(())
    }

    /// Registration step three: set the profile and password, assign the
    /// default role, and open a session. Requires a confirmed email and
    /// refuses to run twice for the same identity.
    pub async fn register_complete(
        &self,
        email: &str,
        name: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<AuthenticatedSession, Error> {
        if password != confirm_password {
            return Err(ValidationError::PasswordMismatch.into());
        }
        validate_password(password)?;
        validate_display_name(name)?;

        let Some(mut user) = self.users.get_user_by_email(email).await? else {
            return Err(AuthError::EmailNotConfirmed.into());
        };
        if !user.is_email_confirmed() {
            return Err(AuthError::EmailNotConfirmed.into());
        }
        if self.credentials.get_active(&user.id).await?.is_some() {
            return Err(AuthError::AlreadyRegistered.into());
        }

        let (hash, salt) = self.hasher.hash(password)?;
        self.credentials
            .set_active(&user.id, PasswordCredential::new(hash, salt))
            .await?;

        user.name = Some(name.to_string());
        let user = self.users.update_user(&user).await?;

        self.roles
            .assign(&user.id, &self.config.default_role)
            .await?;
        let roles = self.roles.roles_for(&user.id).await?;
        let token = self.tokens.issue_session(&user, &roles)?;

        let to = user.email.clone();
        let name = user.name.clone();
        notifier::dispatch(
            &self.notifier,
            self.config.notify_timeout,
            "welcome",
            move |n| async move { n.send_welcome(&to, name.as_deref()).await },
        );

        tracing::info!(user_id = %user.id, "registration completed");
        Ok(AuthenticatedSession { user, roles, token })
    }

    /// Re-send a verification code for an unconfirmed identity.
    ///
    /// Succeeds silently for an unknown address; rejects confirmed accounts
    /// and identities currently under lockout.
    pub async fn resend_code(&self, email: &str) -> Result<(), Error> {
        let Some(user) = self.users.get_user_by_email(email).await? else {
            return Ok(());
        };
        if user.is_email_confirmed() {
            return Err(AuthError::EmailAlreadyConfirmed.into());
        }

        self.issue_and_send_code(&user).await
    }

    /// Change the password of an authenticated identity. The identity comes
    /// from validated token claims, never from request parameters.
    pub async fn change_password(
        &self,
        user_id: &UserId,
        current_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<(), Error> {
        if new_password != confirm_password {
            return Err(ValidationError::PasswordMismatch.into());
        }
        validate_password(new_password)?;

        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if !user.is_active {
            return Err(AuthError::AccountInactive.into());
        }

        let credential = self
            .credentials
            .get_active(&user.id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if !self
            .hasher
            .verify(current_password, &credential.hash, &credential.salt)
        {
            return Err(AuthError::InvalidCredentials.into());
        }

        let (hash, salt) = self.hasher.hash(new_password)?;
        self.credentials
            .set_active(&user.id, PasswordCredential::new(hash, salt))
            .await?;

        tracing::info!(user_id = %user.id, "password changed");
        Ok(())
    }

    /// Request a password reset for an address.
    ///
    /// Always succeeds from the caller's point of view; a reset token is
    /// issued and sent only when the address belongs to an active account.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), Error> {
        if let Some(user) = self.users.get_user_by_email(email).await? {
            if user.is_active {
                let issued = self.tokens.issue_password_reset(&user)?;
                let to = user.email.clone();
                notifier::dispatch(
                    &self.notifier,
                    self.config.notify_timeout,
                    "password_reset",
                    move |n| async move { n.send_password_reset(&to, &issued.token).await },
                );
                tracing::debug!(user_id = %user.id, "password reset token issued");
            }
        }
        Ok(())
    }

    /// Complete a password reset with the token from the notification.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<(), Error> {
        if new_password != confirm_password {
            return Err(ValidationError::PasswordMismatch.into());
        }
        validate_password(new_password)?;

        let claims = self.tokens.validate_password_reset(token)?;
        let user = self
            .users
            .get_user(&claims.user_id())
            .await?
            .ok_or(TokenError::Invalid)?;

        let (hash, salt) = self.hasher.hash(new_password)?;
        self.credentials
            .set_active(&user.id, PasswordCredential::new(hash, salt))
            .await?;

        tracing::info!(user_id = %user.id, "password reset completed");
        Ok(())
    }

    /// Look up an identity by id. For endpoints where account existence is
    /// not sensitive.
    pub async fn get_user(&self, id: &UserId) -> Result<Option<User>, Error> {
        self.users.get_user(id).await
    }

    /// Look up an identity by email, case-insensitively.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        self.users.get_user_by_email(email).await
    }

    pub async fn roles_for(&self, id: &UserId) -> Result<Vec<String>, Error> {
        self.roles.roles_for(id).await
    }

    async fn issue_and_send_code(&self, user: &User) -> Result<(), Error> {
        if !self.codes.can_request_new_code(&user.id).await? {
            return Err(CodeError::Locked.into());
        }

        let challenge = self.codes.issue(&user.id).await?;
        let to = user.email.clone();
        notifier::dispatch(
            &self.notifier,
            self.config.notify_timeout,
            "verification_code",
            move |n| async move { n.send_verification_code(&to, &challenge.code).await },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::VerificationChallenge;
    use crate::repositories::{
        ChallengeRepository, CredentialRepository, RoleRepository, UserRepository,
    };
    use crate::token::TokenConfig;
    use crate::user::NewUser;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::collections::{BTreeSet, HashMap};
    use std::sync::Mutex;

    // Mock implementations for testing

    #[derive(Default)]
    struct MockUserRepository {
        users: Mutex<HashMap<UserId, User>>,
    }

    #[async_trait]
    impl UserRepository for MockUserRepository {
        async fn create(&self, new_user: NewUser) -> Result<User, Error> {
            let user = User::builder()
                .id(new_user.id)
                .email(new_user.email)
                .name(new_user.name)
                .build()?;
            self.users
                .lock()
                .unwrap()
                .insert(user.id.clone(), user.clone());
            Ok(user)
        }

        async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, Error> {
            Ok(self.users.lock().unwrap().get(id).cloned())
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .values()
                .find(|u| u.email == email)
                .cloned())
        }

        async fn update(&self, user: &User) -> Result<User, Error> {
            self.users
                .lock()
                .unwrap()
                .insert(user.id.clone(), user.clone());
            Ok(user.clone())
        }

        async fn mark_email_confirmed(&self, id: &UserId) -> Result<(), Error> {
            if let Some(user) = self.users.lock().unwrap().get_mut(id) {
                user.email_confirmed_at = Some(Utc::now());
            }
            Ok(())
        }

        async fn record_login(&self, id: &UserId, at: DateTime<Utc>) -> Result<(), Error> {
            if let Some(user) = self.users.lock().unwrap().get_mut(id) {
                user.last_login_at = Some(at);
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockCredentialRepository {
        active: Mutex<HashMap<UserId, PasswordCredential>>,
    }

    #[async_trait]
    impl CredentialRepository for MockCredentialRepository {
        async fn set_active(
            &self,
            user_id: &UserId,
            credential: PasswordCredential,
        ) -> Result<(), Error> {
            self.active
                .lock()
                .unwrap()
                .insert(user_id.clone(), credential);
            Ok(())
        }

        async fn get_active(&self, user_id: &UserId) -> Result<Option<PasswordCredential>, Error> {
            Ok(self.active.lock().unwrap().get(user_id).cloned())
        }
    }

    #[derive(Default)]
    struct MockRoleRepository {
        roles: Mutex<HashMap<UserId, BTreeSet<String>>>,
    }

    #[async_trait]
    impl RoleRepository for MockRoleRepository {
        async fn assign(&self, user_id: &UserId, role: &str) -> Result<(), Error> {
            self.roles
                .lock()
                .unwrap()
                .entry(user_id.clone())
                .or_default()
                .insert(role.to_string());
            Ok(())
        }

        async fn roles_for(&self, user_id: &UserId) -> Result<Vec<String>, Error> {
            Ok(self
                .roles
                .lock()
                .unwrap()
                .get(user_id)
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct MockChallengeRepository {
        challenges: Mutex<HashMap<UserId, VerificationChallenge>>,
    }

    #[async_trait]
    impl ChallengeRepository for MockChallengeRepository {
        async fn put(&self, challenge: VerificationChallenge) -> Result<(), Error> {
            self.challenges
                .lock()
                .unwrap()
                .insert(challenge.user_id.clone(), challenge);
            Ok(())
        }

        async fn get(&self, user_id: &UserId) -> Result<Option<VerificationChallenge>, Error> {
            Ok(self.challenges.lock().unwrap().get(user_id).cloned())
        }

        async fn compare_and_update(
            &self,
            current: &VerificationChallenge,
            updated: VerificationChallenge,
        ) -> Result<bool, Error> {
            let mut challenges = self.challenges.lock().unwrap();
            match challenges.get(&current.user_id) {
                Some(stored) if stored == current => {
                    challenges.insert(current.user_id.clone(), updated);
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn clear(&self, user_id: &UserId) -> Result<(), Error> {
            self.challenges.lock().unwrap().remove(user_id);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockStore {
        users: Arc<MockUserRepository>,
        credentials: Arc<MockCredentialRepository>,
        roles: Arc<MockRoleRepository>,
        challenges: Arc<MockChallengeRepository>,
    }

    #[async_trait]
    impl RepositoryProvider for MockStore {
        type UserRepo = MockUserRepository;
        type CredentialRepo = MockCredentialRepository;
        type RoleRepo = MockRoleRepository;
        type ChallengeRepo = MockChallengeRepository;

        fn user(&self) -> Arc<MockUserRepository> {
            Arc::clone(&self.users)
        }

        fn credential(&self) -> Arc<MockCredentialRepository> {
            Arc::clone(&self.credentials)
        }

        fn role(&self) -> Arc<MockRoleRepository> {
            Arc::clone(&self.roles)
        }

        fn challenge(&self) -> Arc<MockChallengeRepository> {
            Arc::clone(&self.challenges)
        }

        async fn health_check(&self) -> Result<(), Error> {
            Ok(())
        }
    }

    struct RecordingNotifier {
        sent: Mutex<Vec<(&'static str, String)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send_verification_code(&self, email: &str, _code: &str) -> Result<(), Error> {
            self.sent
                .lock()
                .unwrap()
                .push(("verification_code", email.to_string()));
            Ok(())
        }

        async fn send_password_reset(&self, email: &str, _token: &str) -> Result<(), Error> {
            self.sent
                .lock()
                .unwrap()
                .push(("password_reset", email.to_string()));
            Ok(())
        }

        async fn send_welcome(&self, email: &str, _name: Option<&str>) -> Result<(), Error> {
            self.sent.lock().unwrap().push(("welcome", email.to_string()));
            Ok(())
        }
    }

    fn test_config() -> AuthConfig {
        AuthConfig::new(TokenConfig::new(
            b"test_secret_key_for_hs256_tokens_not_for_production_use".to_vec(),
            "passgate-test",
            "internal-services",
        ))
    }

    fn flow(store: &MockStore) -> AuthFlow<MockStore> {
        AuthFlow::new(
            store,
            Arc::new(RecordingNotifier {
                sent: Mutex::new(Vec::new()),
            }),
            test_config(),
        )
    }

    async fn stored_code(store: &MockStore, email: &str) -> (UserId, String) {
        let user = store.users.find_by_email(email).await.unwrap().unwrap();
        let challenge = store.challenges.get(&user.id).await.unwrap().unwrap();
        (user.id, challenge.code)
    }

    async fn register(flow: &AuthFlow<MockStore>, store: &MockStore, email: &str, password: &str) {
        flow.register_start(email).await.unwrap();
        let (_, code) = stored_code(store, email).await;
        flow.register_verify(email, &code).await.unwrap();
        flow.register_complete(email, "Test User", password, password)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_full_registration_and_login() {
        let store = MockStore::default();
        let flow = flow(&store);

        flow.register_start("User@Example.com").await.unwrap();

        // The stored identity uses the normalized address and a live
        // six-digit challenge exists for it.
        let (user_id, code) = stored_code(&store, "user@example.com").await;
        assert_eq!(code.len(), 6);

        flow.register_verify("user@example.com", &code).await.unwrap();
        let user = store.users.find_by_id(&user_id).await.unwrap().unwrap();
        assert!(user.is_email_confirmed());

        let session = flow
            .register_complete("user@example.com", "Test User", "s3cret-enough", "s3cret-enough")
            .await
            .unwrap();
        assert_eq!(session.roles, vec!["user".to_string()]);
        assert_eq!(session.user.name.as_deref(), Some("Test User"));

        // Email comparison is case-insensitive at login as well.
        let session = flow.login("USER@example.COM", "s3cret-enough").await.unwrap();
        assert_eq!(session.user.id, user_id);
        assert!(session.user.last_login_at.is_some());

        let claims = flow.tokens().validate(&session.token.token).unwrap();
        assert_eq!(claims.user_id(), user_id);
        assert_eq!(claims.roles, vec!["user".to_string()]);
    }

    #[tokio::test]
    async fn test_login_does_not_disambiguate_failures() {
        let store = MockStore::default();
        let flow = flow(&store);
        register(&flow, &store, "user@example.com", "s3cret-enough").await;

        let wrong_password = flow.login("user@example.com", "wrong-password").await;
        let unknown_email = flow.login("ghost@example.com", "s3cret-enough").await;

        assert!(matches!(
            wrong_password,
            Err(Error::Auth(AuthError::InvalidCredentials))
        ));
        assert!(matches!(
            unknown_email,
            Err(Error::Auth(AuthError::InvalidCredentials))
        ));
    }

    #[tokio::test]
    async fn test_login_requires_confirmed_and_active() {
        let store = MockStore::default();
        let flow = flow(&store);

        flow.register_start("user@example.com").await.unwrap();
        let result = flow.login("user@example.com", "whatever-pass").await;
        assert!(matches!(
            result,
            Err(Error::Auth(AuthError::EmailNotConfirmed))
        ));

        register(&flow, &store, "other@example.com", "s3cret-enough").await;
        let mut user = store
            .users
            .find_by_email("other@example.com")
            .await
            .unwrap()
            .unwrap();
        user.is_active = false;
        store.users.update(&user).await.unwrap();

        let result = flow.login("other@example.com", "s3cret-enough").await;
        assert!(matches!(result, Err(Error::Auth(AuthError::AccountInactive))));
    }

    #[tokio::test]
    async fn test_register_verify_wrong_code_then_lockout() {
        let store = MockStore::default();
        let flow = flow(&store);

        flow.register_start("user@example.com").await.unwrap();
        let (user_id, code) = stored_code(&store, "user@example.com").await;
        let wrong = if code == "100000" { "100001" } else { "100000" };

        for _ in 0..4 {
            let result = flow.register_verify("user@example.com", wrong).await;
            assert!(matches!(result, Err(Error::Code(CodeError::Invalid))));
        }
        let result = flow.register_verify("user@example.com", wrong).await;
        assert!(matches!(result, Err(Error::Code(CodeError::Locked))));

        // Even the correct code is refused now, and a new one cannot be
        // requested until the block elapses.
        let result = flow.register_verify("user@example.com", &code).await;
        assert!(matches!(result, Err(Error::Code(CodeError::Locked))));
        let result = flow.resend_code("user@example.com").await;
        assert!(matches!(result, Err(Error::Code(CodeError::Locked))));

        let user = store.users.find_by_id(&user_id).await.unwrap().unwrap();
        assert!(!user.is_email_confirmed());
    }

    #[tokio::test]
    async fn test_resend_code_replaces_challenge() {
        let store = MockStore::default();
        let flow = flow(&store);

        flow.register_start("user@example.com").await.unwrap();
        let (_, first) = stored_code(&store, "user@example.com").await;

        flow.resend_code("user@example.com").await.unwrap();
        let (_, second) = stored_code(&store, "user@example.com").await;

        // The first code no longer verifies once replaced (unless the two
        // random codes happen to collide).
        if first != second {
            let result = flow.register_verify("user@example.com", &first).await;
            assert!(matches!(result, Err(Error::Code(CodeError::Invalid))));
        }
        flow.register_verify("user@example.com", &second)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_resend_code_rejects_confirmed_and_ignores_unknown() {
        let store = MockStore::default();
        let flow = flow(&store);
        register(&flow, &store, "user@example.com", "s3cret-enough").await;

        let result = flow.resend_code("user@example.com").await;
        assert!(matches!(
            result,
            Err(Error::Auth(AuthError::EmailAlreadyConfirmed))
        ));

        // Unknown addresses succeed silently.
        flow.resend_code("ghost@example.com").await.unwrap();
    }

    #[tokio::test]
    async fn test_register_complete_guards() {
        let store = MockStore::default();
        let flow = flow(&store);

        // Unconfirmed email cannot complete.
        flow.register_start("user@example.com").await.unwrap();
        let result = flow
            .register_complete("user@example.com", "Name", "s3cret-enough", "s3cret-enough")
            .await;
        assert!(matches!(
            result,
            Err(Error::Auth(AuthError::EmailNotConfirmed))
        ));

        let (_, code) = stored_code(&store, "user@example.com").await;
        flow.register_verify("user@example.com", &code).await.unwrap();

        // Mismatched confirmation is rejected before anything is stored.
        let result = flow
            .register_complete("user@example.com", "Name", "s3cret-enough", "different")
            .await;
        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::PasswordMismatch))
        ));

        flow.register_complete("user@example.com", "Name", "s3cret-enough", "s3cret-enough")
            .await
            .unwrap();

        // Completion is not repeatable.
        let result = flow
            .register_complete("user@example.com", "Name", "another-pass1", "another-pass1")
            .await;
        assert!(matches!(
            result,
            Err(Error::Auth(AuthError::AlreadyRegistered))
        ));
    }

    #[tokio::test]
    async fn test_change_password() {
        let store = MockStore::default();
        let flow = flow(&store);
        register(&flow, &store, "user@example.com", "s3cret-enough").await;
        let user_id = store
            .users
            .find_by_email("user@example.com")
            .await
            .unwrap()
            .unwrap()
            .id;

        let result = flow
            .change_password(&user_id, "wrong-current", "new-password1", "new-password1")
            .await;
        assert!(matches!(
            result,
            Err(Error::Auth(AuthError::InvalidCredentials))
        ));

        let result = flow
            .change_password(&user_id, "s3cret-enough", "new-password1", "other")
            .await;
        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::PasswordMismatch))
        ));

        let result = flow
            .change_password(&user_id, "s3cret-enough", "short", "short")
            .await;
        assert!(result.is_err());

        flow.change_password(&user_id, "s3cret-enough", "new-password1", "new-password1")
            .await
            .unwrap();

        assert!(flow.login("user@example.com", "s3cret-enough").await.is_err());
        assert!(flow.login("user@example.com", "new-password1").await.is_ok());
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let store = MockStore::default();
        let flow = flow(&store);
        register(&flow, &store, "user@example.com", "s3cret-enough").await;

        // The request phase is quiet about unknown addresses.
        flow.request_password_reset("ghost@example.com").await.unwrap();
        flow.request_password_reset("user@example.com").await.unwrap();

        // The reset token comes out of the token service; a session token
        // must not work in its place.
        let user = store
            .users
            .find_by_email("user@example.com")
            .await
            .unwrap()
            .unwrap();
        let reset = flow.tokens().issue_password_reset(&user).unwrap();
        let session = flow.tokens().issue_session(&user, &[]).unwrap();

        let result = flow
            .reset_password(&session.token, "new-password1", "new-password1")
            .await;
        assert!(matches!(result, Err(Error::Token(TokenError::Invalid))));

        flow.reset_password(&reset.token, "new-password1", "new-password1")
            .await
            .unwrap();

        assert!(flow.login("user@example.com", "s3cret-enough").await.is_err());
        assert!(flow.login("user@example.com", "new-password1").await.is_ok());
    }

    #[tokio::test]
    async fn test_register_start_is_quiet_for_confirmed_accounts() {
        let store = MockStore::default();
        let flow = flow(&store);
        register(&flow, &store, "user@example.com", "s3cret-enough").await;

        // No challenge is issued and no error escapes.
        flow.register_start("user@example.com").await.unwrap();
        let user = store
            .users
            .find_by_email("user@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(store.challenges.get(&user.id).await.unwrap().is_none());
    }
}
