//! Sign up, log in and log out against the auth provider, with the local identity kept in step.

use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::watch;

use crate::{
    backend::{AuthProvider, AuthUser},
    error::{AuthError, Field, ValidationError},
    local_store::{LocalStore, SESSION_FLAG_KEY, USERNAME_KEY},
};

/// Display name used until the user picks one
pub const DEFAULT_DISPLAY_NAME: &str = "anon";

const SESSION_FLAG_VALUE: &str = "true";

/// What this client remembers about its user between runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub display_name: String,
    /// Only decides which screen to show. The provider has the final word on who is signed in.
    pub session_active: bool,
}

impl Identity {
    pub fn load(local_store: &dyn LocalStore) -> Self {
        Identity {
            display_name: local_store
                .get(USERNAME_KEY)
                .unwrap_or_else(|| String::from(DEFAULT_DISPLAY_NAME)),
            session_active: local_store.get(SESSION_FLAG_KEY).is_some(),
        }
    }
}

/// Where a client starts after a restart
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resume {
    /// The provider confirmed a signed in user
    SignedIn(Identity),
    /// Nobody is signed in. `returning` is set when a session flag was left behind,
    /// so the user most likely wants to log in rather than sign up.
    SignedOut { returning: bool },
}

pub struct IdentityGate {
    auth: Arc<dyn AuthProvider>,
    local_store: Arc<dyn LocalStore>,
    identity: Identity,
}

impl IdentityGate {
    pub fn new(auth: Arc<dyn AuthProvider>, local_store: Arc<dyn LocalStore>) -> Self {
        let identity = Identity::load(local_store.as_ref());

        IdentityGate {
            auth,
            local_store,
            identity,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Receives the signed in user of the provider whenever it changes
    pub fn auth_state(&self) -> watch::Receiver<Option<AuthUser>> {
        self.auth.auth_state()
    }

    /// Decide the starting screen. A leftover session flag is never taken on its own word:
    /// unless the provider still knows the user, the flag is cleared.
    pub fn resume(&mut self) -> Resume {
        let returning = self.identity.session_active;

        match self.auth.current_user() {
            Some(user) => {
                debug!("resuming the session of {}", user.email);
                self.mark_session_active(true);

                Resume::SignedIn(self.identity.clone())
            }
            None => {
                if returning {
                    debug!("session flag is stale, asking the user to log in again");
                }
                self.mark_session_active(false);

                Resume::SignedOut { returning }
            }
        }
    }

    pub async fn sign_up(
        &mut self,
        display_name: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        let (display_name, email, password) = validate(display_name, email, password)?;

        self.auth
            .create_user(email, password)
            .await
            .map_err(|err| {
                warn!("sign up failed: {}", err);
                AuthError::from(err)
            })?;

        Ok(self.remember(display_name))
    }

    pub async fn log_in(
        &mut self,
        display_name: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        let (display_name, email, password) = validate(display_name, email, password)?;

        self.auth.sign_in(email, password).await.map_err(|err| {
            warn!("log in failed: {}", err);
            AuthError::from(err)
        })?;

        Ok(self.remember(display_name))
    }

    /// Signs out of the provider, then drops the session flag. The display name is kept.
    pub async fn log_out(&mut self) -> Result<(), AuthError> {
        self.auth.sign_out().await.map_err(|err| {
            warn!("log out failed: {}", err);
            AuthError::from(err)
        })?;

        self.mark_session_active(false);

        Ok(())
    }

    /// Follow a change of the provider's signed in user.
    /// Returns true if this dropped the local session, i.e. the user was signed out remotely.
    pub fn on_auth_state(&mut self, user: Option<&AuthUser>) -> bool {
        if user.is_some() || !self.identity.session_active {
            return false;
        }

        debug!("provider reports nobody signed in, dropping the local session");
        self.mark_session_active(false);

        true
    }

    fn remember(&mut self, display_name: &str) -> Identity {
        if let Err(err) = self.local_store.set(USERNAME_KEY, display_name) {
            warn!("could not store the display name: {:#}", err);
        }
        self.identity.display_name = String::from(display_name);
        self.mark_session_active(true);

        self.identity.clone()
    }

    fn mark_session_active(&mut self, active: bool) {
        let result = if active {
            self.local_store.set(SESSION_FLAG_KEY, SESSION_FLAG_VALUE)
        } else {
            self.local_store.remove(SESSION_FLAG_KEY)
        };

        if let Err(err) = result {
            warn!("could not update the session flag: {:#}", err);
        }

        self.identity.session_active = active;
    }
}

/// Trims the display name and email. The password is passed on untouched.
fn validate<'a>(
    display_name: &'a str,
    email: &'a str,
    password: &'a str,
) -> Result<(&'a str, &'a str, &'a str), ValidationError> {
    let required = |value: &'a str, field: Field| match value.trim() {
        "" => Err(ValidationError::MissingField(field)),
        trimmed => Ok(trimmed),
    };

    let display_name = required(display_name, Field::DisplayName)?;
    let email = required(email, Field::Email)?;
    required(password, Field::Password)?;

    Ok((display_name, email, password))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::memory::{MemoryBackend, MemoryDatabase},
        local_store::MemoryStore,
    };

    fn gate_over(database: &Arc<MemoryDatabase>, local_store: &Arc<MemoryStore>) -> IdentityGate {
        IdentityGate::new(
            Arc::new(MemoryBackend::new(database.clone())),
            local_store.clone(),
        )
    }

    #[tokio::test]
    async fn test_missing_fields_never_reach_the_provider() {
        let database = MemoryDatabase::new();
        let local_store = Arc::new(MemoryStore::default());
        let mut gate = gate_over(&database, &local_store);

        let missing = |field| AuthError::Validation(ValidationError::MissingField(field));

        assert_eq!(
            gate.sign_up("mario", "mario@example.com", "").await,
            Err(missing(Field::Password))
        );
        assert_eq!(
            gate.sign_up("  ", "mario@example.com", "secret1").await,
            Err(missing(Field::DisplayName))
        );
        assert_eq!(
            gate.log_in("mario", " ", "secret1").await,
            Err(missing(Field::Email))
        );

        assert_eq!(database.auth_requests(), 0);
        assert_eq!(local_store.get(SESSION_FLAG_KEY), None);
    }

    #[tokio::test]
    async fn test_taken_email_leaves_the_local_identity_alone() {
        let database = MemoryDatabase::new();
        MemoryBackend::new(database.clone())
            .create_user("mario@example.com", "secret1")
            .await
            .unwrap();

        let local_store = Arc::new(MemoryStore::default());
        local_store.set(USERNAME_KEY, "old name").unwrap();
        let mut gate = gate_over(&database, &local_store);
        let before = gate.identity().clone();

        assert_eq!(
            gate.sign_up("new name", "mario@example.com", "secret2").await,
            Err(AuthError::EmailInUse)
        );

        assert_eq!(gate.identity(), &before);
        assert_eq!(local_store.get(USERNAME_KEY), Some("old name".into()));
        assert_eq!(local_store.get(SESSION_FLAG_KEY), None);
    }

    #[tokio::test]
    async fn test_sign_up_log_out_log_in() {
        let database = MemoryDatabase::new();
        let local_store = Arc::new(MemoryStore::default());
        let mut gate = gate_over(&database, &local_store);
        assert_eq!(gate.identity().display_name, DEFAULT_DISPLAY_NAME);

        let identity = gate
            .sign_up(" yoshi ", "yoshi@example.com", "secret1")
            .await
            .unwrap();
        assert_eq!(
            identity,
            Identity {
                display_name: "yoshi".into(),
                session_active: true,
            }
        );
        assert_eq!(Identity::load(local_store.as_ref()), identity);

        gate.log_out().await.unwrap();
        assert!(!gate.identity().session_active);
        assert_eq!(local_store.get(SESSION_FLAG_KEY), None);
        assert_eq!(local_store.get(USERNAME_KEY), Some("yoshi".into()));

        assert_eq!(
            gate.log_in("yoshi", "yoshi@example.com", "nope!!").await,
            Err(AuthError::WrongPassword)
        );
        assert!(!gate.identity().session_active);

        let identity = gate
            .log_in("green yoshi", "yoshi@example.com", "secret1")
            .await
            .unwrap();
        assert_eq!(identity.display_name, "green yoshi");
        assert!(identity.session_active);
    }

    #[tokio::test]
    async fn test_resume_needs_the_provider_to_confirm() {
        let database = MemoryDatabase::new();
        let local_store = Arc::new(MemoryStore::default());
        local_store.set(SESSION_FLAG_KEY, SESSION_FLAG_VALUE).unwrap();

        // a fresh provider handle knows nobody, whatever the flag says
        let mut gate = gate_over(&database, &local_store);
        assert_eq!(gate.resume(), Resume::SignedOut { returning: true });
        assert_eq!(local_store.get(SESSION_FLAG_KEY), None);
        assert_eq!(gate.resume(), Resume::SignedOut { returning: false });

        let auth = Arc::new(MemoryBackend::new(database.clone()));
        auth.create_user("toad@example.com", "secret1").await.unwrap();
        let mut gate = IdentityGate::new(auth, local_store.clone());
        assert!(matches!(gate.resume(), Resume::SignedIn(identity) if identity.session_active));
        assert_eq!(local_store.get(SESSION_FLAG_KEY), Some(SESSION_FLAG_VALUE.into()));
    }

    #[tokio::test]
    async fn test_remote_sign_out_drops_the_local_session() {
        let database = MemoryDatabase::new();
        let local_store = Arc::new(MemoryStore::default());
        let mut gate = gate_over(&database, &local_store);
        gate.sign_up("peach", "peach@example.com", "secret1")
            .await
            .unwrap();

        let user = gate.auth_state().borrow().clone();
        assert!(!gate.on_auth_state(user.as_ref()));
        assert!(gate.on_auth_state(None));
        assert!(!gate.on_auth_state(None));
        assert!(!gate.identity().session_active);
    }
}
