// 🚪 Session Controller - per-interaction state machine gating the prediction flow
//
// States: Unauthenticated(view) | Authenticated(username).
// One controller per caller interaction; nothing here is process-wide.

use crate::credentials::CredentialStore;
use crate::error::{Error, Result, ValidationError};
use std::fmt;
use tracing::{info, warn};
use uuid::Uuid;

/// Sub-view shown while signed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthView {
    Login,
    Register,
    Forgot,
}

impl AuthView {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthView::Login => "login",
            AuthView::Register => "register",
            AuthView::Forgot => "forgot",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "login" => Some(AuthView::Login),
            "register" => Some(AuthView::Register),
            "forgot" => Some(AuthView::Forgot),
            _ => None,
        }
    }
}

/// The username exists only in the authenticated state, and the view only
/// in the unauthenticated one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated { view: AuthView },
    Authenticated { username: String },
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Unauthenticated {
            view: AuthView::Login,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Unauthenticated { view } => write!(f, "signed out ({})", view.as_str()),
            SessionState::Authenticated { username } => write!(f, "signed in as {}", username),
        }
    }
}

/// Informational message left by the last successful transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    LoggedIn,
    AccountCreated,
    PasswordUpdated,
    LoggedOut,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::LoggedIn => "Login successful.",
            Notice::AccountCreated => "Account created successfully. You can login now.",
            Notice::PasswordUpdated => "Password updated successfully. You can now login.",
            Notice::LoggedOut => "You have been logged out.",
        }
    }
}

#[derive(Debug)]
pub struct SessionController {
    interaction_id: Uuid,
    state: SessionState,
    notice: Option<Notice>,
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionController {
    pub fn new() -> Self {
        SessionController {
            interaction_id: Uuid::new_v4(),
            state: SessionState::default(),
            notice: None,
        }
    }

    pub fn interaction_id(&self) -> Uuid {
        self.interaction_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated { .. })
    }

    pub fn username(&self) -> Option<&str> {
        match &self.state {
            SessionState::Authenticated { username } => Some(username),
            SessionState::Unauthenticated { .. } => None,
        }
    }

    /// Active sub-view, meaningful only while signed out.
    pub fn active_view(&self) -> Option<AuthView> {
        match self.state {
            SessionState::Unauthenticated { view } => Some(view),
            SessionState::Authenticated { .. } => None,
        }
    }

    pub fn notice(&self) -> Option<Notice> {
        self.notice
    }

    // ========================================================================
    // TRANSITIONS
    // ========================================================================

    pub fn select_view(&mut self, view: AuthView) -> Result<()> {
        self.require_unauthenticated("select view")?;
        self.notice = None;
        self.set_view(view);
        Ok(())
    }

    pub fn submit_login(
        &mut self,
        credentials: &CredentialStore,
        username: &str,
        password: &str,
    ) -> Result<()> {
        self.require_unauthenticated("login")?;
        self.notice = None;

        if credentials.authenticate(username, password)? {
            info!(interaction = %self.interaction_id, username, "login succeeded");
            self.state = SessionState::Authenticated {
                username: username.to_string(),
            };
            self.notice = Some(Notice::LoggedIn);
            Ok(())
        } else {
            self.set_view(AuthView::Login);
            Err(Error::Authentication)
        }
    }

    /// Creates the account but does not sign in.
    pub fn submit_register(
        &mut self,
        credentials: &CredentialStore,
        username: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<()> {
        self.require_unauthenticated("register")?;
        self.notice = None;

        require_filled(&[("username", username), ("email", email), ("password", password)])?;
        if password != confirm_password {
            return Err(ValidationError::PasswordMismatch.into());
        }

        match credentials.register(username, email, password) {
            Ok(()) => {
                self.set_view(AuthView::Login);
                self.notice = Some(Notice::AccountCreated);
                Ok(())
            }
            Err(Error::Conflict) => {
                self.set_view(AuthView::Register);
                Err(Error::Conflict)
            }
            Err(e) => Err(e),
        }
    }

    pub fn submit_reset(
        &mut self,
        credentials: &CredentialStore,
        username: &str,
        email: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<()> {
        self.require_unauthenticated("reset password")?;
        self.notice = None;

        require_filled(&[
            ("username", username),
            ("email", email),
            ("new password", new_password),
        ])?;
        if new_password != confirm_password {
            return Err(ValidationError::PasswordMismatch.into());
        }

        if credentials.lookup_for_reset(username, email)?.is_none() {
            warn!(interaction = %self.interaction_id, username, "reset rejected: no matching user");
            self.set_view(AuthView::Forgot);
            return Err(Error::NotFound);
        }

        credentials.reset_password(username, new_password)?;
        self.set_view(AuthView::Login);
        self.notice = Some(Notice::PasswordUpdated);
        Ok(())
    }

    pub fn logout(&mut self) -> Result<()> {
        let username = match &self.state {
            SessionState::Authenticated { username } => username.clone(),
            SessionState::Unauthenticated { .. } => {
                return Err(self.invalid_transition("logout"));
            }
        };

        info!(interaction = %self.interaction_id, username = %username, "logged out");
        self.state = SessionState::default();
        self.notice = Some(Notice::LoggedOut);
        Ok(())
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    fn set_view(&mut self, view: AuthView) {
        self.state = SessionState::Unauthenticated { view };
    }

    fn require_unauthenticated(&self, action: &'static str) -> Result<()> {
        if self.is_authenticated() {
            Err(self.invalid_transition(action))
        } else {
            Ok(())
        }
    }

    fn invalid_transition(&self, action: &'static str) -> Error {
        Error::InvalidTransition {
            action,
            state: self.state.to_string(),
        }
    }
}

fn require_filled(fields: &[(&'static str, &str)]) -> std::result::Result<(), ValidationError> {
    match fields.iter().find(|(_, value)| value.is_empty()) {
        Some((name, _)) => Err(ValidationError::MissingField(*name)),
        None => Ok(()),
    }
}
