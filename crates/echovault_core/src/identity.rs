//! Current-user identity resolution.
//!
//! The app runs without authentication by default, so every record is owned
//! by a constant anonymous id unless a session supplies a real one.

/// Owner id used when no authenticated session exists.
pub const ANONYMOUS_USER_ID: &str = "anonymous";

/// Supplies the stable id of the current user.
pub trait IdentityResolver {
    fn current_user_id(&self) -> String;
}

/// Resolver for unauthenticated installs.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousIdentity;

impl IdentityResolver for AnonymousIdentity {
    fn current_user_id(&self) -> String {
        ANONYMOUS_USER_ID.to_string()
    }
}

/// Resolver backed by an optional signed-in session user id.
#[derive(Debug, Clone, Default)]
pub struct SessionIdentity {
    session_user_id: Option<String>,
}

impl SessionIdentity {
    pub fn new(session_user_id: Option<String>) -> Self {
        Self { session_user_id }
    }
}

impl IdentityResolver for SessionIdentity {
    fn current_user_id(&self) -> String {
        self.session_user_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(ANONYMOUS_USER_ID)
            .to_string()
    }
}
