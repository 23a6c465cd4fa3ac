use crate::api::User;
use crate::core::ApiError;

/// Session state of the signed-in operator.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuthModel {
    pub is_loading: bool,
    pub is_authenticated: bool,
    pub user: Option<User>,
    pub login_session: LoginSession,
}

/// State of the login form.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoginSession {
    pub is_submitting: bool,
    /// Username of the attempt in progress or the last failed one.
    pub username: String,
    pub error: Option<ApiError>,
}

impl AuthModel {
    pub fn token(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.token.as_str())
    }
}
