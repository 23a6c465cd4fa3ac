use std::fmt;

use crate::api::User;
use crate::core::WebData;

/// Password that never shows up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthMsg {
    LoginRequested {
        username: String,
        password: Password,
    },
    LoginResponseReceived {
        web_data: WebData<User>,
    },
    /// Asks for confirmation before signing out.
    LogoutRequested,
    LogoutConfirmed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_is_redacted_in_debug() {
        let msg = AuthMsg::LoginRequested {
            username: "ana".into(),
            password: Password::new("hunter2"),
        };
        let printed = format!("{:?}", msg);
        assert!(printed.contains("ana"));
        assert!(!printed.contains("hunter2"));
    }
}
