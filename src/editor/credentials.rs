use std::fmt;
use std::sync::{Arc, RwLock};

use crate::util::lock::{rw_read, rw_write};

const SOURCE: &str = "quire::editor::credentials";

/// Admin token held in memory for the lifetime of the editor.
///
/// Clones share the same slot, so logging out through one handle is seen by
/// every client built from it.
#[derive(Clone, Default)]
pub struct AdminCredentials {
    token: Arc<RwLock<Option<String>>>,
}

impl AdminCredentials {
    pub fn new(token: Option<String>) -> Self {
        let credentials = Self::default();
        if let Some(token) = token {
            credentials.login(token);
        }
        credentials
    }

    /// Store a token. Blank input logs out instead.
    pub fn login(&self, token: impl Into<String>) {
        let token = token.into();
        let token = token.trim();
        *rw_write(&self.token, SOURCE, "login") = (!token.is_empty()).then(|| token.to_string());
    }

    pub fn logout(&self) {
        *rw_write(&self.token, SOURCE, "logout") = None;
    }

    pub fn token(&self) -> Option<String> {
        rw_read(&self.token, SOURCE, "token").clone()
    }

    pub fn is_authenticated(&self) -> bool {
        rw_read(&self.token, SOURCE, "is_authenticated").is_some()
    }
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_and_logout_are_shared_between_clones() {
        let credentials = AdminCredentials::default();
        let other = credentials.clone();
        assert!(!other.is_authenticated());

        credentials.login("  token-1 ");
        assert_eq!(other.token().as_deref(), Some("token-1"));

        other.logout();
        assert!(credentials.token().is_none());
    }

    #[test]
    fn blank_login_clears_the_token() {
        let credentials = AdminCredentials::new(Some("abc".to_string()));
        credentials.login("   ");
        assert!(!credentials.is_authenticated());
    }

    #[test]
    fn debug_output_hides_the_token() {
        let credentials = AdminCredentials::new(Some("super-secret".to_string()));
        let rendered = format!("{credentials:?}");
        assert!(!rendered.contains("super-secret"));
    }
}
