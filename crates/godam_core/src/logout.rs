//! Logout: purge every piece of session state, then send the user to a login surface.

use tracing::info;

use crate::domain::IdentityClass;
use crate::token::TokenManager;

/// Turns "log me out" into a full purge plus the right redirect.
///
/// Both identity classes are always purged, whichever one is active.
#[derive(Clone)]
pub struct LogoutManager {
    tokens: TokenManager,
}

impl LogoutManager {
    pub fn new(tokens: TokenManager) -> Self {
        Self { tokens }
    }

    pub fn logout(&self, class: IdentityClass) {
        self.purge_and_go(class.login_route());
    }

    /// Infers the identity class from the current route. Wire this to logout buttons.
    pub fn logout_from_current_page(&self) {
        let class = IdentityClass::from_path(&self.tokens.navigator().current_path());
        self.logout(class);
    }

    /// Last-resort recovery: purge and go to the admin login.
    pub fn force_logout(&self) {
        self.logout(IdentityClass::Admin);
    }

    pub fn logout_with_redirect(&self, path: &str) {
        self.purge_and_go(path);
    }

    fn purge_and_go(&self, path: &str) {
        self.tokens.clear_all_tokens();
        info!(to = path, "Logged out");
        self.tokens.navigator().navigate(path);
    }
}
