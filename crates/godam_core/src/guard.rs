//! Page gate: decides whether protected content may render for an identity class.

use tracing::debug;

use crate::domain::IdentityClass;
use crate::token::TokenManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Render,
    Redirect { to: &'static str },
}

#[derive(Clone)]
pub struct AuthGuard {
    tokens: TokenManager,
}

impl AuthGuard {
    pub fn new(tokens: TokenManager) -> Self {
        Self { tokens }
    }

    pub fn check(&self, class: IdentityClass) -> GuardDecision {
        if self.tokens.is_token_valid(class) {
            GuardDecision::Render
        } else {
            GuardDecision::Redirect {
                to: class.login_route(),
            }
        }
    }

    /// Like `check`, but performs the redirect. Returns whether rendering may proceed.
    pub fn enforce(&self, class: IdentityClass) -> bool {
        match self.check(class) {
            GuardDecision::Render => true,
            GuardDecision::Redirect { to } => {
                debug!(%class, to, "Guard redirecting unauthenticated visitor");
                self.tokens.navigator().navigate(to);
                false
            }
        }
    }

    pub fn enforce_current_page(&self) -> bool {
        let class = IdentityClass::from_path(&self.tokens.navigator().current_path());
        self.enforce(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SessionSettings;
    use crate::test_support::Harness;
    use chrono::Duration;

    fn guard(h: &Harness) -> (AuthGuard, TokenManager) {
        let tokens = TokenManager::new(
            h.store.clone(),
            h.clock.clone(),
            h.navigator.clone(),
            SessionSettings::default(),
        );
        (AuthGuard::new(tokens.clone()), tokens)
    }

    #[test]
    fn renders_with_a_valid_token() {
        let h = Harness::at("/dashboard");
        let (guard, tokens) = guard(&h);
        tokens.store_token("abc", IdentityClass::Admin);

        assert_eq!(guard.check(IdentityClass::Admin), GuardDecision::Render);
        assert!(guard.enforce_current_page());
        assert!(h.navigator.visits().is_empty());
    }

    #[test]
    fn admin_token_does_not_open_the_employee_area() {
        let h = Harness::at("/employees/dashboard");
        let (guard, tokens) = guard(&h);
        tokens.store_token("abc", IdentityClass::Admin);

        assert!(!guard.enforce_current_page());
        assert_eq!(h.navigator.visits(), vec!["/employees/login"]);
    }

    #[test]
    fn expired_token_redirects() {
        let h = Harness::at("/orders");
        let (guard, tokens) = guard(&h);
        tokens.store_token("abc", IdentityClass::Admin);
        h.clock.advance(Duration::hours(2));

        assert_eq!(
            guard.check(IdentityClass::Admin),
            GuardDecision::Redirect { to: "/login" }
        );
    }
}
