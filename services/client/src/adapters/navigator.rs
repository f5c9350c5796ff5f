//! services/client/src/adapters/navigator.rs
//!
//! Route adapter for the `Navigator` port. The shell has no page to render, so
//! navigation just moves the tracked route and is logged for whoever drives
//! the shell.

use std::sync::RwLock;

use godam_core::ports::Navigator;
use tracing::info;

pub struct ShellNavigator {
    current: RwLock<String>,
}

impl ShellNavigator {
    pub fn new(start_path: impl Into<String>) -> Self {
        Self {
            current: RwLock::new(start_path.into()),
        }
    }
}

impl Navigator for ShellNavigator {
    fn current_path(&self) -> String {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn navigate(&self, path: &str) {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        info!(from = %current, to = path, "Navigating");
        *current = path.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_moves_the_current_route() {
        let navigator = ShellNavigator::new("/dashboard");
        navigator.navigate("/login");
        assert_eq!(navigator.current_path(), "/login");
    }
}
