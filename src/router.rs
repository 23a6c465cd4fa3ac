//! In-memory navigation history.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::core::Router;

/// One entry of the navigation stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub pathname: String,
    pub params: BTreeMap<String, String>,
}

/// [`Router`] that keeps a stack of visited routes.
///
/// `back` on the root route is ignored.
pub struct HistoryRouter {
    stack: Mutex<Vec<Route>>,
}

impl HistoryRouter {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            stack: Mutex::new(vec![Route {
                pathname: root.into(),
                params: BTreeMap::new(),
            }]),
        }
    }

    pub fn current(&self) -> Route {
        let stack = self.stack.lock();
        stack[stack.len() - 1].clone()
    }

    pub fn depth(&self) -> usize {
        self.stack.lock().len()
    }
}

impl Default for HistoryRouter {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Router for HistoryRouter {
    fn push(&self, pathname: &str, params: &BTreeMap<String, String>) {
        tracing::info!(pathname, "navigate push");
        self.stack.lock().push(Route {
            pathname: pathname.to_string(),
            params: params.clone(),
        });
    }

    fn replace(&self, pathname: &str, params: &BTreeMap<String, String>) {
        tracing::info!(pathname, "navigate replace");
        let mut stack = self.stack.lock();
        let top = stack.len() - 1;
        stack[top] = Route {
            pathname: pathname.to_string(),
            params: params.clone(),
        };
    }

    fn back(&self) {
        let mut stack = self.stack.lock();
        if stack.len() > 1 {
            stack.pop();
            tracing::info!(pathname = %stack[stack.len() - 1].pathname, "navigate back");
        } else {
            tracing::debug!("navigate back ignored at root");
        }
    }
}
