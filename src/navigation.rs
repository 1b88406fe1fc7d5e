use parking_lot::Mutex;
use std::sync::Arc;

/// NavigateOptions
///
/// `replace` swaps the current history entry instead of pushing a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NavigateOptions {
    pub replace: bool,
}

impl NavigateOptions {
    pub fn replace() -> Self {
        Self { replace: true }
    }
}

/// Navigator
///
/// The router contract the session gate drives. Navigation is fire-and-forget.
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;

    fn navigate(&self, path: &str, options: NavigateOptions);
}

pub type NavigatorState = Arc<dyn Navigator>;

/// A single `navigate` call as the router received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationCall {
    pub path: String,
    pub options: NavigateOptions,
}

/// HistoryNavigator
///
/// In-memory router with a browser-like history stack. Navigating to the current
/// path leaves the stack untouched. Every call is recorded, including no-ops.
pub struct HistoryNavigator {
    inner: Mutex<History>,
}

struct History {
    entries: Vec<String>,
    calls: Vec<NavigationCall>,
}

impl HistoryNavigator {
    pub fn new(initial_path: &str) -> Self {
        Self {
            inner: Mutex::new(History {
                entries: vec![initial_path.to_string()],
                calls: Vec::new(),
            }),
        }
    }

    /// History entries, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.inner.lock().entries.clone()
    }

    pub fn calls(&self) -> Vec<NavigationCall> {
        self.inner.lock().calls.clone()
    }
}

impl Navigator for HistoryNavigator {
    fn current_path(&self) -> String {
        self.inner.lock().entries.last().cloned().unwrap_or_default()
    }

    fn navigate(&self, path: &str, options: NavigateOptions) {
        let mut history = self.inner.lock();
        history.calls.push(NavigationCall {
            path: path.to_string(),
            options,
        });

        if history.entries.last().is_some_and(|current| current == path) {
            return;
        }

        tracing::debug!(target_path = path, replace = options.replace, "navigating");
        if options.replace {
            if let Some(current) = history.entries.last_mut() {
                *current = path.to_string();
                return;
            }
        }
        history.entries.push(path.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_does_not_grow_history() {
        let nav = HistoryNavigator::new("/dashboard");
        nav.navigate("/auth", NavigateOptions::replace());
        assert_eq!(nav.entries(), ["/auth"]);
        assert_eq!(nav.current_path(), "/auth");
    }

    #[test]
    fn push_grows_history() {
        let nav = HistoryNavigator::new("/");
        nav.navigate("/student", NavigateOptions::default());
        assert_eq!(nav.entries(), ["/", "/student"]);
    }

    #[test]
    fn navigating_to_current_path_is_a_recorded_no_op() {
        let nav = HistoryNavigator::new("/student");
        nav.navigate("/student", NavigateOptions::replace());
        nav.navigate("/student", NavigateOptions::default());
        assert_eq!(nav.entries(), ["/student"]);
        assert_eq!(nav.calls().len(), 2);
    }
}
