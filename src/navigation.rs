use serde::Serialize;

use crate::paths::normalize_remote_directory_path;

/// Browser-style back/forward history over remote directories.
///
/// Every stored path is in normalized directory form, so a navigation to the
/// current directory is recognized as a no-op no matter how it was spelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NavigationHistory {
    current: String,
    back_stack: Vec<String>,
    forward_stack: Vec<String>,
}

impl NavigationHistory {
    pub(crate) fn new(start: &str) -> Self {
        Self {
            current: normalize_remote_directory_path(start),
            back_stack: Vec::new(),
            forward_stack: Vec::new(),
        }
    }

    pub(crate) fn current(&self) -> &str {
        &self.current
    }

    pub(crate) fn can_go_back(&self) -> bool {
        !self.back_stack.is_empty()
    }

    pub(crate) fn can_go_forward(&self) -> bool {
        !self.forward_stack.is_empty()
    }

    pub(crate) fn peek_back(&self) -> Option<&str> {
        self.back_stack.last().map(String::as_str)
    }

    pub(crate) fn peek_forward(&self) -> Option<&str> {
        self.forward_stack.last().map(String::as_str)
    }

    /// Enters `target`. Returns false when it already is the current directory.
    pub(crate) fn navigate(&mut self, target: &str) -> bool {
        let target = normalize_remote_directory_path(target);
        if target == self.current {
            return false;
        }

        let previous = std::mem::replace(&mut self.current, target);
        self.back_stack.push(previous);
        self.forward_stack.clear();
        true
    }

    pub(crate) fn back(&mut self) -> Option<&str> {
        let previous = self.back_stack.pop()?;
        let leaving = std::mem::replace(&mut self.current, previous);
        self.forward_stack.push(leaving);
        Some(&self.current)
    }

    pub(crate) fn forward(&mut self) -> Option<&str> {
        let next = self.forward_stack.pop()?;
        let leaving = std::mem::replace(&mut self.current, next);
        self.back_stack.push(leaving);
        Some(&self.current)
    }

    /// Drops both stacks, optionally moving to `path`.
    pub(crate) fn reset(&mut self, path: Option<&str>) {
        self.back_stack.clear();
        self.forward_stack.clear();
        if let Some(path) = path {
            self.current = normalize_remote_directory_path(path);
        }
    }
}
