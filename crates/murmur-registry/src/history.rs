//! Window of recently published roots.
//!
//! A proof built against an older snapshot of the registry stays valid while
//! its root is still inside the window.

use std::collections::VecDeque;

use murmur_crypto::Fr;
use murmur_types::DEFAULT_ROOT_HISTORY;

/// Bounded FIFO of accepted roots, newest last.
#[derive(Clone, Debug)]
pub struct RootHistory {
    window: usize,
    roots: VecDeque<Fr>,
}

impl RootHistory {
    /// A window holding at most `window` roots (at least one).
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            roots: VecDeque::with_capacity(window),
        }
    }

    /// A window seeded with the current root.
    pub fn with_root(window: usize, root: Fr) -> Self {
        let mut history = Self::new(window);
        history.push(root);
        history
    }

    /// Publish a new root, evicting the oldest when the window is full.
    ///
    /// Republishing the current root is a no-op.
    pub fn push(&mut self, root: Fr) {
        if self.roots.back() == Some(&root) {
            return;
        }
        if self.roots.len() == self.window {
            self.roots.pop_front();
        }
        self.roots.push_back(root);
    }

    pub fn contains(&self, root: &Fr) -> bool {
        self.roots.contains(root)
    }

    /// The most recently published root.
    pub fn current(&self) -> Option<Fr> {
        self.roots.back().copied()
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

impl Default for RootHistory {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT_HISTORY)
    }
}
