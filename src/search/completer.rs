use reedline::{Completer, Span, Suggestion};

use crate::store::IndexStore;

pub struct ClassCompleter {
    store: IndexStore,
    limit: usize,
}

impl ClassCompleter {
    pub fn new(store: IndexStore, limit: usize) -> Self {
        Self { store, limit }
    }
}

impl Completer for ClassCompleter {
    /// Completes the whole line: the shell takes one class pattern per line.
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        let Some(before_cursor) = line.get(..pos) else {
            return Vec::new();
        };
        let typed = before_cursor.trim_start();
        // An empty prefix would list the entire index.
        if typed.trim().is_empty() {
            return Vec::new();
        }
        let start = pos - typed.len();

        let names = match self.store.find_class_names(typed.trim_end()) {
            Ok(names) => names,
            Err(err) => {
                tracing::debug!(error = %err, "class completion failed");
                return Vec::new();
            }
        };

        names
            .into_iter()
            .take(self.limit)
            .map(|value| Suggestion {
                value,
                description: None,
                style: None,
                extra: None,
                span: Span { start, end: pos },
                append_whitespace: false,
                match_indices: None,
            })
            .collect()
    }
}
