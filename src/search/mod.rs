//! Interactive class search: type part of a class name, Tab through the
//! matching names, Enter to list the archives that contain them.

mod completer;
mod prompt;
pub mod view;

use anyhow::Result;
use reedline::{
    ColumnarMenu, Emacs, KeyCode, KeyModifiers, MenuBuilder, Reedline, ReedlineEvent,
    ReedlineMenu, Signal, default_emacs_keybindings,
};

pub use self::completer::ClassCompleter;
use self::prompt::SearchPrompt;
use crate::store::IndexStore;

const COMPLETION_MENU: &str = "completion_menu";
pub const MAX_SUGGESTIONS: usize = 50;

pub struct SearchShell {
    store: IndexStore,
}

impl SearchShell {
    pub fn new(store: IndexStore) -> Self {
        Self { store }
    }

    pub fn run(&self) -> Result<()> {
        let mut line_editor = self.setup_line_editor();
        let prompt = SearchPrompt;

        println!("Type part of a class name. Tab completes, Enter searches, 'exit' quits.");
        loop {
            let query = match line_editor.read_line(&prompt)? {
                Signal::Success(buffer) => buffer,
                _ => break,
            };
            let query = query.trim();
            if query.is_empty() {
                continue;
            }
            if query == "exit" || query == "quit" {
                break;
            }

            match self.store.find_archives_for_class(query) {
                Ok(hits) => println!("{}", view::render_hits(query, &hits, true)),
                Err(err) => {
                    tracing::error!(error = %err, "search failed");
                    eprintln!("Error: {err}");
                }
            }
        }
        Ok(())
    }

    fn setup_line_editor(&self) -> Reedline {
        let completer = Box::new(ClassCompleter::new(self.store.clone(), MAX_SUGGESTIONS));
        let completion_menu = Box::new(ColumnarMenu::default().with_name(COMPLETION_MENU));

        let mut keybindings = default_emacs_keybindings();
        keybindings.add_binding(
            KeyModifiers::NONE,
            KeyCode::Tab,
            ReedlineEvent::UntilFound(vec![
                ReedlineEvent::Menu(COMPLETION_MENU.to_string()),
                ReedlineEvent::MenuNext,
            ]),
        );

        Reedline::create()
            .with_completer(completer)
            .with_menu(ReedlineMenu::EngineCompleter(completion_menu))
            .with_edit_mode(Box::new(Emacs::new(keybindings)))
    }
}
