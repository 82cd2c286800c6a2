//! Handlers behind the `foodninja` subcommands. Each one drives [`AppState`]
//! through [`AppCommand`]s and prints the resulting views.
//!
//! [`AppState`]: crate::app::AppState
//! [`AppCommand`]: crate::app::AppCommand

pub mod chat;
pub mod history;
pub mod offline;
pub mod recognition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Html,
}
