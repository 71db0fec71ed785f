// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. window::WindowError)
    clippy::module_name_repetitions
)]

//! # acme-select
//!
//! Replace the selection in an Acme window with transformed text.
//!
//! The editor side is reached through the [`window::EditorClient`] and
//! [`window::EditorWindow`] traits. [`replace::replace_selection`] drives
//! them through one fixed sequence of round trips:
//!
//! 1. open the window and prime the address register
//! 2. read the selection and transform it
//! 3. write the result over the selection
//! 4. set addr and dot to cover the new text
//!
//! ## Modules
//!
//! - [`replace`]: the replace-selection operation
//! - [`error`]: step-tagged errors
//! - [`window`]: the window protocol and an in-memory editor
//! - [`transform`]: built-in filters and shell pipes
//! - [`config`]: rc-file defaults for the command-line tool

pub mod config;
pub mod error;
pub mod replace;
pub mod transform;
pub mod window;

pub use error::{ReplaceError, Step};
pub use replace::replace_selection;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{ReplaceError, Step};
    pub use crate::replace::replace_selection;
    pub use crate::transform::{Filter, ShellFilter};
    pub use crate::window::{Address, EditorClient, EditorWindow, MemoryEditor};
}
