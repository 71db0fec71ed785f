//! The editor window protocol.
//!
//! An editor exposes numbered windows. Each open window has a body, a
//! selection (dot), and an address register (addr) that reads and writes
//! of the `data` file operate on. The traits here are the seam between
//! [`crate::replace`] and whatever speaks to the editor; [`memory`] provides
//! an in-process implementation with Acme's semantics.

pub mod memory;

use std::fmt;

pub use memory::{Addressing, Fault, MemoryEditor, MemoryWindow, Op, WindowError};

/// Point addr at the current selection.
pub const CTL_ADDR_DOT: &str = "addr=dot";
/// Make the selection match addr.
pub const CTL_DOT_ADDR: &str = "dot=addr";
/// Window file whose writes replace the text at addr.
pub const DATA_FILE: &str = "data";

/// A range of the window body, in the window's offset unit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    pub q0: usize,
    pub q1: usize,
}

impl Address {
    pub const fn new(q0: usize, q1: usize) -> Self {
        Self { q0, q1 }
    }

    /// Number of offsets spanned (zero if the range is inverted).
    pub const fn len(&self) -> usize {
        self.q1.saturating_sub(self.q0)
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Address {
    /// Formats as an absolute address expression, `#q0,#q1`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{},#{}", self.q0, self.q1)
    }
}

/// Opens windows by id.
pub trait EditorClient {
    type Window: EditorWindow;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open window `id`. The handle is only meant to live for one operation.
    ///
    /// # Errors
    /// Returns an error if the window does not exist or the editor is unreachable.
    fn open(&self, id: usize) -> Result<Self::Window, Self::Error>;
}

/// An open editor window.
///
/// Every method is one blocking round trip to the editor.
pub trait EditorWindow {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the address register.
    ///
    /// The first read through a fresh handle resets addr to `#0,#0`; callers
    /// that rely on addr must prime it with a read before anything else
    /// moves it.
    ///
    /// # Errors
    /// Returns an error if the addr file cannot be read.
    fn read_addr(&mut self) -> Result<Address, Self::Error>;

    /// Read the text of the current selection.
    ///
    /// This sets addr to dot and reads through it, leaving addr collapsed at
    /// the end of the selection.
    ///
    /// # Errors
    /// Returns an error if the selection cannot be read.
    fn selection(&mut self) -> Result<String, Self::Error>;

    /// Send a control command such as [`CTL_ADDR_DOT`].
    ///
    /// # Errors
    /// Returns an error if the editor rejects the command.
    fn ctl(&mut self, command: &str) -> Result<(), Self::Error>;

    /// Write `data` to the named window file, returning the bytes written.
    ///
    /// # Errors
    /// Returns an error if the file is unknown or the write fails.
    fn write(&mut self, file: &str, data: &[u8]) -> Result<usize, Self::Error>;

    /// Set addr from an address expression such as `#3,#8`.
    ///
    /// # Errors
    /// Returns an error if the expression is malformed or out of range.
    fn addr(&mut self, expr: &str) -> Result<(), Self::Error>;

    /// Length of `text` in the unit addresses are measured in.
    ///
    /// Defaults to UTF-8 bytes.
    fn text_len(&self, text: &str) -> usize {
        text.len()
    }
}
