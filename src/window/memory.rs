//! An in-process editor with Acme window semantics.
//!
//! Bodies are ropes. Addresses count characters by default, matching Acme's
//! rune addresses; a window created with [`Addressing::Bytes`] counts UTF-8
//! bytes instead. Dot follows the text it covers when data is written
//! elsewhere in the body.
//! Handles share state with the editor, so edits made through a
//! [`MemoryWindow`] are visible from the [`MemoryEditor`] that opened it.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;
use ropey::Rope;

use super::{Address, CTL_ADDR_DOT, CTL_DOT_ADDR, DATA_FILE, EditorClient, EditorWindow};

static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(#\d+|0|\$)?(?:(,)(#\d+|0|\$)?)?$").expect("address regex is valid")
});

/// A protocol operation, as recorded in the journal and targeted by faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Open,
    ReadAddr,
    Selection,
    Ctl,
    Write,
    Addr,
}

/// A scheduled failure of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fault {
    op: Op,
    skip: usize,
}

impl Fault {
    /// Fail the next `op`.
    pub const fn on(op: Op) -> Self {
        Self { op, skip: 0 }
    }

    /// Let `n` calls of the op succeed before failing.
    pub const fn after(mut self, n: usize) -> Self {
        self.skip = n;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    #[error("no window with id {0}")]
    NoSuchWindow(usize),
    #[error("unknown ctl command {0:?}")]
    UnknownCtl(String),
    #[error("bad address expression {0:?}")]
    BadAddress(String),
    #[error("address {addr} out of range (body length {len})")]
    AddressOutOfRange { addr: Address, len: usize },
    #[error("offset {0} is not on a character boundary")]
    NotCharBoundary(usize),
    #[error("unknown window file {0:?}")]
    UnknownFile(String),
    #[error("written data is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("injected {0:?} failure")]
    Injected(Op),
}

/// The unit a window's addresses count in.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    /// Characters, like Acme's rune offsets.
    #[default]
    Chars,
    /// UTF-8 bytes. Offsets must fall on character boundaries.
    Bytes,
}

impl Addressing {
    pub fn measure(self, text: &str) -> usize {
        match self {
            Self::Chars => text.chars().count(),
            Self::Bytes => text.len(),
        }
    }
}

#[derive(Debug)]
struct WindowState {
    body: Rope,
    addressing: Addressing,
    dot: Address,
    addr: Address,
    dirty: bool,
}

impl WindowState {
    fn new(text: &str, addressing: Addressing) -> Self {
        Self {
            body: Rope::from_str(text),
            addressing,
            dot: Address::default(),
            addr: Address::default(),
            dirty: false,
        }
    }

    fn len(&self) -> usize {
        match self.addressing {
            Addressing::Chars => self.body.len_chars(),
            Addressing::Bytes => self.body.len_bytes(),
        }
    }

    /// Rope char index of an in-range offset.
    fn char_idx(&self, offset: usize) -> Result<usize, WindowError> {
        match self.addressing {
            Addressing::Chars => Ok(offset),
            Addressing::Bytes => {
                let idx = self.body.byte_to_char(offset);
                if self.body.char_to_byte(idx) == offset {
                    Ok(idx)
                } else {
                    Err(WindowError::NotCharBoundary(offset))
                }
            }
        }
    }

    fn check(&self, addr: Address) -> Result<Address, WindowError> {
        if addr.q0 > addr.q1 || addr.q1 > self.len() {
            return Err(WindowError::AddressOutOfRange {
                addr,
                len: self.len(),
            });
        }
        self.char_idx(addr.q0)?;
        self.char_idx(addr.q1)?;
        Ok(addr)
    }

    fn text(&self, addr: Address) -> Result<String, WindowError> {
        let addr = self.check(addr)?;
        let range = self.char_idx(addr.q0)?..self.char_idx(addr.q1)?;
        Ok(self.body.slice(range).to_string())
    }

    fn ctl(&mut self, command: &str) -> Result<(), WindowError> {
        match command.trim() {
            CTL_ADDR_DOT => self.addr = self.dot,
            CTL_DOT_ADDR => self.dot = self.addr,
            "clean" => self.dirty = false,
            "dirty" => self.dirty = true,
            // Undo grouping is not modelled.
            "mark" | "nomark" => {}
            other => return Err(WindowError::UnknownCtl(other.to_string())),
        }
        Ok(())
    }

    /// Replace the text at addr, leaving addr collapsed after the insertion.
    ///
    /// Dot moves with the text around it.
    fn write_data(&mut self, text: &str) -> Result<(), WindowError> {
        let Address { q0, q1 } = self.check(self.addr)?;
        let (c0, c1) = (self.char_idx(q0)?, self.char_idx(q1)?);
        self.body.remove(c0..c1);
        self.body.insert(c0, text);

        let n = self.addressing.measure(text);
        self.dot = shift_for_insert(shift_for_delete(self.dot, q0, q1), q0, n);
        self.addr = Address::new(q0 + n, q0 + n);
        self.dirty = true;
        Ok(())
    }

    fn append_body(&mut self, text: &str) {
        let end = self.len();
        let end_char = self.body.len_chars();
        self.body.insert(end_char, text);
        self.dot = shift_for_insert(self.dot, end, self.addressing.measure(text));
        self.dirty = true;
    }
}

/// Adjust `addr` for the deletion of `q0..q1`. Offsets inside the deleted
/// range land on `q0`.
const fn shift_for_delete(addr: Address, q0: usize, q1: usize) -> Address {
    const fn point(p: usize, q0: usize, q1: usize) -> usize {
        if p <= q0 {
            p
        } else if p <= q1 {
            q0
        } else {
            p - (q1 - q0)
        }
    }
    Address::new(point(addr.q0, q0, q1), point(addr.q1, q0, q1))
}

/// Adjust `addr` for `n` offsets inserted at `at`. An insertion exactly at
/// an edge leaves that edge where it is.
const fn shift_for_insert(addr: Address, at: usize, n: usize) -> Address {
    const fn point(p: usize, at: usize, n: usize) -> usize {
        if at < p { p + n } else { p }
    }
    Address::new(point(addr.q0, at, n), point(addr.q1, at, n))
}

#[derive(Debug, Default)]
struct EditorState {
    windows: BTreeMap<usize, WindowState>,
    next_id: usize,
    faults: Vec<Fault>,
    journal: Vec<Op>,
}

impl EditorState {
    /// Journal `op` and fire any fault scheduled for it.
    fn begin(&mut self, op: Op) -> Result<(), WindowError> {
        self.journal.push(op);
        let Some(idx) = self.faults.iter().position(|f| f.op == op) else {
            return Ok(());
        };
        if self.faults[idx].skip > 0 {
            self.faults[idx].skip -= 1;
            return Ok(());
        }
        self.faults.remove(idx);
        tracing::debug!(?op, "injected failure");
        Err(WindowError::Injected(op))
    }
}

/// An editor holding windows in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryEditor {
    state: Rc<RefCell<EditorState>>,
}

impl MemoryEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a window with `text` as its body and return its id.
    ///
    /// Ids start at 1. Dot starts empty at the beginning of the body.
    /// Addresses count characters.
    pub fn create_window(&self, text: &str) -> usize {
        self.create_window_with(text, Addressing::Chars)
    }

    /// Create a window whose addresses count in `addressing` units.
    pub fn create_window_with(&self, text: &str, addressing: Addressing) -> usize {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = state.next_id;
        state.windows.insert(id, WindowState::new(text, addressing));
        id
    }

    pub fn body(&self, id: usize) -> Option<String> {
        self.state
            .borrow()
            .windows
            .get(&id)
            .map(|w| w.body.to_string())
    }

    pub fn dot(&self, id: usize) -> Option<Address> {
        self.state.borrow().windows.get(&id).map(|w| w.dot)
    }

    /// Select a range, as a user dragging over the text would.
    ///
    /// # Errors
    /// Returns an error if the window does not exist or `dot` is out of range.
    pub fn set_dot(&self, id: usize, dot: Address) -> Result<(), WindowError> {
        let mut state = self.state.borrow_mut();
        let window = state
            .windows
            .get_mut(&id)
            .ok_or(WindowError::NoSuchWindow(id))?;
        window.dot = window.check(dot)?;
        Ok(())
    }

    /// Whether the window body was modified since creation or the last `clean`.
    pub fn is_dirty(&self, id: usize) -> Option<bool> {
        self.state.borrow().windows.get(&id).map(|w| w.dirty)
    }

    /// Schedule a failure; it fires once and is then discarded.
    pub fn inject(&self, fault: Fault) {
        self.state.borrow_mut().faults.push(fault);
    }

    /// Every operation attempted so far, including ones that failed.
    pub fn journal(&self) -> Vec<Op> {
        self.state.borrow().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.state.borrow_mut().journal.clear();
    }
}

impl EditorClient for MemoryEditor {
    type Window = MemoryWindow;
    type Error = WindowError;

    fn open(&self, id: usize) -> Result<MemoryWindow, WindowError> {
        let mut state = self.state.borrow_mut();
        state.begin(Op::Open)?;
        let addressing = state
            .windows
            .get(&id)
            .ok_or(WindowError::NoSuchWindow(id))?
            .addressing;
        tracing::debug!(id, ?addressing, "opened window");
        Ok(MemoryWindow {
            id,
            state: Rc::clone(&self.state),
            addressing,
            addr_open: false,
        })
    }
}

/// A handle to one [`MemoryEditor`] window.
#[derive(Debug)]
pub struct MemoryWindow {
    id: usize,
    state: Rc<RefCell<EditorState>>,
    addressing: Addressing,
    /// Whether this handle has touched the addr file yet.
    addr_open: bool,
}

impl MemoryWindow {
    fn with_window<T>(
        &self,
        op: Op,
        f: impl FnOnce(&mut WindowState) -> Result<T, WindowError>,
    ) -> Result<T, WindowError> {
        let mut state = self.state.borrow_mut();
        state.begin(op)?;
        let window = state
            .windows
            .get_mut(&self.id)
            .ok_or(WindowError::NoSuchWindow(self.id))?;
        f(window)
    }

    /// Opening the addr file resets addr, so the first access through a
    /// handle discards whatever addr held.
    fn touch_addr(&mut self, window: &mut WindowState) {
        if !self.addr_open {
            self.addr_open = true;
            window.addr = Address::default();
        }
    }
}

impl EditorWindow for MemoryWindow {
    type Error = WindowError;

    fn read_addr(&mut self) -> Result<Address, WindowError> {
        let state = Rc::clone(&self.state);
        let mut state = state.borrow_mut();
        state.begin(Op::ReadAddr)?;
        let window = state
            .windows
            .get_mut(&self.id)
            .ok_or(WindowError::NoSuchWindow(self.id))?;
        self.touch_addr(window);
        Ok(window.addr)
    }

    fn selection(&mut self) -> Result<String, WindowError> {
        self.with_window(Op::Selection, |w| {
            let dot = w.check(w.dot)?;
            let text = w.text(dot)?;
            // addr=dot, then reading xdata consumes the range.
            w.addr = Address::new(dot.q1, dot.q1);
            Ok(text)
        })
    }

    fn ctl(&mut self, command: &str) -> Result<(), WindowError> {
        self.with_window(Op::Ctl, |w| w.ctl(command))
    }

    fn write(&mut self, file: &str, data: &[u8]) -> Result<usize, WindowError> {
        let text = std::str::from_utf8(data)?;
        match file {
            DATA_FILE => self.with_window(Op::Write, |w| {
                w.write_data(text)?;
                Ok(data.len())
            }),
            "body" => self.with_window(Op::Write, |w| {
                w.append_body(text);
                Ok(data.len())
            }),
            "ctl" => {
                for line in text.lines().filter(|l| !l.trim().is_empty()) {
                    self.ctl(line)?;
                }
                Ok(data.len())
            }
            "addr" => {
                self.addr(text)?;
                Ok(data.len())
            }
            other => Err(WindowError::UnknownFile(other.to_string())),
        }
    }

    fn addr(&mut self, expr: &str) -> Result<(), WindowError> {
        let state = Rc::clone(&self.state);
        let mut state = state.borrow_mut();
        state.begin(Op::Addr)?;
        let window = state
            .windows
            .get_mut(&self.id)
            .ok_or(WindowError::NoSuchWindow(self.id))?;
        self.touch_addr(window);
        let addr = parse_address(expr, window.len())?;
        window.addr = window.check(addr)?;
        Ok(())
    }

    fn text_len(&self, text: &str) -> usize {
        self.addressing.measure(text)
    }
}

/// Parse the subset of Acme address syntax the helpers need: `#n`, `0`,
/// `$`, and ranges of those joined by a comma with either side optional.
pub(crate) fn parse_address(expr: &str, len: usize) -> Result<Address, WindowError> {
    let trimmed = expr.trim();
    let bad = || WindowError::BadAddress(expr.to_string());
    let caps = ADDRESS_RE.captures(trimmed).ok_or_else(bad)?;

    let point = |atom: &str| -> Result<usize, WindowError> {
        match atom {
            "0" => Ok(0),
            "$" => Ok(len),
            _ => atom[1..].parse().map_err(|_| bad()),
        }
    };

    let left = caps.get(1).map(|m| point(m.as_str())).transpose()?;
    if caps.get(2).is_none() {
        let q = left.ok_or_else(bad)?;
        return Ok(Address::new(q, q));
    }
    let right = caps.get(3).map(|m| point(m.as_str())).transpose()?;
    Ok(Address::new(left.unwrap_or(0), right.unwrap_or(len)))
}
