//! Errors surfaced by [`crate::replace::replace_selection`].

use crate::window::{Address, CTL_DOT_ADDR};

/// A boxed error from a window backend or a transformation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The protocol step a [`ReplaceError`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    OpenWindow,
    ReadAddress,
    ReadSelection,
    Transform,
    Control,
    WriteData,
    SetAddress,
}

#[derive(Debug, thiserror::Error)]
pub enum ReplaceError {
    #[error("opening window {win_id}")]
    WindowOpen {
        win_id: usize,
        #[source]
        source: BoxError,
    },

    #[error("reading addr")]
    AddressRead {
        #[source]
        source: BoxError,
    },

    #[error("addr {addr} cannot end a selection {selection_len} long")]
    InconsistentAddress { addr: Address, selection_len: usize },

    #[error("reading selection")]
    SelectionRead {
        #[source]
        source: BoxError,
    },

    #[error("no selection")]
    EmptySelection,

    #[error("running replacement function")]
    Transform {
        #[source]
        source: BoxError,
    },

    #[error("setting {command}")]
    Ctl {
        command: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("writing data")]
    Write {
        #[source]
        source: BoxError,
    },

    #[error("setting addr to {expr}")]
    AddressSet {
        expr: String,
        #[source]
        source: BoxError,
    },
}

impl ReplaceError {
    pub const fn step(&self) -> Step {
        match self {
            Self::WindowOpen { .. } => Step::OpenWindow,
            Self::AddressRead { .. } | Self::InconsistentAddress { .. } => Step::ReadAddress,
            Self::SelectionRead { .. } | Self::EmptySelection => Step::ReadSelection,
            Self::Transform { .. } => Step::Transform,
            Self::Ctl { .. } => Step::Control,
            Self::Write { .. } => Step::WriteData,
            Self::AddressSet { .. } => Step::SetAddress,
        }
    }

    /// Whether the window body may have changed before the failure.
    ///
    /// Failures from the data write onward are not rolled back: the body may
    /// hold the replacement while dot still covers the old range.
    pub fn may_have_modified_buffer(&self) -> bool {
        match self {
            Self::Write { .. } | Self::AddressSet { .. } => true,
            Self::Ctl { command, .. } => *command == CTL_DOT_ADDR,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;
    use crate::window::CTL_ADDR_DOT;

    fn cause(msg: &str) -> BoxError {
        msg.to_string().into()
    }

    #[test]
    fn test_display_names_the_step_and_source_carries_cause() {
        let err = ReplaceError::Transform {
            source: cause("bad input"),
        };
        assert_eq!(err.to_string(), "running replacement function");
        assert_eq!(err.source().unwrap().to_string(), "bad input");
    }

    #[test]
    fn test_step_classification() {
        assert_eq!(ReplaceError::EmptySelection.step(), Step::ReadSelection);
        assert_eq!(
            ReplaceError::InconsistentAddress {
                addr: Address::new(0, 2),
                selection_len: 5,
            }
            .step(),
            Step::ReadAddress
        );
        assert_eq!(
            ReplaceError::AddressSet {
                expr: "#0,#1".to_string(),
                source: cause("x"),
            }
            .step(),
            Step::SetAddress
        );
    }

    #[test]
    fn test_only_post_write_failures_touch_buffer() {
        let before = ReplaceError::Ctl {
            command: CTL_ADDR_DOT,
            source: cause("x"),
        };
        let after = ReplaceError::Ctl {
            command: CTL_DOT_ADDR,
            source: cause("x"),
        };
        assert!(!before.may_have_modified_buffer());
        assert!(after.may_have_modified_buffer());
        assert!(ReplaceError::Write { source: cause("x") }.may_have_modified_buffer());
        assert!(!ReplaceError::EmptySelection.may_have_modified_buffer());
    }
}
