use std::fmt;
use thiserror::Error;

/// Top-level section of a `.skel` stream, in wire order.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Section {
    Header,
    Bones,
    IkConstraints,
    Slots,
    Skins,
    Events,
    Animations,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Section::Header => "header",
            Section::Bones => "bones",
            Section::IkConstraints => "ikConstraints",
            Section::Slots => "slots",
            Section::Skins => "skins",
            Section::Events => "events",
            Section::Animations => "animations",
        })
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("unexpected EOF at offset {offset}: needed {needed} byte(s), {remaining} remaining")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("invalid utf-8 in string at offset {offset} (len={len}): {source}")]
    InvalidEncoding {
        offset: usize,
        len: usize,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("unknown {kind} selector {value} at offset {offset}")]
    UnknownVariant {
        kind: &'static str,
        value: i64,
        offset: usize,
    },

    #[error("{kind} index {index} out of range (len={len}) at offset {offset}")]
    IndexOutOfRange {
        kind: &'static str,
        index: i64,
        len: usize,
        offset: usize,
    },

    #[error("failed to decode {section}[{index}]: {source}")]
    Section {
        section: Section,
        index: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("failed to read skeleton stream: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Innermost error, with any section context stripped.
    pub fn root(&self) -> &Error {
        match self {
            Error::Section { source, .. } => source.root(),
            other => other,
        }
    }

    /// Section context of the outermost wrapper, if any.
    pub fn section(&self) -> Option<(Section, usize)> {
        match self {
            Error::Section { section, index, .. } => Some((*section, *index)),
            _ => None,
        }
    }

    pub(crate) fn in_section(self, section: Section, index: usize) -> Self {
        Error::Section {
            section,
            index,
            source: Box::new(self),
        }
    }
}
