//! Event addressing for NKBIP-01 publications
//!
//! Replaceable events are addressed as `kind:pubkey`, parameterized
//! replaceable events as `kind:pubkey:dtag`. Everything else is only
//! reachable through its event id.

use std::fmt;
use thiserror::Error;

use crate::constants::{is_parameterized_replaceable_kind, is_replaceable_kind};
use crate::id::{is_hex_id, NoteId, Pubkey};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid address format: expected kind:pubkey[:dtag] or a hex event id")]
    InvalidFormat,

    #[error("Invalid kind: {0}")]
    InvalidKind(String),

    #[error("Invalid pubkey: {0}")]
    InvalidPubkey(String),

    #[error("Missing d-tag for parameterized kind {0}")]
    MissingDTag(u32),

    #[error("Kind {kind} cannot be addressed with {segments} segments")]
    ShapeMismatch { kind: u32, segments: usize },
}

/// How a reference is looked up in a backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressShape {
    /// Bare event id
    Id,
    /// `kind:pubkey`
    Replaceable,
    /// `kind:pubkey:dtag`
    Parameterized,
}

/// Event address in format `kind:pubkey` or `kind:pubkey:dtag`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventAddress {
    pub kind: u32,
    pub pubkey: Pubkey,
    pub dtag: Option<String>,
}

impl EventAddress {
    /// Address of a parameterized replaceable event
    pub fn new(kind: u32, pubkey: Pubkey, dtag: impl Into<String>) -> Self {
        Self {
            kind,
            pubkey,
            dtag: Some(dtag.into()),
        }
    }

    /// Address of a plain replaceable event
    pub fn replaceable(kind: u32, pubkey: Pubkey) -> Self {
        Self {
            kind,
            pubkey,
            dtag: None,
        }
    }

    /// Parse an address from an `a` tag value
    ///
    /// The d-tag is everything after the second colon, so it may itself
    /// contain colons.
    pub fn from_a_tag(tag_value: &str) -> Result<Self, AddressError> {
        let parts: Vec<&str> = tag_value.splitn(3, ':').collect();

        if parts.len() < 2 {
            return Err(AddressError::InvalidFormat);
        }

        let kind = parts[0]
            .parse::<u32>()
            .map_err(|_| AddressError::InvalidKind(parts[0].to_string()))?;

        let pubkey_hex = parts[1];
        if pubkey_hex.len() != 64 {
            return Err(AddressError::InvalidPubkey(pubkey_hex.to_string()));
        }
        let pubkey = Pubkey::from_hex(pubkey_hex)
            .map_err(|_| AddressError::InvalidPubkey(pubkey_hex.to_string()))?;

        match parts.get(2) {
            Some(dtag) if is_parameterized_replaceable_kind(kind) => {
                Ok(Self::new(kind, pubkey, *dtag))
            }
            None if is_replaceable_kind(kind) => Ok(Self::replaceable(kind, pubkey)),
            None if is_parameterized_replaceable_kind(kind) => {
                Err(AddressError::MissingDTag(kind))
            }
            _ => Err(AddressError::ShapeMismatch {
                kind,
                segments: parts.len(),
            }),
        }
    }

    pub fn shape(&self) -> AddressShape {
        if self.dtag.is_some() {
            AddressShape::Parameterized
        } else {
            AddressShape::Replaceable
        }
    }

    /// Convert to string format
    pub fn to_string_format(&self) -> String {
        match &self.dtag {
            Some(dtag) => format!("{}:{}:{}", self.kind, self.pubkey.hex(), dtag),
            None => format!("{}:{}", self.kind, self.pubkey.hex()),
        }
    }

    /// Get the pubkey as hex string
    pub fn pubkey_hex(&self) -> String {
        self.pubkey.hex()
    }
}

impl fmt::Display for EventAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_format())
    }
}

impl TryFrom<&str> for EventAddress {
    type Error = AddressError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_a_tag(value)
    }
}

/// A reference to a publication node: either its immutable id or its address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventRef {
    Id(NoteId),
    Address(EventAddress),
}

impl EventRef {
    /// Parse a key, dispatching on its shape.
    ///
    /// A 64 character hex string is an event id, a colon-delimited string
    /// is an address. The two shapes never overlap, so a key is only ever
    /// looked up in one index.
    pub fn parse(key: &str) -> Result<Self, AddressError> {
        if is_hex_id(key) {
            let id = NoteId::from_hex(key).map_err(|_| AddressError::InvalidFormat)?;
            return Ok(EventRef::Id(id));
        }

        if key.contains(':') {
            return EventAddress::from_a_tag(key).map(EventRef::Address);
        }

        Err(AddressError::InvalidFormat)
    }

    pub fn shape(&self) -> AddressShape {
        match self {
            EventRef::Id(_) => AddressShape::Id,
            EventRef::Address(addr) => addr.shape(),
        }
    }
}

impl fmt::Display for EventRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventRef::Id(id) => write!(f, "{id}"),
            EventRef::Address(addr) => write!(f, "{addr}"),
        }
    }
}

impl From<NoteId> for EventRef {
    fn from(id: NoteId) -> Self {
        EventRef::Id(id)
    }
}

impl From<EventAddress> for EventRef {
    fn from(addr: EventAddress) -> Self {
        EventRef::Address(addr)
    }
}

impl TryFrom<&str> for EventRef {
    type Error = AddressError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}
