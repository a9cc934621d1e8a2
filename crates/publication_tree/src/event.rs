use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::address::{AddressError, EventAddress, EventRef};
use crate::constants::{is_parameterized_replaceable_kind, is_replaceable_kind};
use crate::id::{NoteId, Pubkey};
use crate::Error;

/// A Nostr event as stored in a publication tree
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// 32-bytes sha256 of the the serialized event data
    pub id: NoteId,
    /// 32-bytes hex-encoded public key of the event creator
    pub pubkey: Pubkey,
    /// unix timestamp in seconds
    pub created_at: u64,
    pub kind: u32,
    pub tags: Vec<Vec<String>>,
    pub content: String,
    /// Empty for events built locally that have not been signed yet
    #[serde(default)]
    pub sig: String,
}

impl Event {
    pub fn from_json(s: &str) -> Result<Self, Error> {
        serde_json::from_str(s).map_err(Into::into)
    }

    /// Build an unsigned event, computing its NIP-01 id
    pub fn unsigned(
        pubkey: Pubkey,
        created_at: u64,
        kind: u32,
        tags: Vec<Vec<String>>,
        content: String,
    ) -> Self {
        let id = compute_id(&pubkey, created_at, kind, &tags, &content);
        Self {
            id,
            pubkey,
            created_at,
            kind,
            tags,
            content,
            sig: String::new(),
        }
    }

    /// First value of the tag named `tag_name`
    pub fn tag_value(&self, tag_name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.len() >= 2 && tag[0] == tag_name)
            .map(|tag| tag[1].as_str())
    }

    pub fn title(&self) -> Option<&str> {
        self.tag_value("title")
    }

    pub fn dtag(&self) -> Option<&str> {
        self.tag_value("d")
    }

    /// Derive this event's address from its kind.
    ///
    /// Parameterized replaceable kinds get `kind:pubkey:dtag` (an absent
    /// `d` tag counts as empty), replaceable kinds get `kind:pubkey`, and
    /// every other kind has no address.
    pub fn address(&self) -> Option<EventAddress> {
        if is_parameterized_replaceable_kind(self.kind) {
            Some(EventAddress::new(
                self.kind,
                self.pubkey,
                self.dtag().unwrap_or_default(),
            ))
        } else if is_replaceable_kind(self.kind) {
            Some(EventAddress::replaceable(self.kind, self.pubkey))
        } else {
            None
        }
    }

    /// Outward references declared by `a` and `e` tags, in tag order
    pub fn references(&self) -> Vec<Result<EventRef, AddressError>> {
        self.tags
            .iter()
            .filter(|tag| tag.len() >= 2)
            .filter_map(|tag| match tag[0].as_str() {
                "a" => Some(EventAddress::from_a_tag(&tag[1]).map(EventRef::Address)),
                "e" => Some(
                    NoteId::from_hex(&tag[1])
                        .map(EventRef::Id)
                        .map_err(|_| AddressError::InvalidFormat),
                ),
                _ => None,
            })
            .collect()
    }

    /// Whether this event is what `reference` asked for
    pub fn matches_ref(&self, reference: &EventRef) -> bool {
        match reference {
            EventRef::Id(id) => self.id == *id,
            EventRef::Address(addr) => self.address().as_ref() == Some(addr),
        }
    }
}

/// NIP-01 event id: sha256 of `[0, pubkey, created_at, kind, tags, content]`
pub fn compute_id(
    pubkey: &Pubkey,
    created_at: u64,
    kind: u32,
    tags: &[Vec<String>],
    content: &str,
) -> NoteId {
    let canonical = serde_json::json!([0, pubkey.hex(), created_at, kind, tags, content]);
    let digest = Sha256::digest(canonical.to_string().as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    NoteId::new(bytes)
}
