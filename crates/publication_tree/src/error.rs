use thiserror::Error;

use crate::address::AddressError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("parent not found: {0}")]
    ParentNotFound(String),

    #[error("node already in tree: {0}")]
    DuplicateNode(String),

    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("target not found: {0}")]
    TargetNotFound(String),

    #[error("invalid address: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("hex decoding failed")]
    HexDecodeFailed,

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<hex::FromHexError> for Error {
    fn from(_e: hex::FromHexError) -> Self {
        Error::HexDecodeFailed
    }
}
