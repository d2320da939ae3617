use std::io;

use crate::client::Exchange;

/// Errors returned by the client API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Opening, binding or using the socket failed.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    #[error("no such interface: {0}")]
    NoSuchInterface(String),

    /// No valid reply arrived before the exchange timed out.
    #[error("no valid reply to {0}")]
    NoReply(Exchange),

    /// Every ADVERTISE was unusable.
    #[error("no usable server")]
    NoServer,

    /// A server reported NoAddrsAvail while addresses are mandatory.
    #[error("server has no addresses available")]
    NoAddrsAvail,

    #[error("exchange cancelled")]
    Cancelled,

    #[error("lease worker already running")]
    AlreadyRunning,

    /// The client state was lost and the client must be reopened.
    #[error("client closed")]
    Closed,
}

pub type Result<T> = core::result::Result<T, Error>;
