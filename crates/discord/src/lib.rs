//! Discord frontend for the counting engine.
//!
//! Thin I/O layer: receives gateway events via serenity, feeds them to
//! `tally_counting::CountingEngine`, and renders the structured outcomes as
//! reactions and replies. No game logic lives here.

pub mod client;
pub mod commands;
pub mod handler;
pub mod render;

pub use {client::build_client, handler::CountingHandler};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Serenity(#[from] serenity::Error),

    #[error(transparent)]
    Counting(#[from] tally_counting::Error),

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
