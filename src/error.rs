// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{io, result};

use reqwest::StatusCode;
use thiserror::Error;

pub(crate) type Result<T, E = Error> = result::Result<T, E>;

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("IO operation failed: {0}")]
    Io(#[from] io::Error),
    #[error("JSON format error: {0}")]
    Json(serde_json::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("HTTP transport error: {0}")]
    Transport(#[from] Transport),
    #[error("login failed: {0}")]
    Auth(#[from] Auth),
    #[error("your session is missing or has expired, so you need to log in again")]
    Unauthorized,
    #[error("could not load records: {0}")]
    Fetch(Remote),
    #[error("could not save changes: {0}")]
    Write(Remote),
    #[error("{0}")]
    Validation(#[from] Validation),
    #[error("storage error: {0}")]
    Storage(#[from] Storage),
    #[error("password retrieval error: {0}")]
    Password(#[from] Password),
    #[error("command execution failed")]
    Command,
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Lifts a failed read into the error surfaced to views. A rejected
    /// session stays distinguishable from every other failure.
    pub(crate) fn from_read(value: Remote) -> Self {
        match value {
            Remote::Unauthorized => Self::Unauthorized,
            other => Self::Fetch(other),
        }
    }

    pub(crate) fn from_write(value: Remote) -> Self {
        match value {
            Remote::Unauthorized => Self::Unauthorized,
            other => Self::Write(other),
        }
    }

    /// Whether the error should be recorded as the most recent failure of an
    /// operation. Cancellation by the user is not a failure.
    pub(crate) const fn is_failure(&self) -> bool {
        !matches!(*self, Self::Cancelled)
    }
}

impl From<pinentry::Error> for Error {
    fn from(value: pinentry::Error) -> Self {
        // LINT: Deliberate fall-through that should catch future cases added to
        // the enum.
        #[allow(
            clippy::wildcard_enum_match_arm,
            clippy::match_wildcard_for_single_variants
        )]
        match value {
            pinentry::Error::Cancelled | pinentry::Error::Timeout => Self::Cancelled,
            pinentry::Error::Io(e) => Self::Io(e),
            _ => Self::Password(Password::Pinentry(value)),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        // LINT: Deliberate fall-through that should catch future cases added to
        // the enum.
        #[allow(clippy::wildcard_enum_match_arm)]
        match value.classify() {
            serde_json::error::Category::Io => Self::Io(value.into()),
            _ => Self::Json(value),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Io(value.into())
    }
}

/// Failures below the controller boundary: the request never produced an HTTP
/// response.
#[derive(Error, Debug)]
pub(crate) enum Transport {
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("could not build request URL: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Error, Debug)]
pub(crate) enum Auth {
    #[error("{0}")]
    Rejected(String),
    #[error("server accepted the login but did not return a credential")]
    MissingCredential,
    #[error("server sent a cookie that cannot be sent back")]
    MalformedCookie,
    #[error("could not reach the server: {0}")]
    Network(Transport),
}

/// A remote call that reached the controller boundary without success.
#[derive(Error, Debug)]
pub(crate) enum Remote {
    #[error("server rejected the session")]
    Unauthorized,
    #[error("the requested record no longer exists")]
    NotFound,
    #[error("server responded with {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("could not reach the server: {0}")]
    Network(#[from] Transport),
    #[error("server sent a response we could not understand: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub(crate) enum Validation {
    #[error("please select an image to upload")]
    MissingImage,
    #[error("the selected image {0} is empty")]
    EmptyImage(String),
    #[error("the {0} field is required")]
    Required(&'static str),
    #[error("nothing to change")]
    EmptyPatch,
}

#[derive(Error, Debug)]
pub(crate) enum Storage {
    #[error("no suitable location to store session data")]
    NoProjectDirs,
    #[cfg(feature = "secret-service")]
    #[error("secret service error: {0}")]
    SecretService(#[from] oo7::Error),
    #[cfg(feature = "keychain")]
    #[error("keychain error: {0}")]
    Keychain(#[from] security_framework::base::Error),
}

#[derive(Error, Debug)]
pub(crate) enum Password {
    #[error("no password prompt available")]
    NoPrompt,
    #[error("Pinentry implementation error: {0}")]
    Pinentry(pinentry::Error),
}
