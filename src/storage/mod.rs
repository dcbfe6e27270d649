// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

mod file;
#[cfg(feature = "keychain")]
mod keychain;
mod memory;
#[cfg(feature = "secret-service")]
mod secret_service;

#[cfg(feature = "secret-service")]
use std::collections::HashMap;

use async_trait::async_trait;
#[cfg(any(feature = "secret-service", feature = "keychain", test))]
use url::Url;

use crate::error::Result;
#[cfg(any(feature = "secret-service", feature = "keychain", test))]
use crate::{http, metadata};

pub(crate) use file::File;
#[cfg(feature = "keychain")]
pub(crate) use keychain::Keychain;
pub(crate) use memory::Memory;
#[cfg(feature = "secret-service")]
pub(crate) use secret_service::SecretService;

pub(crate) trait IsPersistent {
    fn is_persistent(&self) -> bool;
}

impl<T: IsPersistent + ?Sized> IsPersistent for Box<T> {
    fn is_persistent(&self) -> bool {
        (**self).is_persistent()
    }
}

/// Somewhere to keep a single value between invocations. Clearing storage that
/// holds nothing is not an error.
#[async_trait]
pub(crate) trait Storage<T>: Send + Sync + IsPersistent {
    async fn get(&mut self) -> Result<Option<T>>;
    async fn update(&mut self, data: &T) -> Result<()>;
    async fn clear(&mut self) -> Result<()>;
}

#[async_trait]
impl<Tn: Sync, T: Storage<Tn> + ?Sized> Storage<Tn> for Box<T> {
    async fn get(&mut self) -> Result<Option<Tn>> {
        (**self).get().await
    }

    async fn update(&mut self, data: &Tn) -> Result<()> {
        (**self).update(data).await
    }

    async fn clear(&mut self) -> Result<()> {
        (**self).clear().await
    }
}

/// Names the keyring item that holds the session for one API server. URLs
/// that differ only by a trailing slash share an item.
#[cfg(any(feature = "secret-service", feature = "keychain", test))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Entry {
    api: Url,
}

#[cfg(any(feature = "secret-service", feature = "keychain", test))]
impl Entry {
    pub(crate) fn new(api: &Url) -> Self {
        Self {
            api: http::directory(api),
        }
    }

    /// Shown to the user by keyring managers.
    pub(crate) fn label(&self) -> String {
        format!(
            "{} session for {}",
            *metadata::CLIENT_DISPLAY_NAME,
            self.api.host_str().unwrap_or_else(|| self.api.as_str())
        )
    }

    pub(crate) fn service(&self) -> String {
        format!("{} API session", *metadata::CLIENT_DISPLAY_NAME)
    }

    pub(crate) fn account(&self) -> &str {
        self.api.as_str()
    }

    #[cfg(feature = "secret-service")]
    pub(crate) fn attributes(&self) -> HashMap<String, String> {
        HashMap::from([
            (
                format!("{}.kind", *metadata::CLIENT_TYPE_ID),
                "session".to_owned(),
            ),
            (
                format!("{}.api", *metadata::CLIENT_TYPE_ID),
                self.account().to_owned(),
            ),
        ])
    }
}
