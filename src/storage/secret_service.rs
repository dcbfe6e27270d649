// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretVec};
use serde::{Deserialize, Serialize};

use crate::error::{self, Result};

use super::{Entry, IsPersistent, Storage};

/// The desktop keyring, with one item per API server.
pub(crate) struct SecretService {
    keyring: oo7::Keyring,
    entry: Entry,
}

impl SecretService {
    pub(crate) async fn new(entry: Entry) -> Result<Self> {
        Ok(Self {
            keyring: oo7::Keyring::new().await.map_err(error::Storage::from)?,
            entry,
        })
    }

    async fn item(&self) -> Result<Option<oo7::Item>> {
        let attributes = self.entry.attributes();
        Ok(self
            .keyring
            .search_items(
                attributes
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.as_str()))
                    .collect(),
            )
            .await
            .map_err(error::Storage::from)?
            .into_iter()
            .next())
    }
}

impl IsPersistent for SecretService {
    fn is_persistent(&self) -> bool {
        true
    }
}

#[async_trait]
impl<T: for<'de> Deserialize<'de> + Send + Serialize + Sync> Storage<T> for SecretService {
    async fn get(&mut self) -> Result<Option<T>> {
        let Some(item) = self.item().await? else {
            return Ok(None);
        };
        let secret = item.secret().await.map_err(error::Storage::from)?;
        Ok(Some(serde_json::from_slice(&secret)?))
    }

    async fn update(&mut self, data: &T) -> Result<()> {
        let attributes = self.entry.attributes();
        self.keyring
            .create_item(
                &self.entry.label(),
                attributes
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.as_str()))
                    .collect(),
                SecretVec::new(serde_json::to_vec(data)?).expose_secret(),
                true,
            )
            .await
            .map_err(error::Storage::from)?;
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        if let Some(item) = self.item().await? {
            item.delete().await.map_err(error::Storage::from)?;
        }
        Ok(())
    }
}
