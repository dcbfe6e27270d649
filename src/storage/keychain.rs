// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use secrecy::{ExposeSecret as _, SecretVec};
use security_framework::os::macos::{
    keychain::{SecKeychain, SecPreferencesDomain},
    keychain_item::SecKeychainItem,
};
use serde::{Deserialize, Serialize};

use crate::error::{self, Result};

use super::{Entry, IsPersistent, Storage};

// errSecItemNotFound
const ITEM_NOT_FOUND: i32 = -25300_i32;

/// A generic password in the macOS login keychain, one per API server.
pub(crate) struct Keychain {
    delegate: SecKeychain,
    entry: Entry,
}

impl Keychain {
    pub(crate) fn new(entry: Entry) -> Result<Self> {
        Ok(Self {
            delegate: SecKeychain::default_for_domain(SecPreferencesDomain::User)
                .map_err(error::Storage::from)?,
            entry,
        })
    }

    fn find(&self) -> Result<Option<(Vec<u8>, SecKeychainItem)>> {
        match self
            .delegate
            .find_generic_password(&self.entry.service(), self.entry.account())
        {
            Ok((password, item)) => Ok(Some((password.to_vec(), item))),
            Err(err) if err.code() == ITEM_NOT_FOUND => Ok(None),
            Err(err) => Err(error::Storage::from(err).into()),
        }
    }
}

impl IsPersistent for Keychain {
    fn is_persistent(&self) -> bool {
        true
    }
}

#[async_trait]
impl<T: for<'de> Deserialize<'de> + Send + Serialize + Sync> Storage<T> for Keychain {
    async fn get(&mut self) -> Result<Option<T>> {
        match self.find()? {
            Some((password, _)) => Ok(Some(serde_json::from_slice(&password)?)),
            None => Ok(None),
        }
    }

    async fn update(&mut self, data: &T) -> Result<()> {
        self.delegate
            .set_generic_password(
                &self.entry.service(),
                self.entry.account(),
                SecretVec::new(serde_json::to_vec(data)?).expose_secret(),
            )
            .map_err(error::Storage::from)?;
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        if let Some((_, item)) = self.find()? {
            item.delete();
        }
        Ok(())
    }
}
