// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};
use url::Url;

use crate::{
    client::Client,
    error::Result,
    prompt::{Confirm, Prompt},
    resource::{Controller, Resource},
    session::Session,
};

pub(crate) mod gallery;
pub(crate) mod login;
pub(crate) mod logout;
pub(crate) mod status;
pub(crate) mod testimonials;

/// Everything a command needs to talk to the API and the user.
pub(crate) struct Context {
    pub(crate) session: Arc<Session>,
    pub(crate) client: Client,
    pub(crate) prompt: Arc<dyn Prompt>,
    pub(crate) confirm: Arc<dyn Confirm>,
    pub(crate) storage_url: Url,
}

impl Context {
    pub(crate) fn controller<R: Resource>(&self) -> Controller<R> {
        Controller::new(self.client.clone(), Arc::clone(&self.confirm))
    }
}

#[async_trait]
pub(crate) trait Command {
    async fn execute(self, ctx: Context) -> Result<()>;
}

/// Output shared by every command that prints records.
#[derive(Debug, Default, clap::Args)]
pub(crate) struct Output {
    /// Print JSON instead of a table.
    #[arg(long)]
    json: bool,
}

impl Output {
    pub(crate) fn print<T: Serialize + Tabled>(&self, items: &[T]) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(items)?);
        } else if !items.is_empty() {
            println!("{}", Table::new(items).with(Style::rounded()));
        }
        Ok(())
    }

    pub(crate) fn print_one<T: Serialize + Tabled>(&self, item: &T) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(item)?);
            Ok(())
        } else {
            self.print(std::slice::from_ref(item))
        }
    }
}
