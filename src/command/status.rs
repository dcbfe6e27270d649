// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use serde::Serialize;
use tabled::Tabled;

use crate::error::Result;

/// Show which server we talk to and whether a session is active.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    #[command(flatten)]
    output: super::Output,
}

#[derive(Debug, Serialize, Tabled)]
struct Status {
    #[tabled(rename = "API")]
    api: String,
    #[tabled(rename = "Auth Mode")]
    mode: String,
    #[tabled(rename = "Logged In")]
    authenticated: bool,
    #[tabled(rename = "Stored")]
    persistent: bool,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: super::Context) -> Result<()> {
        let status = Status {
            api: ctx.session.api().to_string(),
            mode: ctx.session.mode().to_string(),
            authenticated: ctx.session.is_authenticated().await,
            persistent: ctx.session.is_persistent().await,
        };
        self.output.print_one(&status)
    }
}
