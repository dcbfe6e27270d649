// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use log::warn;
use secrecy::SecretString;

use crate::{
    error::{self, Error, Result},
    prompt::RequestBuilder,
};

const ATTEMPTS: usize = 3;

/// Log in to the API and remember the session.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The email address of the administrator account.
    #[arg(long, short, env = "VITRINE_EMAIL")]
    email: String,

    /// The password. When it is not given, we ask for it, and ask again if
    /// the server rejects it.
    #[arg(long, env = "VITRINE_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: super::Context) -> Result<()> {
        if let Some(password) = self.password {
            ctx.session
                .login(&self.email, &SecretString::new(password))
                .await?;
            println!("Logged in to {} as {}.", ctx.session.api(), self.email);
            return Ok(());
        }

        let description = format!(
            "Enter the password for {} at {}.",
            self.email,
            ctx.session.api()
        );
        let mut rejection: Option<String> = None;
        for _ in 0..ATTEMPTS {
            let mut req = RequestBuilder::new(&description);
            if let Some(ref message) = rejection {
                req = req.with_error(message);
            }

            let secret = ctx
                .prompt
                .prompt(req.into_request())
                .await?
                .ok_or(error::Password::NoPrompt)?;

            match ctx.session.login(&self.email, &secret).await {
                Ok(()) => {
                    println!("Logged in to {} as {}.", ctx.session.api(), self.email);
                    return Ok(());
                }
                Err(Error::Auth(error::Auth::Rejected(message))) => {
                    warn!("The server rejected the login: {}", message);
                    rejection = Some(message);
                }
                Err(e) => return Err(e),
            }
        }

        Err(error::Auth::Rejected(
            rejection.unwrap_or_else(|| "too many attempts".to_owned()),
        )
        .into())
    }
}
