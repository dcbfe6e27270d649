// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![deny(elided_lifetimes_in_paths)]
#![warn(
    rust_2018_idioms,
    future_incompatible,
    unused,
    unused_lifetimes,
    unused_qualifications,
    unused_results,
    anonymous_parameters,
    deprecated_in_future,
    elided_lifetimes_in_paths,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    missing_doc_code_examples,
    private_doc_tests,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::unseparated_literal_suffix,
    clippy::decimal_literal_representation,
    clippy::single_char_lifetime_names,
    clippy::fallible_impl_from,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::wildcard_enum_match_arm,
    clippy::deref_by_slicing,
    clippy::default_numeric_fallback,
    clippy::shadow_reuse,
    clippy::clone_on_ref_ptr,
    clippy::todo,
    clippy::string_add,
    clippy::use_debug,
    clippy::future_not_send
)]
#![cfg_attr(not(test), warn(clippy::panic_in_result_fn))]

mod client;
mod command;
mod error;
mod http;
mod metadata;
mod model;
mod prompt;
mod resource;
mod session;
mod storage;

use std::{path::PathBuf, process, sync::Arc, time::Duration};

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use error::{Error, Result};
use log::{error, warn};
use url::Url;

#[derive(Debug, Subcommand)]
enum Command {
    Login(command::login::Command),
    Logout(command::logout::Command),
    Status(command::status::Command),
    #[command(subcommand)]
    Testimonials(command::testimonials::Command),
    #[command(subcommand)]
    Gallery(command::gallery::Command),
}

#[async_trait]
impl command::Command for Command {
    async fn execute(self, ctx: command::Context) -> Result<()> {
        match self {
            Self::Login(cmd) => cmd.execute(ctx).await,
            Self::Logout(cmd) => cmd.execute(ctx).await,
            Self::Status(cmd) => cmd.execute(ctx).await,
            Self::Testimonials(cmd) => cmd.execute(ctx).await,
            Self::Gallery(cmd) => cmd.execute(ctx).await,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// The base URL of the administration API.
    #[arg(long, env = "VITRINE_API_URL", default_value = "http://localhost:8000", value_parser = Url::parse)]
    url: Url,

    /// The base URL that uploaded images are served from. Defaults to the
    /// `storage/` directory of the API URL.
    #[arg(long, env = "VITRINE_STORAGE_URL", value_parser = Url::parse)]
    storage_url: Option<Url>,

    /// How to prove the session to the API: a bearer token, or a session
    /// cookie obtained after a CSRF handshake.
    #[arg(long, env = "VITRINE_AUTH_MODE", value_enum, default_value_t = session::AuthMode::Bearer)]
    auth_mode: session::AuthMode,

    /// Turn off storing the session between invocations.
    #[arg(long)]
    no_cache_session: bool,

    /// The path to the Pinentry program to use when asking for the password
    /// or for confirmation.
    #[arg(long, value_hint = clap::ValueHint::ExecutablePath)]
    pinentry_program: Option<PathBuf>,

    /// Delete without asking for confirmation.
    #[arg(long, short)]
    yes: bool,

    /// Give up on a request after this many seconds.
    #[arg(long, env = "VITRINE_TIMEOUT")]
    timeout: Option<u64>,

    #[clap(subcommand)]
    command: Command,
}

async fn get_session_storage(args: &Args) -> Box<dyn storage::Storage<session::Data>> {
    if !args.no_cache_session {
        #[cfg(feature = "secret-service")]
        match storage::SecretService::new(storage::Entry::new(&args.url)).await {
            Ok(secret_service_storage) => return Box::new(secret_service_storage),
            Err(e) => {
                warn!("We need to fall back to unencrypted file storage because we can't connect to the secret service: {}", e);
            }
        }

        #[cfg(feature = "keychain")]
        match storage::Keychain::new(storage::Entry::new(&args.url)) {
            Ok(keychain_storage) => return Box::new(keychain_storage),
            Err(e) => {
                warn!("We need to fall back to unencrypted file storage because we can't connect to Keychain: {}", e);
            }
        }

        match storage::File::new("session.json").ok_or(error::Storage::NoProjectDirs) {
            Ok(file_storage) => return Box::new(file_storage),
            Err(e) => {
                warn!("The session will only last for this invocation: {}", e);
            }
        }
    }

    Box::new(storage::Memory::<session::Data>::new())
}

async fn run(args: Args) -> Result<()> {
    let api = http::directory(&args.url);
    let storage_url = match args.storage_url {
        Some(ref url) => http::directory(url),
        None => api.join("storage/")?,
    };

    let pinentry = || {
        args.pinentry_program.as_ref().map_or_else(
            prompt::PinentryPrompt::new,
            prompt::PinentryPrompt::new_with_executable,
        )
    };
    let prompts: Vec<Box<dyn prompt::Prompt>> = vec![
        Box::new(pinentry()),
        Box::new(prompt::TerminalPrompt),
    ];
    let confirms: Vec<Box<dyn prompt::Confirm>> = if args.yes {
        vec![Box::new(prompt::AssumeYes)]
    } else {
        vec![Box::new(pinentry()), Box::new(prompt::TerminalPrompt)]
    };

    let transport: Arc<dyn http::Transport> = Arc::new(http::Reqwest::new(
        &api,
        args.timeout.map(Duration::from_secs),
    )?);
    let session = Arc::new(
        session::Session::open(
            Arc::clone(&transport),
            args.auth_mode,
            api,
            get_session_storage(&args).await,
        )
        .await,
    );

    let ctx = command::Context {
        client: client::Client::new(transport, Arc::clone(&session)),
        session,
        prompt: Arc::new(prompts),
        confirm: Arc::new(confirms),
        storage_url,
    };
    command::Command::execute(args.command, ctx).await
}

#[tokio::main]
async fn main() {
    let logger_env = env_logger::Env::new()
        .filter_or("VITRINE_LOG", "warn")
        .write_style("VITRINE_LOG_STYLE");
    env_logger::Builder::from_env(logger_env).init();

    match run(Args::parse()).await {
        Ok(()) => {}
        Err(Error::Cancelled) => {
            warn!("Nothing was changed because the operation was cancelled");
            process::exit(1);
        }
        Err(e @ Error::Unauthorized) => {
            error!("{}; run `{} login`", e, *metadata::CLIENT_TYPE_ID);
            process::exit(1);
        }
        Err(e) => {
            error!("We encountered an error: {}", e);
            process::exit(1);
        }
    }
}
