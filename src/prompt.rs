// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{
    ffi::OsString,
    io::{self, BufRead as _, Write as _},
    path::Path,
};

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::task;

use crate::{error::Result, metadata};

#[derive(Debug, Default, Clone)]
pub(crate) struct Request {
    description: String,
    error: Option<String>,
}

pub(crate) struct RequestBuilder {
    description: String,
    error: Option<String>,
}

impl RequestBuilder {
    pub(crate) fn new(description: &str) -> Self {
        Self {
            description: description.to_owned(),
            error: None,
        }
    }

    pub(crate) fn with_error(mut self, error: &str) -> Self {
        self.error = Some(error.to_owned());
        self
    }

    pub(crate) fn into_request(self) -> Request {
        Request {
            description: self.description,
            error: self.error,
        }
    }
}

/// Asks for a secret. `None` means this prompt is unavailable and the next one
/// should be tried.
#[async_trait]
pub(crate) trait Prompt: Send + Sync {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>>;
}

#[async_trait]
impl<T: Prompt + ?Sized> Prompt for Box<T> {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        (**self).prompt(req).await
    }
}

#[async_trait]
impl<T: Prompt> Prompt for Vec<T> {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        for candidate in self {
            if let r @ (Ok(Some(_)) | Err(_)) = candidate.prompt(req.clone()).await {
                return r;
            }
        }

        Ok(None)
    }
}

/// Asks the user to approve a destructive action. `None` means this prompt is
/// unavailable and the next one should be tried.
#[async_trait]
pub(crate) trait Confirm: Send + Sync {
    async fn confirm(&self, question: &str) -> Result<Option<bool>>;
}

#[async_trait]
impl<T: Confirm + ?Sized> Confirm for Box<T> {
    async fn confirm(&self, question: &str) -> Result<Option<bool>> {
        (**self).confirm(question).await
    }
}

#[async_trait]
impl<T: Confirm> Confirm for Vec<T> {
    async fn confirm(&self, question: &str) -> Result<Option<bool>> {
        for candidate in self {
            if let r @ (Ok(Some(_)) | Err(_)) = candidate.confirm(question).await {
                return r;
            }
        }

        Ok(None)
    }
}

/// Approves everything without asking, for `--yes`.
pub(crate) struct AssumeYes;

#[async_trait]
impl Confirm for AssumeYes {
    async fn confirm(&self, _question: &str) -> Result<Option<bool>> {
        Ok(Some(true))
    }
}

pub(crate) struct PinentryPrompt {
    executable: Option<OsString>,
}

impl PinentryPrompt {
    pub(crate) const fn new() -> Self {
        Self { executable: None }
    }

    pub(crate) fn new_with_executable<P: AsRef<Path>>(executable: P) -> Self {
        Self {
            executable: Some(executable.as_ref().as_os_str().into()),
        }
    }
}

#[async_trait]
impl Prompt for PinentryPrompt {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        fn interact<'input>(
            mut input: pinentry::PassphraseInput<'input>,
            title: &'input str,
            description: &'input str,
            error: Option<&'input String>,
        ) -> Result<SecretString> {
            _ = input.required("You must enter your password to log in.");
            _ = input.with_title(title);
            _ = input.with_description(description);
            _ = input.with_prompt("Password");
            if let Some(e) = error {
                _ = input.with_error(e);
            }

            Ok(input.interact()?)
        }

        let title = format!("Log In - {}", *metadata::CLIENT_DISPLAY_NAME);

        let input = self
            .executable
            .as_ref()
            .and_then(pinentry::PassphraseInput::with_binary)
            .or_else(pinentry::PassphraseInput::with_default_binary)
            .map(|input| {
                task::spawn_blocking(move || {
                    interact(input, &title, &req.description, req.error.as_ref())
                })
            });

        Ok(match input {
            Some(fut) => Some(fut.await??),
            None => None,
        })
    }
}

#[async_trait]
impl Confirm for PinentryPrompt {
    async fn confirm(&self, question: &str) -> Result<Option<bool>> {
        fn interact<'input>(
            mut dialog: pinentry::ConfirmationDialog<'input>,
            title: &'input str,
            question: &str,
        ) -> Result<bool> {
            _ = dialog.with_title(title);
            _ = dialog.with_ok("Delete");
            _ = dialog.with_cancel("Keep");
            Ok(dialog.confirm(question)?)
        }

        let title = format!("Confirm - {}", *metadata::CLIENT_DISPLAY_NAME);
        let question = question.to_owned();

        let dialog = self
            .executable
            .as_ref()
            .and_then(pinentry::ConfirmationDialog::with_binary)
            .or_else(pinentry::ConfirmationDialog::with_default_binary)
            .map(|dialog| task::spawn_blocking(move || interact(dialog, &title, &question)));

        Ok(match dialog {
            Some(fut) => Some(fut.await??),
            None => None,
        })
    }
}

pub(crate) struct TerminalPrompt;

#[async_trait]
impl Prompt for TerminalPrompt {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        if let Some(error) = req.error {
            eprintln!("Error: {error}");
        }

        Ok(Some(
            task::spawn_blocking(|| {
                rpassword::prompt_password("Password: ").map(SecretString::new)
            })
            .await??,
        ))
    }
}

#[async_trait]
impl Confirm for TerminalPrompt {
    async fn confirm(&self, question: &str) -> Result<Option<bool>> {
        let question = question.to_owned();
        let answer = task::spawn_blocking(move || -> io::Result<String> {
            let mut stderr = io::stderr();
            write!(stderr, "{question} [y/N] ")?;
            stderr.flush()?;

            let mut answer = String::new();
            let _ = io::stdin().lock().read_line(&mut answer)?;
            Ok(answer)
        })
        .await??;

        Ok(Some(matches!(
            answer.trim().to_ascii_lowercase().as_str(),
            "y" | "yes"
        )))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Answers every question the same way and remembers what it was asked.
    pub(crate) struct Scripted {
        answer: bool,
        asked: Mutex<Vec<String>>,
    }

    impl Scripted {
        pub(crate) fn new(answer: bool) -> Self {
            Self {
                answer,
                asked: Mutex::new(vec![]),
            }
        }

        pub(crate) fn asked(&self) -> Vec<String> {
            self.asked.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Confirm for Scripted {
        async fn confirm(&self, question: &str) -> Result<Option<bool>> {
            self.asked.lock().unwrap().push(question.to_owned());
            Ok(Some(self.answer))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{testing::Scripted, *};

    struct Unavailable;

    #[async_trait]
    impl Confirm for Unavailable {
        async fn confirm(&self, _question: &str) -> Result<Option<bool>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn confirm_chain_uses_first_available_prompt() -> Result<()> {
        let chain: Vec<Box<dyn Confirm>> = vec![
            Box::new(Unavailable),
            Box::new(Scripted::new(false)),
            Box::new(AssumeYes),
        ];
        assert_eq!(chain.confirm("Are you sure?").await?, Some(false));

        let empty: Vec<Box<dyn Confirm>> = vec![Box::new(Unavailable)];
        assert_eq!(empty.confirm("Are you sure?").await?, None);
        Ok(())
    }
}
