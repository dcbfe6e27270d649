// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{collections::BTreeMap, fmt, sync::Arc};

use clap::ValueEnum;
use futures_util::lock::Mutex;
use log::{debug, info, warn};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue};
use secrecy::{ExposeSecret as _, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use url::Url;

use crate::{
    error::{self, Result},
    http::{Request, Response, Transport},
    storage::{IsPersistent as _, Storage},
};

const CSRF_COOKIE_PATH: &str = "sanctum/csrf-cookie";
const LOGIN_PATH: &str = "api/login";
const LOGOUT_PATH: &str = "api/logout";
const XSRF_COOKIE: &str = "XSRF-TOKEN";

fn xsrf_header() -> HeaderName {
    HeaderName::from_static("x-xsrf-token")
}

/// How the session credential travels with each request.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub(crate) enum AuthMode {
    /// An `Authorization: Bearer` header with the token issued at login.
    Bearer,
    /// Session cookies primed by a CSRF cookie handshake.
    Cookie,
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.to_possible_value().ok_or(fmt::Error)?;
        write!(f, "{}", value.get_name())
    }
}

/// Secret text that we are willing to write to session storage.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct Token(String);

impl Token {
    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl secrecy::CloneableSecret for Token {}

impl secrecy::SerializableSecret for Token {}

impl secrecy::Zeroize for Token {
    fn zeroize(&mut self) {
        secrecy::Zeroize::zeroize(&mut self.0);
    }
}

pub(crate) type Secret = secrecy::Secret<Token>;

fn secret(value: String) -> Secret {
    Secret::new(Token(value))
}

fn sensitive(value: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut value = HeaderValue::from_str(value)?;
    value.set_sensitive(true);
    Ok(value)
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub(crate) enum Credential {
    Bearer {
        token: Secret,
    },
    Cookie {
        cookies: Secret,
        xsrf: Option<Secret>,
    },
}

impl Credential {
    pub(crate) const fn mode(&self) -> AuthMode {
        match *self {
            Self::Bearer { .. } => AuthMode::Bearer,
            Self::Cookie { .. } => AuthMode::Cookie,
        }
    }

    fn apply(&self, headers: &mut HeaderMap) -> Result<(), InvalidHeaderValue> {
        match *self {
            Self::Bearer { ref token } => {
                let _ = headers.insert(
                    header::AUTHORIZATION,
                    sensitive(&format!("Bearer {}", token.expose_secret().as_str()))?,
                );
            }
            Self::Cookie {
                ref cookies,
                ref xsrf,
            } => {
                let _ = headers.insert(header::COOKIE, sensitive(cookies.expose_secret().as_str())?);
                if let Some(xsrf) = xsrf.as_ref() {
                    let _ = headers.insert(xsrf_header(), sensitive(xsrf.expose_secret().as_str())?);
                }
            }
        }
        Ok(())
    }
}

/// Cookies collected during the cookie-session handshake, in the form they
/// must be replayed.
#[derive(Default)]
struct Jar(BTreeMap<String, String>);

impl Jar {
    fn absorb(&mut self, resp: &Response) {
        for cookie in resp.cookies() {
            let pair = cookie.split(';').next().unwrap_or_default();
            if let Some((name, value)) = pair.split_once('=') {
                let _ = self
                    .0
                    .insert(name.trim().to_owned(), value.trim().to_owned());
            }
        }
    }

    fn xsrf(&self) -> Option<String> {
        let raw = self.0.get(XSRF_COOKIE)?;
        url::form_urlencoded::parse(format!("{XSRF_COOKIE}={raw}").as_bytes())
            .next()
            .map(|(_, value)| value.into_owned())
    }

    fn credential(&self) -> Option<Credential> {
        if self.0.is_empty() {
            return None;
        }

        let cookies = self
            .0
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        Some(Credential::Cookie {
            cookies: secret(cookies),
            xsrf: self.xsrf().map(secret),
        })
    }
}

/// What we persist between invocations. A credential is only honored for the
/// server and mode it was issued under.
#[derive(Clone, Serialize, Deserialize)]
pub(crate) struct Data {
    api: String,
    credential: Credential,
}

impl Data {
    pub(crate) fn new(api: &Url, credential: Credential) -> Self {
        Self {
            api: api.as_str().to_owned(),
            credential,
        }
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default, alias = "token", alias = "credential")]
    access_token: Option<String>,
}

fn accepted(resp: Response) -> Result<Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }

    let message = resp
        .message()
        .unwrap_or_else(|| format!("server responded with status {}", resp.status().as_u16()));
    Err(error::Auth::Rejected(message).into())
}

/// The one session of this process. Only the session mutates the credential;
/// everything else reads it.
pub(crate) struct Session {
    transport: Arc<dyn Transport>,
    mode: AuthMode,
    api: Url,
    storage: Mutex<Box<dyn Storage<Data>>>,
    credential: RwLock<Option<Credential>>,
}

impl Session {
    /// Restores any stored credential issued by `api` under `mode`.
    pub(crate) async fn open(
        transport: Arc<dyn Transport>,
        mode: AuthMode,
        api: Url,
        mut storage: Box<dyn Storage<Data>>,
    ) -> Self {
        let credential = match storage.get().await {
            Ok(Some(data)) if data.api == api.as_str() && data.credential.mode() == mode => {
                debug!("Restored stored {} session for {}", mode, api);
                Some(data.credential)
            }
            Ok(Some(_)) => {
                info!("Ignoring the stored session because it belongs to a different server or authentication mode");
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Ignoring the stored session because we could not read it: {}", e);
                None
            }
        };

        Self {
            transport,
            mode,
            api,
            storage: Mutex::new(storage),
            credential: RwLock::new(credential),
        }
    }

    pub(crate) const fn mode(&self) -> AuthMode {
        self.mode
    }

    pub(crate) fn api(&self) -> &Url {
        &self.api
    }

    pub(crate) async fn is_persistent(&self) -> bool {
        self.storage.lock().await.is_persistent()
    }

    pub(crate) async fn credential(&self) -> Option<Credential> {
        self.credential.read().await.clone()
    }

    pub(crate) async fn is_authenticated(&self) -> bool {
        self.credential.read().await.is_some()
    }

    /// Attaches the current credential to an outgoing request.
    pub(crate) async fn authorize(&self, headers: &mut HeaderMap) -> Result<(), error::Remote> {
        let credential = self.credential().await.ok_or(error::Remote::Unauthorized)?;
        self.decorate(&credential, headers).map_err(|e| {
            warn!("The stored credential cannot be sent: {}", e);
            error::Remote::Unauthorized
        })
    }

    fn decorate(
        &self,
        credential: &Credential,
        headers: &mut HeaderMap,
    ) -> Result<(), InvalidHeaderValue> {
        credential.apply(headers)?;
        if credential.mode() == AuthMode::Cookie {
            // Stateful session guards only honor requests that claim to come
            // from a trusted origin.
            let origin = self.api.origin().ascii_serialization();
            let _ = headers.insert(header::ORIGIN, HeaderValue::from_str(&origin)?);
            let _ = headers.insert(header::REFERER, HeaderValue::from_str(self.api.as_str())?);
        }
        Ok(())
    }

    /// Exchanges an identifier and secret for a credential. On failure the
    /// session is left exactly as it was.
    pub(crate) async fn login(&self, identifier: &str, secret: &SecretString) -> Result<()> {
        let body = LoginRequest {
            email: identifier,
            password: secret.expose_secret(),
        };
        let credential = match self.mode {
            AuthMode::Bearer => self.login_bearer(&body).await?,
            AuthMode::Cookie => self.login_cookie(&body).await?,
        };

        if let Err(e) = self
            .storage
            .lock()
            .await
            .update(&Data::new(&self.api, credential.clone()))
            .await
        {
            warn!("We could not store the session, so it will only last for this invocation: {}", e);
        }
        *self.credential.write().await = Some(credential);

        info!("Logged in to {} as {}", self.api, identifier);
        Ok(())
    }

    async fn login_bearer(&self, body: &LoginRequest<'_>) -> Result<Credential> {
        let resp = self
            .transport
            .send(Request::post(LOGIN_PATH).with_json(body)?)
            .await
            .map_err(error::Auth::Network)?;
        let LoginResponse { access_token } = accepted(resp)?.json()?;

        let token = access_token
            .filter(|token| !token.is_empty())
            .ok_or(error::Auth::MissingCredential)?;
        Ok(Credential::Bearer {
            token: secret(token),
        })
    }

    async fn login_cookie(&self, body: &LoginRequest<'_>) -> Result<Credential> {
        let mut jar = Jar::default();

        let primed = self
            .transport
            .send(Request::get(CSRF_COOKIE_PATH))
            .await
            .map_err(error::Auth::Network)?;
        jar.absorb(&accepted(primed)?);

        let mut req = Request::post(LOGIN_PATH).with_json(body)?;
        if let Some(handshake) = jar.credential() {
            self.decorate(&handshake, &mut req.headers)
                .map_err(|_| error::Auth::MalformedCookie)?;
        } else {
            warn!("The server did not set any cookies during the CSRF handshake");
        }

        let resp = self
            .transport
            .send(req)
            .await
            .map_err(error::Auth::Network)?;
        jar.absorb(&accepted(resp)?);

        jar.credential()
            .ok_or_else(|| error::Auth::MissingCredential.into())
    }

    /// Ends the session. The remote call is best-effort; the local credential
    /// is always discarded.
    pub(crate) async fn logout(&self) {
        let mut req = Request::post(LOGOUT_PATH);
        if let Some(credential) = self.credential().await {
            if let Err(e) = self.decorate(&credential, &mut req.headers) {
                warn!("The stored credential cannot be sent: {}", e);
            }
        }

        match self.transport.send(req).await {
            Ok(resp) if resp.status().is_success() => debug!("The server ended the session"),
            Ok(resp) => warn!(
                "The server did not confirm the logout ({}), so we are only clearing the local session",
                resp.status()
            ),
            Err(e) => warn!(
                "We could not reach the server to log out ({}), so we are only clearing the local session",
                e
            ),
        }

        *self.credential.write().await = None;
        if let Err(e) = self.storage.lock().await.clear().await {
            warn!("We could not remove the stored session: {}", e);
        }
        info!("Logged out of {}", self.api);
    }
}
