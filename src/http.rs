// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{
    header::{self, HeaderMap, HeaderValue},
    multipart, Method, StatusCode,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

use crate::{error, metadata};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Part {
    Text(String),
    File {
        file_name: String,
        mime: String,
        bytes: Vec<u8>,
    },
}

/// A `multipart/form-data` payload, kept independent of the transport so that
/// it can be inspected before it is sent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Multipart {
    parts: Vec<(String, Part)>,
}

impl Multipart {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn text<V: Into<String>>(mut self, name: &str, value: V) -> Self {
        self.parts.push((name.to_owned(), Part::Text(value.into())));
        self
    }

    pub(crate) fn file(mut self, name: &str, file_name: &str, mime: &str, bytes: Vec<u8>) -> Self {
        self.parts.push((
            name.to_owned(),
            Part::File {
                file_name: file_name.to_owned(),
                mime: mime.to_owned(),
                bytes,
            },
        ));
        self
    }

    pub(crate) fn parts(&self) -> &[(String, Part)] {
        &self.parts
    }

    fn into_form(self) -> reqwest::Result<multipart::Form> {
        self.parts
            .into_iter()
            .try_fold(multipart::Form::new(), |form, (name, part)| {
                Ok(match part {
                    Part::Text(value) => form.text(name, value),
                    Part::File {
                        file_name,
                        mime,
                        bytes,
                    } => form.part(
                        name,
                        multipart::Part::bytes(bytes)
                            .file_name(file_name)
                            .mime_str(&mime)?,
                    ),
                })
            })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Body {
    Empty,
    Json(serde_json::Value),
    Multipart(Multipart),
}

#[derive(Clone, Debug)]
pub(crate) struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Body,
}

impl Request {
    pub(crate) fn new<P: Into<String>>(method: Method, path: P) -> Self {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json"),
        );
        Self {
            method,
            path: path.into(),
            headers,
            body: Body::Empty,
        }
    }

    pub(crate) fn get<P: Into<String>>(path: P) -> Self {
        Self::new(Method::GET, path)
    }

    pub(crate) fn post<P: Into<String>>(path: P) -> Self {
        Self::new(Method::POST, path)
    }

    pub(crate) fn put<P: Into<String>>(path: P) -> Self {
        Self::new(Method::PUT, path)
    }

    pub(crate) fn delete<P: Into<String>>(path: P) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub(crate) fn with_json<T: Serialize + ?Sized>(
        mut self,
        value: &T,
    ) -> serde_json::Result<Self> {
        self.body = Body::Json(serde_json::to_value(value)?);
        Ok(self)
    }

    pub(crate) fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }
}

/// Some deployments wrap payloads in a `data` member.
#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } | Self::Bare(data) => data,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Clone, Debug)]
pub(crate) struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Response {
    pub(crate) fn new(status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub(crate) const fn status(&self) -> StatusCode {
        self.status
    }

    pub(crate) fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice::<Envelope<T>>(&self.body).map(Envelope::into_inner)
    }

    /// The human-readable `message` member of the body, if the server sent one.
    pub(crate) fn message(&self) -> Option<String> {
        serde_json::from_slice::<ErrorBody>(&self.body)
            .ok()
            .and_then(|body| body.message)
            .filter(|message| !message.trim().is_empty())
    }

    pub(crate) fn cookies(&self) -> impl Iterator<Item = &str> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
    }
}

#[async_trait]
pub(crate) trait Transport: Send + Sync {
    async fn send(&self, req: Request) -> Result<Response, error::Transport>;
}

/// Returns the URL with a trailing slash so that relative paths join beneath
/// it rather than replacing its last segment.
pub(crate) fn directory(url: &Url) -> Url {
    let mut url = url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

pub(crate) struct Reqwest {
    client: reqwest::Client,
    base: Url,
}

impl Reqwest {
    pub(crate) fn new(base: &Url, timeout: Option<Duration>) -> Result<Self, error::Transport> {
        let mut builder = reqwest::Client::builder().user_agent(metadata::USER_AGENT.as_str());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base: directory(base),
        })
    }
}

#[async_trait]
impl Transport for Reqwest {
    async fn send(&self, req: Request) -> Result<Response, error::Transport> {
        let url = self.base.join(req.path.trim_start_matches('/'))?;
        debug!("Sending {} {}", req.method, url);

        let builder = self.client.request(req.method, url).headers(req.headers);
        let builder = match req.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(&value),
            Body::Multipart(form) => builder.multipart(form.into_form()?),
        };

        let resp = builder.send().await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await?.to_vec();
        debug!("Received {} ({} bytes)", status, body.len());

        Ok(Response::new(status, headers, body))
    }
}
