// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use log::debug;
use reqwest::StatusCode;

use crate::{
    error::Remote,
    http::{Request, Response, Transport},
    session::Session,
};

/// Sends requests on behalf of the current session and classifies the
/// outcome. Every resource call goes through here, so a rejected session is
/// recognized the same way everywhere.
#[derive(Clone)]
pub(crate) struct Client {
    transport: Arc<dyn Transport>,
    session: Arc<Session>,
}

impl Client {
    pub(crate) fn new(transport: Arc<dyn Transport>, session: Arc<Session>) -> Self {
        Self { transport, session }
    }

    pub(crate) async fn execute(&self, mut req: Request) -> Result<Response, Remote> {
        self.session.authorize(&mut req.headers).await?;

        debug!("{} {}", req.method, req.path);
        let resp = self.transport.send(req).await?;
        match resp.status() {
            status if status.is_success() => Ok(resp),
            StatusCode::UNAUTHORIZED => Err(Remote::Unauthorized),
            // CSRF-protected session guards answer 419 once the session behind
            // the cookie has expired.
            status if status.as_u16() == 419 => Err(Remote::Unauthorized),
            StatusCode::NOT_FOUND => Err(Remote::NotFound),
            status => Err(Remote::Status {
                status,
                message: resp.message().unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("unexpected response")
                        .to_owned()
                }),
            }),
        }
    }
}
