// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{collections::HashSet, sync::Arc};

use log::{debug, info, warn};
use serde::de::DeserializeOwned;

use crate::{
    client::Client,
    error::{Error, Remote, Result},
    http::{Body, Request},
    prompt::Confirm,
};

/// A kind of record the API keeps a collection of.
pub(crate) trait Resource: DeserializeOwned + Clone + Send + Sync {
    /// What the user supplies to create one.
    type New: Send + Sync;

    /// Human-readable singular name.
    const NAME: &'static str;
    /// Collection endpoint relative to the API base URL.
    const PATH: &'static str;

    fn id(&self) -> u64;

    /// Checks `input` and encodes it for the create request. Fails without
    /// touching the network when a required field is missing.
    fn create_body(input: &Self::New) -> Result<Body>;
}

/// A resource that can be changed after it is created. The server replaces
/// the whole record, so every update carries all of its fields.
pub(crate) trait Updatable: Resource {
    type Patch: Send + Sync;

    /// Rejects a patch that can never be sent, before any request is made.
    fn check_patch(patch: &Self::Patch) -> Result<()>;

    /// Encodes `current` with `patch` applied over it.
    fn update_body(current: &Self, patch: &Self::Patch) -> Result<Body>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum State {
    Uninitialized,
    Loading,
    Ready,
    Errored,
}

/// Owns the local copy of one remote collection. The copy only ever changes
/// to reflect a response the server has already confirmed.
pub(crate) struct Controller<R> {
    client: Client,
    confirm: Arc<dyn Confirm>,
    items: Vec<R>,
    state: State,
    error: Option<String>,
}

impl<R: Resource> Controller<R> {
    pub(crate) fn new(client: Client, confirm: Arc<dyn Confirm>) -> Self {
        Self {
            client,
            confirm,
            items: vec![],
            state: State::Uninitialized,
            error: None,
        }
    }

    /// The collection, newest first.
    pub(crate) fn items(&self) -> &[R] {
        &self.items
    }

    pub(crate) fn get(&self, id: u64) -> Option<&R> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub(crate) const fn state(&self) -> State {
        self.state
    }

    /// The message of the most recent failed operation, cleared by the next
    /// successful one.
    pub(crate) fn last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        match result {
            Ok(_) => self.error = None,
            Err(ref e) if e.is_failure() => self.error = Some(e.to_string()),
            Err(_) => {}
        }
        result
    }

    fn member(id: u64) -> String {
        format!("{}/{}", R::PATH, id)
    }

    /// Replaces the collection with the server's, in the server's order.
    pub(crate) async fn list(&mut self) -> Result<&[R]> {
        let prior = self.state;
        self.state = State::Loading;

        match self.fetch().await {
            Ok(mut items) => {
                let mut seen = HashSet::new();
                items.retain(|item| seen.insert(item.id()));
                debug!("Loaded {} {} records", items.len(), R::NAME);

                self.items = items;
                self.state = State::Ready;
                self.error = None;
                Ok(&self.items)
            }
            Err(e) => {
                self.state = if prior == State::Ready {
                    State::Ready
                } else {
                    State::Errored
                };
                self.record(Err(e))
            }
        }
    }

    async fn fetch(&self) -> Result<Vec<R>> {
        let resp = self
            .client
            .execute(Request::get(R::PATH))
            .await
            .map_err(Error::from_read)?;
        resp.json()
            .map_err(|e| Error::from_read(Remote::Decode(e)))
    }

    /// Creates a record and puts it at the front of the collection.
    pub(crate) async fn create(&mut self, input: &R::New) -> Result<R> {
        let result = self.send_create(input).await;
        if let Ok(ref created) = result {
            self.items.retain(|item| item.id() != created.id());
            self.items.insert(0, created.clone());
            info!("Created {} {}", R::NAME, created.id());
        }
        self.record(result)
    }

    async fn send_create(&self, input: &R::New) -> Result<R> {
        let body = R::create_body(input)?;
        let resp = self
            .client
            .execute(Request::post(R::PATH).with_body(body))
            .await
            .map_err(Error::from_write)?;
        resp.json()
            .map_err(|e| Error::from_write(Remote::Decode(e)))
    }

    /// Deletes a record once the user confirms it.
    pub(crate) async fn delete(&mut self, id: u64) -> Result<()> {
        let question = format!(
            "Are you sure you want to delete {} {}? This cannot be undone.",
            R::NAME,
            id
        );
        match self.confirm.confirm(&question).await {
            Ok(Some(true)) => {}
            Ok(Some(false)) | Err(Error::Cancelled) => return Err(Error::Cancelled),
            Ok(None) => {
                warn!("We have no way to ask for confirmation, so nothing was deleted (pass --yes to skip it)");
                return Err(Error::Cancelled);
            }
            Err(e) => return self.record(Err(e)),
        }

        let result = self
            .client
            .execute(Request::delete(Self::member(id)))
            .await
            .map(|_| ())
            .map_err(Error::from_write);
        if result.is_ok() {
            self.items.retain(|item| item.id() != id);
            info!("Deleted {} {}", R::NAME, id);
        }
        self.record(result)
    }
}

impl<R: Updatable> Controller<R> {
    /// Applies `patch` to a record, keeping its position in the collection.
    pub(crate) async fn update(&mut self, id: u64, patch: &R::Patch) -> Result<R> {
        let result = self.send_update(id, patch).await;
        if let Ok(ref updated) = result {
            if let Some(slot) = self.items.iter_mut().find(|item| item.id() == id) {
                *slot = updated.clone();
            }
            info!("Updated {} {}", R::NAME, id);
        }
        self.record(result)
    }

    async fn send_update(&self, id: u64, patch: &R::Patch) -> Result<R> {
        R::check_patch(patch)?;
        let current = match self.get(id) {
            Some(item) => item.clone(),
            None => self.fetch_one(id).await?,
        };

        let body = R::update_body(&current, patch)?;
        let resp = self
            .client
            .execute(Request::put(Self::member(id)).with_body(body))
            .await
            .map_err(Error::from_write)?;
        resp.json()
            .map_err(|e| Error::from_write(Remote::Decode(e)))
    }

    async fn fetch_one(&self, id: u64) -> Result<R> {
        debug!("{} {} is not loaded, so we fetch it before updating", R::NAME, id);
        let resp = self
            .client
            .execute(Request::get(Self::member(id)))
            .await
            .map_err(Error::from_write)?;
        resp.json()
            .map_err(|e| Error::from_write(Remote::Decode(e)))
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;
    use secrecy::SecretString;
    use serde_json::json;

    use super::*;
    use crate::{
        error::{self, Validation},
        http::testing::Fake,
        model::{GalleryImage, NewGalleryImage, NewTestimonial, Testimonial, TestimonialPatch},
        prompt::testing::Scripted,
        session::{
            testing::{anonymous, api, authenticated},
            AuthMode, Data, Session,
        },
        storage::Memory,
    };

    fn seeded() -> serde_json::Value {
        json!([
            {"id": 3, "name": "Sari", "title": "Owner", "message": "Reliable supplier."},
            {"id": 2, "name": "Budi", "title": null, "message": "Fast delivery."},
            {"id": 1, "name": "Ayu", "message": "Friendly staff."},
        ])
    }

    async fn testimonials(transport: &Arc<Fake>, answer: bool) -> (Controller<Testimonial>, Arc<Scripted>) {
        let confirm = Arc::new(Scripted::new(answer));
        let client = Client::new(transport.clone(), authenticated(transport.clone()).await);
        (Controller::new(client, confirm.clone()), confirm)
    }

    fn ids<R: Resource>(controller: &Controller<R>) -> Vec<u64> {
        controller.items().iter().map(Resource::id).collect()
    }

    #[tokio::test]
    async fn list_replaces_collection_in_server_order() -> Result<()> {
        let transport = Fake::new();
        transport.reply(200, seeded());
        transport.reply(200, json!([{"id": 4, "name": "Dewi", "message": "Great!"}]));
        let (mut controller, _) = testimonials(&transport, true).await;
        assert_eq!(controller.state(), State::Uninitialized);

        assert_eq!(controller.list().await?.len(), 3);
        assert_eq!(ids(&controller), vec![3, 2, 1]);
        assert_eq!(controller.state(), State::Ready);

        let _ = controller.list().await?;
        assert_eq!(ids(&controller), vec![4]);
        assert_eq!(transport.requests()[0].path, "api/testimonials");
        Ok(())
    }

    #[tokio::test]
    async fn list_drops_duplicate_ids() -> Result<()> {
        let transport = Fake::new();
        transport.reply(
            200,
            json!([
                {"id": 2, "name": "Budi", "message": "First."},
                {"id": 2, "name": "Budi", "message": "Second."},
                {"id": 1, "name": "Ayu", "message": "Third."},
            ]),
        );
        let (mut controller, _) = testimonials(&transport, true).await;

        let _ = controller.list().await?;
        assert_eq!(ids(&controller), vec![2, 1]);
        assert_eq!(controller.items()[0].body, "First.");
        Ok(())
    }

    #[tokio::test]
    async fn failed_first_list_is_errored() {
        let transport = Fake::new();
        transport.reply(500, json!({"message": "Server Error"}));
        let (mut controller, _) = testimonials(&transport, true).await;

        let err = controller.list().await.unwrap_err();
        assert!(matches!(err, Error::Fetch(Remote::Status { .. })));
        assert_eq!(controller.state(), State::Errored);
        assert!(controller.items().is_empty());
        assert_eq!(
            controller.last_error(),
            Some("could not load records: server responded with 500 Internal Server Error: Server Error")
        );
    }

    #[tokio::test]
    async fn failed_list_keeps_previous_collection() -> Result<()> {
        let transport = Fake::new();
        transport.reply(200, seeded());
        transport.fail();
        transport.reply(200, json!({"unexpected": true}));
        transport.reply(200, seeded());
        let (mut controller, _) = testimonials(&transport, true).await;
        let _ = controller.list().await?;
        let before = controller.items().to_vec();

        assert!(matches!(
            controller.list().await,
            Err(Error::Fetch(Remote::Network(_)))
        ));
        assert_eq!(controller.items(), before.as_slice());
        assert_eq!(controller.state(), State::Ready);

        assert!(matches!(
            controller.list().await,
            Err(Error::Fetch(Remote::Decode(_)))
        ));
        assert_eq!(controller.items(), before.as_slice());
        assert!(controller.last_error().is_some());

        let _ = controller.list().await?;
        assert_eq!(controller.last_error(), None);
        Ok(())
    }

    #[tokio::test]
    async fn unauthorized_list_is_distinct_and_leaves_collection() -> Result<()> {
        let transport = Fake::new();
        transport.reply(200, seeded());
        transport.reply(401, json!({"message": "Unauthenticated."}));
        let (mut controller, _) = testimonials(&transport, true).await;
        let _ = controller.list().await?;

        assert!(matches!(controller.list().await, Err(Error::Unauthorized)));
        assert_eq!(ids(&controller), vec![3, 2, 1]);
        Ok(())
    }

    #[tokio::test]
    async fn create_prepends_server_record() -> Result<()> {
        let transport = Fake::new();
        transport.reply(200, seeded());
        transport.reply(
            201,
            json!({"id": 42, "name": "Jane", "title": null, "message": "Great service"}),
        );
        let (mut controller, _) = testimonials(&transport, true).await;
        let _ = controller.list().await?;

        let created = controller
            .create(&NewTestimonial {
                author: "Jane".to_owned(),
                title: None,
                body: "Great service".to_owned(),
            })
            .await?;

        assert_eq!(created.id, 42);
        assert_eq!(ids(&controller), vec![42, 3, 2, 1]);
        assert_eq!(controller.items()[0], created);

        let requests = transport.requests();
        assert_eq!(requests[1].method, Method::POST);
        assert_eq!(requests[1].path, "api/testimonials");
        Ok(())
    }

    #[tokio::test]
    async fn failed_create_leaves_collection() -> Result<()> {
        let transport = Fake::new();
        transport.reply(200, seeded());
        transport.reply(422, json!({"message": "The name field is required."}));
        let (mut controller, _) = testimonials(&transport, true).await;
        let _ = controller.list().await?;

        let err = controller
            .create(&NewTestimonial {
                author: "Jane".to_owned(),
                title: None,
                body: "Great service".to_owned(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Write(Remote::Status { .. })));
        assert_eq!(ids(&controller), vec![3, 2, 1]);
        assert_eq!(controller.state(), State::Ready);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_create_never_reaches_server() {
        let transport = Fake::new();
        let session = authenticated(transport.clone()).await;
        let mut controller: Controller<GalleryImage> = Controller::new(
            Client::new(transport.clone(), session),
            Arc::new(Scripted::new(true)),
        );

        let err = controller
            .create(&NewGalleryImage {
                title: Some("Storefront".to_owned()),
                image: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(Validation::MissingImage)));
        assert_eq!(transport.request_count(), 0);
        assert_eq!(controller.last_error(), Some("please select an image to upload"));
    }

    #[tokio::test]
    async fn update_replaces_in_place() -> Result<()> {
        let transport = Fake::new();
        transport.reply(200, seeded());
        transport.reply(
            200,
            json!({"id": 2, "name": "Budi", "title": "Chef", "message": "Fast delivery."}),
        );
        let (mut controller, _) = testimonials(&transport, true).await;
        let _ = controller.list().await?;
        let before = controller.items().to_vec();

        let updated = controller
            .update(
                2,
                &TestimonialPatch {
                    title: Some("Chef".to_owned()),
                    ..TestimonialPatch::default()
                },
            )
            .await?;

        assert_eq!(updated.title.as_deref(), Some("Chef"));
        assert_eq!(ids(&controller), vec![3, 2, 1]);
        assert_eq!(controller.get(2), Some(&updated));
        assert_eq!(controller.items()[0], before[0]);
        assert_eq!(controller.items()[2], before[2]);

        let requests = transport.requests();
        assert_eq!(requests[1].method, Method::PUT);
        assert_eq!(requests[1].path, "api/testimonials/2");
        assert_eq!(
            requests[1].body,
            Body::Json(json!({"name": "Budi", "title": "Chef", "message": "Fast delivery."}))
        );
        Ok(())
    }

    #[tokio::test]
    async fn update_fetches_record_that_is_not_loaded() -> Result<()> {
        let transport = Fake::new();
        transport.reply(
            200,
            json!({"id": 3, "name": "Sari", "title": "Owner", "message": "Reliable supplier."}),
        );
        transport.reply(
            200,
            json!({"id": 3, "name": "Sari", "title": "Owner", "message": "Still reliable."}),
        );
        let (mut controller, _) = testimonials(&transport, true).await;

        let updated = controller
            .update(
                3,
                &TestimonialPatch {
                    body: Some("Still reliable.".to_owned()),
                    ..TestimonialPatch::default()
                },
            )
            .await?;
        assert_eq!(updated.body, "Still reliable.");
        assert!(controller.items().is_empty());

        let requests = transport.requests();
        assert_eq!(requests[0].method, Method::GET);
        assert_eq!(requests[0].path, "api/testimonials/3");
        assert_eq!(requests[1].method, Method::PUT);
        assert_eq!(
            requests[1].body,
            Body::Json(json!({"name": "Sari", "title": "Owner", "message": "Still reliable."}))
        );
        Ok(())
    }

    #[tokio::test]
    async fn empty_update_never_reaches_server() {
        let transport = Fake::new();
        let (mut controller, _) = testimonials(&transport, true).await;

        assert!(matches!(
            controller.update(3, &TestimonialPatch::default()).await,
            Err(Error::Validation(Validation::EmptyPatch))
        ));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn unauthorized_update_leaves_collection() -> Result<()> {
        let transport = Fake::new();
        transport.reply(200, seeded());
        transport.reply(401, json!({"message": "Unauthenticated."}));
        let (mut controller, _) = testimonials(&transport, true).await;
        let _ = controller.list().await?;
        let before = controller.items().to_vec();

        let result = controller
            .update(
                2,
                &TestimonialPatch {
                    title: Some("Chef".to_owned()),
                    ..TestimonialPatch::default()
                },
            )
            .await;
        assert!(matches!(result, Err(Error::Unauthorized)));
        assert_eq!(controller.items(), before.as_slice());
        Ok(())
    }

    #[tokio::test]
    async fn unauthorized_create_leaves_collection() -> Result<()> {
        let transport = Fake::new();
        transport.reply(200, seeded());
        transport.reply(401, json!({"message": "Unauthenticated."}));
        let (mut controller, _) = testimonials(&transport, true).await;
        let _ = controller.list().await?;
        let before = controller.items().to_vec();

        let result = controller
            .create(&NewTestimonial {
                author: "Jane".to_owned(),
                title: None,
                body: "Great service".to_owned(),
            })
            .await;
        assert!(matches!(result, Err(Error::Unauthorized)));
        assert_eq!(controller.items(), before.as_slice());
        Ok(())
    }

    #[tokio::test]
    async fn update_of_missing_record_is_not_found() -> Result<()> {
        let transport = Fake::new();
        transport.reply(200, seeded());
        transport.reply(404, json!({"message": "No query results."}));
        let (mut controller, _) = testimonials(&transport, true).await;
        let _ = controller.list().await?;
        let before = controller.items().to_vec();

        let err = controller
            .update(
                9,
                &TestimonialPatch {
                    body: Some("Hello".to_owned()),
                    ..TestimonialPatch::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Write(Remote::NotFound)));
        assert_eq!(controller.items(), before.as_slice());
        assert_eq!(transport.request_count(), 2);
        assert_eq!(transport.requests()[1].path, "api/testimonials/9");
        Ok(())
    }

    #[tokio::test]
    async fn delete_removes_exactly_one_record() -> Result<()> {
        let transport = Fake::new();
        transport.reply(200, seeded());
        transport.reply(204, json!(null));
        let (mut controller, confirm) = testimonials(&transport, true).await;
        let _ = controller.list().await?;

        controller.delete(2).await?;

        assert_eq!(ids(&controller), vec![3, 1]);
        assert!(controller.get(2).is_none());
        assert_eq!(confirm.asked().len(), 1);
        assert_eq!(transport.requests()[1].method, Method::DELETE);
        assert_eq!(transport.requests()[1].path, "api/testimonials/2");
        Ok(())
    }

    #[tokio::test]
    async fn declined_delete_sends_nothing() -> Result<()> {
        let transport = Fake::new();
        transport.reply(200, seeded());
        let (mut controller, confirm) = testimonials(&transport, false).await;
        let _ = controller.list().await?;

        assert!(matches!(controller.delete(2).await, Err(Error::Cancelled)));
        assert_eq!(ids(&controller), vec![3, 2, 1]);
        assert_eq!(transport.request_count(), 1);
        assert_eq!(
            confirm.asked(),
            vec!["Are you sure you want to delete testimonial 2? This cannot be undone.".to_owned()]
        );
        assert_eq!(controller.last_error(), None);
        Ok(())
    }

    #[tokio::test]
    async fn unauthorized_delete_leaves_collection() -> Result<()> {
        let transport = Fake::new();
        transport.reply(200, seeded());
        transport.reply(401, json!({"message": "Unauthenticated."}));
        let (mut controller, _) = testimonials(&transport, true).await;
        let _ = controller.list().await?;

        assert!(matches!(controller.delete(3).await, Err(Error::Unauthorized)));
        assert_eq!(ids(&controller), vec![3, 2, 1]);
        Ok(())
    }

    #[tokio::test]
    async fn gallery_lists_and_deletes() -> Result<()> {
        let transport = Fake::new();
        transport.reply(
            200,
            json!([
                {"id": 5, "title": "Storefront", "alt_text": "Front of the shop", "image_path": "galleries/front.jpg"},
                {"id": 4, "title": null, "image_path": "galleries/back.jpg"},
            ]),
        );
        transport.reply(200, json!({"message": "Deleted"}));
        let mut controller: Controller<GalleryImage> = Controller::new(
            Client::new(transport.clone(), authenticated(transport.clone()).await),
            Arc::new(Scripted::new(true)),
        );

        let _ = controller.list().await?;
        assert_eq!(ids(&controller), vec![5, 4]);

        controller.delete(5).await?;
        assert_eq!(ids(&controller), vec![4]);
        assert_eq!(transport.requests()[1].path, "api/gallery/5");
        Ok(())
    }

    #[tokio::test]
    async fn anonymous_session_cannot_list() {
        let transport = Fake::new();
        let mut controller: Controller<Testimonial> = Controller::new(
            Client::new(transport.clone(), anonymous(transport.clone()).await),
            Arc::new(Scripted::new(true)),
        );

        assert!(matches!(controller.list().await, Err(Error::Unauthorized)));
        assert_eq!(controller.state(), State::Errored);
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn admin_manages_testimonials_end_to_end() -> Result<()> {
        let transport = Fake::new();
        transport.reply(401, json!({"message": "Invalid login details"}));
        transport.reply(200, json!({"access_token": "1|abcdef"}));
        transport.reply(200, seeded());
        transport.reply(
            201,
            json!({
                "id": 4,
                "name": "Jane",
                "title": null,
                "message": "Great service",
                "created_at": "2026-10-16T09:00:00.000000Z",
                "updated_at": "2026-10-16T09:00:00.000000Z",
            }),
        );
        transport.reply(204, json!(null));

        let session = Arc::new(
            Session::open(
                transport.clone(),
                AuthMode::Bearer,
                api(),
                Box::new(Memory::<Data>::new()),
            )
            .await,
        );

        let err = session
            .login("admin@example.com", &SecretString::new("wrong".to_owned()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(error::Auth::Rejected(_))));
        assert!(!session.is_authenticated().await);

        session
            .login("admin@example.com", &SecretString::new("right".to_owned()))
            .await?;
        assert!(session.is_authenticated().await);

        let mut controller: Controller<Testimonial> = Controller::new(
            Client::new(transport.clone(), Arc::clone(&session)),
            Arc::new(Scripted::new(true)),
        );
        assert_eq!(controller.list().await?.len(), 3);

        let created = controller
            .create(&NewTestimonial {
                author: "Jane".to_owned(),
                title: None,
                body: "Great service".to_owned(),
            })
            .await?;
        assert_eq!(created.author, "Jane");
        assert_eq!(created.body, "Great service");
        assert_eq!(controller.items()[0].id, created.id);

        controller.delete(created.id).await?;
        assert!(controller.get(created.id).is_none());
        assert_eq!(controller.items().len(), 3);

        let authorization = transport.requests()[4]
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        assert_eq!(authorization.as_deref(), Some("Bearer 1|abcdef"));
        Ok(())
    }
}
