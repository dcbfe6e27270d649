// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tabled::Tabled;
use url::Url;

use crate::{
    error::{Result, Validation},
    http::{Body, Multipart},
    resource::{Resource, Updatable},
};

fn format_optional(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn format_timestamp(value: &Option<DateTime<Utc>>) -> String {
    value
        .map(|timestamp| timestamp.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

fn required(field: &'static str, value: &str) -> Result<(), Validation> {
    if value.trim().is_empty() {
        Err(Validation::Required(field))
    } else {
        Ok(())
    }
}

/// A quote from a customer. Older revisions of the API call the author
/// `author_name` and the body `quote`; both spellings are accepted.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Tabled)]
pub(crate) struct Testimonial {
    #[tabled(rename = "ID")]
    pub(crate) id: u64,
    #[serde(rename = "name", alias = "author_name")]
    #[tabled(rename = "Author")]
    pub(crate) author: String,
    #[serde(default)]
    #[tabled(rename = "Title", display_with = "format_optional")]
    pub(crate) title: Option<String>,
    #[serde(rename = "message", alias = "quote")]
    #[tabled(rename = "Message")]
    pub(crate) body: String,
    #[serde(default)]
    #[tabled(rename = "Created", display_with = "format_timestamp")]
    pub(crate) created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    #[tabled(rename = "Updated", display_with = "format_timestamp")]
    pub(crate) updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub(crate) struct NewTestimonial {
    #[serde(rename = "name")]
    pub(crate) author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) title: Option<String>,
    #[serde(rename = "message")]
    pub(crate) body: String,
}

/// Fields to change on an existing testimonial. Absent fields keep their
/// current value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct TestimonialPatch {
    pub(crate) author: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) body: Option<String>,
}

impl Resource for Testimonial {
    type New = NewTestimonial;

    const NAME: &'static str = "testimonial";
    const PATH: &'static str = "api/testimonials";

    fn id(&self) -> u64 {
        self.id
    }

    fn create_body(input: &Self::New) -> Result<Body> {
        required("author", &input.author)?;
        required("message", &input.body)?;
        Ok(Body::Json(serde_json::to_value(input)?))
    }
}

impl Updatable for Testimonial {
    type Patch = TestimonialPatch;

    fn check_patch(patch: &Self::Patch) -> Result<()> {
        if patch.author.is_none() && patch.title.is_none() && patch.body.is_none() {
            return Err(Validation::EmptyPatch.into());
        }
        if let Some(author) = patch.author.as_deref() {
            required("author", author)?;
        }
        if let Some(body) = patch.body.as_deref() {
            required("message", body)?;
        }
        Ok(())
    }

    fn update_body(current: &Self, patch: &Self::Patch) -> Result<Body> {
        Self::check_patch(patch)?;
        let merged = NewTestimonial {
            author: patch.author.clone().unwrap_or_else(|| current.author.clone()),
            title: patch.title.clone().or_else(|| current.title.clone()),
            body: patch.body.clone().unwrap_or_else(|| current.body.clone()),
        };
        Self::create_body(&merged)
    }
}

/// An uploaded picture. `storage_path` is assigned by the server and is
/// relative to the storage base URL.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Tabled)]
pub(crate) struct GalleryImage {
    #[tabled(rename = "ID")]
    pub(crate) id: u64,
    #[serde(default)]
    #[tabled(rename = "Title", display_with = "format_optional")]
    pub(crate) title: Option<String>,
    #[serde(default)]
    #[tabled(rename = "Alt Text", display_with = "format_optional")]
    pub(crate) alt_text: Option<String>,
    #[serde(rename = "image_path")]
    #[tabled(rename = "Path")]
    pub(crate) storage_path: String,
    #[serde(default)]
    #[tabled(rename = "Created", display_with = "format_timestamp")]
    pub(crate) created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    #[tabled(skip)]
    pub(crate) updated_at: Option<DateTime<Utc>>,
}

impl GalleryImage {
    pub(crate) fn url(&self, storage: &Url) -> Result<Url> {
        Ok(storage.join(self.storage_path.trim_start_matches('/'))?)
    }
}

/// A file selected for upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Upload {
    pub(crate) file_name: String,
    pub(crate) mime: String,
    pub(crate) bytes: Vec<u8>,
}

impl Upload {
    pub(crate) async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        Ok(Self {
            file_name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_owned()),
            mime: mime_guess::from_path(path)
                .first_or_octet_stream()
                .essence_str()
                .to_owned(),
            bytes,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct NewGalleryImage {
    pub(crate) title: Option<String>,
    pub(crate) image: Option<Upload>,
}

impl Resource for GalleryImage {
    type New = NewGalleryImage;

    const NAME: &'static str = "gallery image";
    const PATH: &'static str = "api/gallery";

    fn id(&self) -> u64 {
        self.id
    }

    fn create_body(input: &Self::New) -> Result<Body> {
        let image = input.image.as_ref().ok_or(Validation::MissingImage)?;
        if image.bytes.is_empty() {
            return Err(Validation::EmptyImage(image.file_name.clone()).into());
        }

        Ok(Body::Multipart(
            Multipart::new()
                .text("title", input.title.clone().unwrap_or_default())
                .file(
                    "image",
                    &image.file_name,
                    &image.mime,
                    image.bytes.clone(),
                ),
        ))
    }
}
