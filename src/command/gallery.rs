// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use async_trait::async_trait;
use clap::{Args, Subcommand};
use log::error;

use crate::{
    error::{Error, Result},
    model::{GalleryImage, NewGalleryImage, Upload},
};

/// Manage the picture gallery.
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// List every image, newest first.
    List(List),
    /// Upload a new image.
    Upload(UploadImage),
    /// Remove an image.
    Delete(Delete),
    /// Print the public URL of an image.
    Url(ImageUrl),
}

#[derive(Debug, Args)]
pub(crate) struct List {
    #[command(flatten)]
    output: super::Output,
}

#[derive(Debug, Args)]
pub(crate) struct UploadImage {
    /// The image file to upload.
    #[arg(value_hint = clap::ValueHint::FilePath)]
    path: PathBuf,

    /// A caption for the image.
    #[arg(long, short)]
    title: Option<String>,

    #[command(flatten)]
    output: super::Output,
}

#[derive(Debug, Args)]
pub(crate) struct Delete {
    id: u64,
}

#[derive(Debug, Args)]
pub(crate) struct ImageUrl {
    id: u64,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: super::Context) -> Result<()> {
        let mut controller = ctx.controller::<GalleryImage>();

        match self {
            Self::List(cmd) => cmd.output.print(controller.list().await?),
            Self::Upload(cmd) => {
                let image = Upload::from_path(&cmd.path).await?;
                let created = controller
                    .create(&NewGalleryImage {
                        title: cmd.title,
                        image: Some(image),
                    })
                    .await?;
                cmd.output.print_one(&created)
            }
            Self::Delete(cmd) => {
                controller.delete(cmd.id).await?;
                println!("Deleted gallery image {}.", cmd.id);
                Ok(())
            }
            Self::Url(cmd) => {
                let _ = controller.list().await?;
                if let Some(image) = controller.get(cmd.id) {
                    println!("{}", image.url(&ctx.storage_url)?);
                    Ok(())
                } else {
                    error!("No gallery image with ID {}", cmd.id);
                    Err(Error::Command)
                }
            }
        }
    }
}
