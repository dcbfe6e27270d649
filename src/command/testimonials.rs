// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::{Args, Subcommand};

use crate::{
    error::Result,
    model::{NewTestimonial, Testimonial, TestimonialPatch},
};

/// Manage customer testimonials.
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// List every testimonial, newest first.
    List(List),
    /// Publish a new testimonial.
    Create(Create),
    /// Change some fields of a testimonial.
    Update(Update),
    /// Remove a testimonial.
    Delete(Delete),
}

#[derive(Debug, Args)]
pub(crate) struct List {
    #[command(flatten)]
    output: super::Output,
}

#[derive(Debug, Args)]
pub(crate) struct Create {
    /// Who said it.
    #[arg(long, short)]
    author: String,

    /// The author's role or company.
    #[arg(long, short)]
    title: Option<String>,

    /// What they said.
    #[arg(long, short)]
    message: String,

    #[command(flatten)]
    output: super::Output,
}

#[derive(Debug, Args)]
#[command(group(clap::ArgGroup::new("fields").required(true).multiple(true)))]
pub(crate) struct Update {
    id: u64,

    #[arg(long, short, group = "fields")]
    author: Option<String>,

    #[arg(long, short, group = "fields")]
    title: Option<String>,

    #[arg(long, short, group = "fields")]
    message: Option<String>,

    #[command(flatten)]
    output: super::Output,
}

#[derive(Debug, Args)]
pub(crate) struct Delete {
    id: u64,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: super::Context) -> Result<()> {
        let mut controller = ctx.controller::<Testimonial>();

        match self {
            Self::List(cmd) => cmd.output.print(controller.list().await?),
            Self::Create(cmd) => {
                let created = controller
                    .create(&NewTestimonial {
                        author: cmd.author,
                        title: cmd.title,
                        body: cmd.message,
                    })
                    .await?;
                cmd.output.print_one(&created)
            }
            Self::Update(cmd) => {
                let updated = controller
                    .update(
                        cmd.id,
                        &TestimonialPatch {
                            author: cmd.author,
                            title: cmd.title,
                            body: cmd.message,
                        },
                    )
                    .await?;
                cmd.output.print_one(&updated)
            }
            Self::Delete(cmd) => {
                controller.delete(cmd.id).await?;
                println!("Deleted testimonial {}.", cmd.id);
                Ok(())
            }
        }
    }
}
