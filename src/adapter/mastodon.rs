//! Mastodon REST adapter.
//!
//! Mastodon threads are split into ancestors and descendants of the post.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::adapter::{decode, SourceAdapter};
use crate::app::{ConfluenceError, Result};
use crate::config::MastodonConfig;
use crate::domain::raw::{MastodonMedia, MastodonStatus};
use crate::domain::{MediaUpload, PostDraft, RawPost, RawThread, Source};
use crate::gateway::{Gateway, Request, RequestBody};

pub const DEFAULT_INSTANCE: &str = "nofan.xyz";

/// Reduce user input to a bare, lowercase host name.
///
/// `"https://Mastodon.Social//"` becomes `"mastodon.social"`; blank input
/// falls back to [`DEFAULT_INSTANCE`].
pub fn normalize_instance(input: &str) -> String {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();
    let host = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .unwrap_or(&lower)
        .trim_end_matches('/');

    if host.is_empty() {
        DEFAULT_INSTANCE.to_string()
    } else {
        host.to_string()
    }
}

#[derive(Debug, Deserialize)]
struct Context {
    #[serde(default)]
    ancestors: Vec<MastodonStatus>,
    #[serde(default)]
    descendants: Vec<MastodonStatus>,
}

pub struct MastodonAdapter {
    gateway: Arc<Gateway>,
    base_url: Url,
    access_token: Option<String>,
}

impl MastodonAdapter {
    pub fn new(gateway: Arc<Gateway>, config: &MastodonConfig) -> Result<Self> {
        let instance = normalize_instance(&config.instance);

        Ok(Self {
            gateway,
            base_url: Url::parse(&format!("https://{}/", instance))?,
            access_token: config
                .access_token
                .clone()
                .filter(|token| !token.trim().is_empty()),
        })
    }

    pub fn instance(&self) -> &str {
        self.base_url.host_str().unwrap_or(DEFAULT_INSTANCE)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn authorize(&self, request: Request) -> Request {
        match &self.access_token {
            Some(token) => request.header(AUTHORIZATION, &format!("Bearer {}", token)),
            None => request,
        }
    }

    async fn send<T: serde::de::DeserializeOwned>(&self, request: Request) -> Result<T> {
        let request = self.authorize(request.accept("application/json"));
        let response = self.gateway.fetch(request.clone()).await?;
        decode(&request, response)
    }

    async fn upload_media(&self, media: &MediaUpload) -> Result<String> {
        let request = Request::post(
            self.endpoint("api/v2/media")?,
            RequestBody::Multipart {
                fields: vec![("description".to_string(), String::new())],
                file_field: "file".to_string(),
                file: media.clone(),
            },
        );
        let attachment: MastodonMedia = self.send(request).await?;
        debug!("Uploaded media {} as {}", media.file_name, attachment.id);
        Ok(attachment.id)
    }
}

#[async_trait]
impl SourceAdapter for MastodonAdapter {
    fn source(&self) -> Source {
        Source::Mastodon
    }

    fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    async fn list_timeline(&self, cursor: Option<&str>, page_size: usize) -> Result<Vec<RawPost>> {
        let mut url = self.endpoint("api/v1/timelines/home")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &page_size.to_string());
            if let Some(max_id) = cursor {
                query.append_pair("max_id", max_id);
            }
        }

        debug!("Fetching Mastodon timeline (cursor: {:?})", cursor);
        let statuses: Vec<MastodonStatus> = self.send(Request::get(url)).await?;
        Ok(statuses.into_iter().map(RawPost::Mastodon).collect())
    }

    async fn get_thread(&self, native_id: &str) -> Result<RawThread> {
        let url = self.endpoint(&format!("api/v1/statuses/{}/context", native_id))?;
        let context: Context = self.send(Request::get(url)).await?;

        Ok(RawThread::Split {
            ancestors: context.ancestors.into_iter().map(RawPost::Mastodon).collect(),
            descendants: context
                .descendants
                .into_iter()
                .map(RawPost::Mastodon)
                .collect(),
        })
    }

    async fn create_post(&self, draft: &PostDraft) -> Result<RawPost> {
        if !self.is_authenticated() {
            return Err(ConfluenceError::SourceFetch {
                backend: Source::Mastodon,
                message: "not signed in".into(),
            });
        }

        let mut fields = vec![
            ("status".to_string(), draft.content.trim().to_string()),
            ("visibility".to_string(), "public".to_string()),
        ];
        if let Some(media) = &draft.media {
            fields.push(("media_ids[]".to_string(), self.upload_media(media).await?));
        }
        if let Some(target) = &draft.reply_to {
            fields.push(("in_reply_to_id".to_string(), target.native_id.clone()));
        }

        let request = Request::post(self.endpoint("api/v1/statuses")?, RequestBody::Form(fields));
        Ok(RawPost::Mastodon(self.send(request).await?))
    }
}
