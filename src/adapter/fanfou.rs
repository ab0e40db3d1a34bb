//! Fanfou REST adapter.
//!
//! Fanfou threads are flat: `context_timeline` returns the whole
//! conversation, the post itself included.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use tracing::debug;
use url::Url;

use crate::adapter::{decode, SourceAdapter};
use crate::app::{ConfluenceError, Result};
use crate::config::FanfouConfig;
use crate::domain::raw::FanfouStatus;
use crate::domain::{PostDraft, RawPost, RawThread, Source};
use crate::gateway::{Gateway, Request, RequestBody};

pub struct FanfouAdapter {
    gateway: Arc<Gateway>,
    base_url: Url,
    authorization: Option<String>,
}

impl FanfouAdapter {
    pub fn new(gateway: Arc<Gateway>, config: &FanfouConfig) -> Result<Self> {
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }

        Ok(Self {
            gateway,
            base_url: Url::parse(&base)?,
            authorization: config
                .authorization
                .clone()
                .filter(|value| !value.trim().is_empty()),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn authorize(&self, request: Request) -> Request {
        match &self.authorization {
            Some(value) => request.header(AUTHORIZATION, value),
            None => request,
        }
    }

    async fn send(&self, request: Request) -> Result<FanfouStatus> {
        let request = self.authorize(request);
        let response = self.gateway.fetch(request.clone()).await?;
        decode(&request, response)
    }

    async fn send_list(&self, request: Request) -> Result<Vec<RawPost>> {
        let request = self.authorize(request.accept("application/json"));
        let response = self.gateway.fetch(request.clone()).await?;
        let statuses: Vec<FanfouStatus> = decode(&request, response)?;
        Ok(statuses.into_iter().map(RawPost::Fanfou).collect())
    }
}

#[async_trait]
impl SourceAdapter for FanfouAdapter {
    fn source(&self) -> Source {
        Source::Fanfou
    }

    fn is_authenticated(&self) -> bool {
        self.authorization.is_some()
    }

    async fn list_timeline(&self, cursor: Option<&str>, page_size: usize) -> Result<Vec<RawPost>> {
        let mut url = self.endpoint("statuses/home_timeline.json")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("count", &page_size.to_string());
            if let Some(max_id) = cursor {
                query.append_pair("max_id", max_id);
            }
        }

        debug!("Fetching Fanfou timeline (cursor: {:?})", cursor);
        self.send_list(Request::get(url)).await
    }

    async fn get_thread(&self, native_id: &str) -> Result<RawThread> {
        let mut url = self.endpoint("statuses/context_timeline.json")?;
        url.query_pairs_mut()
            .append_pair("id", native_id)
            .append_pair("format", "html");

        Ok(RawThread::Flat(self.send_list(Request::get(url)).await?))
    }

    async fn create_post(&self, draft: &PostDraft) -> Result<RawPost> {
        if !self.is_authenticated() {
            return Err(ConfluenceError::SourceFetch {
                backend: Source::Fanfou,
                message: "not signed in".into(),
            });
        }

        let request = match &draft.media {
            Some(media) => Request::post(
                self.endpoint("photos/upload.json")?,
                RequestBody::Multipart {
                    fields: vec![("status".to_string(), draft.content.clone())],
                    file_field: "photo".to_string(),
                    file: media.clone(),
                },
            ),
            None => {
                let mut fields = vec![("status".to_string(), draft.content.clone())];
                if let Some(target) = &draft.reply_to {
                    fields.push((
                        "in_reply_to_status_id".to_string(),
                        target.native_id.clone(),
                    ));
                    if let Some(user_id) = &target.user_id {
                        fields.push(("in_reply_to_user_id".to_string(), user_id.clone()));
                    }
                }
                Request::post(
                    self.endpoint("statuses/update.json")?,
                    RequestBody::Form(fields),
                )
            }
        };

        Ok(RawPost::Fanfou(self.send(request).await?))
    }
}
