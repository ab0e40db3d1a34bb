use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::Client;

use crate::app::Result;
use crate::config::HttpConfig;
use crate::gateway::request::{Request, RequestBody, Response};

/// Transport underneath the gateway.
#[async_trait]
pub trait Network: Send + Sync {
    /// Send a request. Any HTTP status is a successful send; only transport
    /// failures are errors.
    async fn send(&self, request: &Request) -> Result<Response>;
}

pub struct HttpNetwork {
    client: Client,
}

impl HttpNetwork {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .brotli(true)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn send(&self, request: &Request) -> Result<Response> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());

        match &request.body {
            Some(RequestBody::Form(fields)) => {
                let encoded = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(fields)
                    .finish();
                builder = builder
                    .header(
                        CONTENT_TYPE,
                        HeaderValue::from_static("application/x-www-form-urlencoded"),
                    )
                    .body(encoded);
            }
            Some(RequestBody::Multipart {
                fields,
                file_field,
                file,
            }) => {
                let mut form = Form::new();
                for (name, value) in fields {
                    form = form.text(name.clone(), value.clone());
                }
                let part = Part::bytes(file.bytes.clone())
                    .file_name(file.file_name.clone())
                    .mime_str(&file.mime_type)?;
                form = form.part(file_field.clone(), part);
                builder = builder.multipart(form);
            }
            None => {}
        }

        let response = builder.send().await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.bytes().await?.to_vec();

        Ok(Response::new(status, content_type, body))
    }
}
