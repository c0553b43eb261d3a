//! Transport to the chat route

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use parla_models::{ChatRequest, DONE_SENTINEL, SseDecoder, UiStreamEvent};

use crate::error::{ClientError, Result};

pub type EventStream = Pin<Box<dyn Stream<Item = Result<UiStreamEvent>> + Send>>;

/// Sends a chat request and yields the reply as UI message stream events
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: ChatRequest) -> Result<EventStream>;
}

/// Posts to `{base_url}/api/chat` and decodes the SSE response body
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: build_http_client(),
            endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn build_http_client() -> reqwest::Client {
    let builder = reqwest::Client::builder();
    let builder = if cfg!(test) { builder.no_proxy() } else { builder };
    builder.build().unwrap_or_else(|_| reqwest::Client::new())
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, request: ChatRequest) -> Result<EventStream> {
        tracing::debug!(
            endpoint = %self.endpoint,
            messages = request.messages.len(),
            model = %request.model,
            "Sending chat request"
        );

        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let mut bytes = response.bytes_stream();
        Ok(Box::pin(async_stream::stream! {
            let mut decoder = SseDecoder::new();
            let mut closed = false;

            while !closed {
                let payloads = match bytes.next().await {
                    Some(Ok(chunk)) => decoder.push(&chunk),
                    Some(Err(e)) => {
                        yield Err(ClientError::Http(e));
                        return;
                    }
                    None => {
                        closed = true;
                        decoder.finish().into_iter().collect()
                    }
                };

                for data in payloads {
                    if data == DONE_SENTINEL {
                        return;
                    }
                    match serde_json::from_str::<UiStreamEvent>(&data) {
                        Ok(event) => {
                            yield Ok(event);
                        }
                        Err(e) => {
                            yield Err(ClientError::Json(e));
                            return;
                        }
                    }
                }
            }
        }))
    }
}
