use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, StatusCode};

use crate::cache::{cache_key, lookup_cached_completion, store_cached_completion};
use crate::config::OpenAiConfig;
use crate::error::{parse_error_message, OpenAiApiError};
use crate::events::ChatStreamEvent;
use crate::headers::build_headers;
use crate::payload::ChatRequest;
use crate::retry::{is_retryable_http_error, retry_delay_ms, MAX_RETRIES};
use crate::sse::SseStreamParser;
use crate::url::normalize_chat_url;

#[derive(Debug)]
pub struct OpenAiClient {
    http: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, OpenAiApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(OpenAiApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    pub fn normalized_endpoint(&self) -> String {
        normalize_chat_url(&self.config.base_url)
    }

    pub fn build_headers(&self) -> Result<HeaderMap, OpenAiApiError> {
        let headers = build_headers(&self.config)?;
        let mut out = HeaderMap::new();
        for (key, value) in headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes()).map_err(|_| {
                    OpenAiApiError::InvalidBaseUrl(format!("invalid header key: {key}"))
                })?,
                HeaderValue::from_str(&value).map_err(|_| {
                    OpenAiApiError::InvalidBaseUrl(format!("invalid header value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    pub fn build_request(
        &self,
        request: &ChatRequest,
    ) -> Result<reqwest::RequestBuilder, OpenAiApiError> {
        validate_request_payload_shape(request)?;

        let headers = self.build_headers()?;
        let mut payload = request.clone();
        payload.stream = true;
        Ok(self
            .http
            .post(self.normalized_endpoint())
            .headers(headers)
            .json(&payload))
    }

    pub async fn send_with_retry(&self, request: &ChatRequest) -> Result<Response, OpenAiApiError> {
        let mut last_status: Option<StatusCode> = None;
        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            let response = self
                .build_request(request)?
                .send()
                .await
                .map_err(OpenAiApiError::from);

            match response {
                Ok(response) => {
                    if response.status().is_success() {
                        return Ok(response);
                    }

                    let status = response.status();
                    last_status = Some(status);
                    let body = response.text().await.unwrap_or_else(|_| {
                        status
                            .canonical_reason()
                            .unwrap_or("request failed")
                            .to_string()
                    });
                    let message = parse_error_message(status, &body);
                    last_error = Some(message.clone());

                    if attempt < MAX_RETRIES && is_retryable_http_error(status.as_u16(), &body) {
                        tokio::time::sleep(retry_delay_ms(attempt)).await;
                        continue;
                    }

                    return Err(OpenAiApiError::Status(status, message));
                }
                Err(error) => {
                    last_error = Some(error.to_string());
                    if attempt < MAX_RETRIES {
                        tokio::time::sleep(retry_delay_ms(attempt)).await;
                        continue;
                    }
                    return Err(OpenAiApiError::RetryExhausted {
                        status: last_status,
                        last_error,
                    });
                }
            }
        }

        Err(OpenAiApiError::RetryExhausted {
            status: last_status,
            last_error,
        })
    }

    /// Stream one completion, invoking `on_fragment` for every content delta
    /// in arrival order, and return the concatenated full response.
    ///
    /// The byte stream is always consumed to its end; there is no
    /// cancellation path. With `caching` enabled and a cache directory
    /// configured, an identical earlier request is served from disk as a
    /// single fragment without touching the network.
    pub async fn stream_with_handler<F>(
        &self,
        request: &ChatRequest,
        caching: bool,
        mut on_fragment: F,
    ) -> Result<String, OpenAiApiError>
    where
        F: FnMut(&str),
    {
        validate_request_payload_shape(request)?;

        let cache_slot = if caching {
            self.config.cache_dir.as_deref().map(|dir| {
                let key = cache_key(&serde_json::to_string(request).unwrap_or_default());
                (dir, key)
            })
        } else {
            None
        };

        if let Some((dir, key)) = &cache_slot {
            if let Some(cached) = lookup_cached_completion(dir, key) {
                on_fragment(&cached);
                return Ok(cached);
            }
        }

        let response = self.send_with_retry(request).await?;
        let mut bytes = response.bytes_stream();
        let mut parser = SseStreamParser::default();
        let mut full_text = String::new();
        let mut failure: Option<OpenAiApiError> = None;

        while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(OpenAiApiError::from)?;
            for event in parser.feed(&chunk) {
                match event {
                    ChatStreamEvent::ContentDelta { delta } => {
                        if failure.is_none() {
                            on_fragment(&delta);
                            full_text.push_str(&delta);
                        }
                    }
                    ChatStreamEvent::Finished { .. } => {}
                    ChatStreamEvent::Error { code, message } => {
                        if failure.is_none() {
                            failure = Some(OpenAiApiError::StreamFailed {
                                code,
                                message: message
                                    .unwrap_or_else(|| "completion stream failed".to_owned()),
                            });
                        }
                    }
                }
            }
        }

        if let Some(failure) = failure {
            return Err(failure);
        }

        if let Some((dir, key)) = &cache_slot {
            // Best-effort: a failed cache write only costs a future cache miss.
            let _ = store_cached_completion(dir, key, &full_text);
        }

        Ok(full_text)
    }
}

fn validate_request_payload_shape(request: &ChatRequest) -> Result<(), OpenAiApiError> {
    if request.messages.is_empty() {
        return Err(OpenAiApiError::InvalidRequest(
            "'messages' must contain at least one message".to_owned(),
        ));
    }
    if let Some(temperature) = request.temperature {
        if !(0.0..=1.0).contains(&temperature) {
            return Err(OpenAiApiError::InvalidRequest(format!(
                "'temperature' must be within [0.0, 1.0], got {temperature}"
            )));
        }
    }
    if let Some(top_p) = request.top_p {
        if !(0.1..=1.0).contains(&top_p) {
            return Err(OpenAiApiError::InvalidRequest(format!(
                "'top_p' must be within [0.1, 1.0], got {top_p}"
            )));
        }
    }

    Ok(())
}
