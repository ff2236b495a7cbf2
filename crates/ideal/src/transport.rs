use std::time::Duration;

use reqwest::Method;

use crate::client::{HttpRequest, HttpResponse, Transport};
use crate::error::{IdealError, Result};

const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024; // 10 MB
const TIMEOUT: Duration = Duration::from_secs(30);

/// HTTPS transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder().timeout(TIMEOUT).build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| IdealError::Transport(format!("invalid HTTP method {}: {e}", request.method)))?;
        let mut builder = self.client.request(method, &request.uri).body(request.body.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let mut response = builder.send().await?;
        if response
            .content_length()
            .is_some_and(|len| len > MAX_RESPONSE_SIZE as u64)
        {
            return Err(too_large());
        }

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (name.to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned())
            })
            .collect();

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > MAX_RESPONSE_SIZE {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        Ok(HttpResponse { status, headers, body })
    }
}

fn too_large() -> IdealError {
    IdealError::Transport(format!("response too large (max {MAX_RESPONSE_SIZE} bytes)"))
}
