use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde_json::Value;

use crate::domain::{BundleId, Locale};
use crate::error::StashError;

#[derive(Debug, Clone, Deserialize)]
pub struct LookupReply {
    #[serde(default, rename = "resultCount")]
    pub result_count: u64,
    #[serde(default)]
    pub results: Vec<Value>,
}

pub trait CatalogClient: Send + Sync {
    fn lookup(&self, id: &BundleId, locale: &Locale) -> Result<LookupReply, StashError>;
    fn download_asset(&self, url: &str) -> Result<Vec<u8>, StashError>;
}

#[derive(Clone)]
pub struct CatalogHttpClient {
    client: Client,
    lookup_url: String,
}

impl CatalogHttpClient {
    pub fn new() -> Result<Self, StashError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("appstash/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| StashError::CatalogHttp(err.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| StashError::CatalogHttp(err.to_string()))?;

        Ok(Self {
            client,
            lookup_url: "https://itunes.apple.com/lookup".to_string(),
        })
    }

    fn send_with_retries<F>(&self, mut make_req: F) -> Result<reqwest::blocking::Response, StashError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(classify_transport_error(&err));
                }
            }
        }
    }
}

impl CatalogClient for CatalogHttpClient {
    fn lookup(&self, id: &BundleId, locale: &Locale) -> Result<LookupReply, StashError> {
        let country = locale.country_code();
        let response = self.send_with_retries(|| {
            self.client
                .get(&self.lookup_url)
                .query(&[("bundleId", id.as_str()), ("country", country.as_str())])
        })?;
        let response = handle_status(response)?;
        response
            .json::<LookupReply>()
            .map_err(|err| StashError::CatalogSchema(err.to_string()))
    }

    fn download_asset(&self, url: &str) -> Result<Vec<u8>, StashError> {
        let response = self.send_with_retries(|| self.client.get(url))?;
        let response = handle_status(response)?;
        let bytes = response
            .bytes()
            .map_err(|err| classify_transport_error(&err))?;
        Ok(bytes.to_vec())
    }
}

fn handle_status(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response, StashError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let message = response
        .text()
        .unwrap_or_else(|_| "catalog request failed".to_string());
    Err(StashError::CatalogStatus { status, message })
}

fn classify_transport_error(err: &reqwest::Error) -> StashError {
    if err.is_timeout() {
        StashError::CatalogTimeout(err.to_string())
    } else {
        StashError::CatalogHttp(err.to_string())
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
