//! Remote bigram store spoken to over HTTP.
//!
//! The backing data service answers a single POST with the matching
//! records and its own scan count; wall time is measured on this side of
//! the wire.

use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{BigramRecord, BigramStore, Lookup, LookupMeta};
use crate::deck::Bigram;

#[derive(Serialize)]
struct LookupRequest<'a> {
    format: &'a str,
    bigrams: &'a [Bigram],
}

#[derive(Deserialize)]
struct LookupResponse {
    rows: Vec<BigramRecord>,
    read_count: u64,
}

pub struct HttpBigramStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpBigramStore {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl BigramStore for HttpBigramStore {
    fn database(&self) -> &str {
        "http"
    }

    fn backend(&self) -> String {
        self.base_url.clone()
    }

    async fn lookup(&self, format: &str, bigrams: &[Bigram]) -> Result<Lookup> {
        let started = Instant::now();

        let mut request = self
            .client
            .post(format!("{}/lookup", self.base_url.trim_end_matches('/')))
            .json(&LookupRequest { format, bigrams });

        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .context("bigram store unreachable")?
            .error_for_status()
            .context("bigram store rejected the lookup")?;

        let payload: LookupResponse = response
            .json()
            .await
            .context("bigram store response does not match the lookup schema")?;
        for record in &payload.rows {
            record.validate()?;
        }

        let meta = LookupMeta {
            read_count: payload.read_count,
            exec_ms: started.elapsed().as_secs_f64() * 1_000.0,
        };
        Ok(Lookup {
            rows: payload.rows,
            meta,
        })
    }
}
