use crate::config::types::{DeliveryConfig, SyslogConfig};
use crate::outlet::encode::{SyslogEncoder, CONTENT_TYPE};
use crate::pipeline::batch::Batch;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE as CONTENT_TYPE_HEADER;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint returned error status {status}: {message}")]
    Status { status: u16, message: String },
}

pub type Result<T> = std::result::Result<T, DeliveryError>;

/// One delivery attempt of one batch. Retries are the caller's business.
#[async_trait]
pub trait Deliver: Send + Sync {
    async fn deliver(&self, batch: &Batch) -> Result<()>;
}

/// Delivers batches as octet-counted syslog frames over HTTP POST.
#[derive(Debug, Clone)]
pub struct HttpDeliverer {
    url: String,
    client: reqwest::Client,
    encoder: SyslogEncoder,
}

impl HttpDeliverer {
    pub fn new(delivery: &DeliveryConfig, syslog: &SyslogConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(delivery.timeout)
            .user_agent(concat!("log-shuttle/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            url: delivery.logs_url.clone(),
            client,
            encoder: SyslogEncoder::new(syslog.clone()),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Deliver for HttpDeliverer {
    async fn deliver(&self, batch: &Batch) -> Result<()> {
        let body = self.encoder.encode(batch);

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE_HEADER, CONTENT_TYPE)
            .header("Logplex-Msg-Count", batch.len())
            .header("Logshuttle-Batch-Id", batch.batch_id.to_string())
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DeliveryError::Status {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        Ok(())
    }
}
