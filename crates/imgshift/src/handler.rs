//! The transform request handler.
//!
//! One call handles one `POST /images/{id}/transform` request:
//!
//! 1. look up the image record (404 if unknown)
//! 2. check the requester owns it (403, nothing else happens)
//! 3. parse and validate the body (422, or 400 for an unsupported format)
//! 4. read the original from storage, run the pipeline (500 on failure)
//! 5. store the encoded result as a new object and answer `{message, path, url}`
//!
//! The original object is never overwritten, and nothing is written unless
//! the whole pipeline succeeded.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, info_span, warn};

use imgshift_core::{Pipeline, TransformOptions, Transformations, WatermarkFetcher};

use crate::config::Config;
use crate::error::ServiceError;
use crate::records::ImageRepository;
use crate::storage::ObjectStorage;

/// Message returned with every successful transformation.
pub const SUCCESS_MESSAGE: &str = "Correctly transformed image";

/// Request body. A missing `transformations` object re-encodes only.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransformRequest {
    #[serde(default)]
    pub transformations: Option<Transformations>,
}

/// Success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformResponse {
    pub message: String,
    /// Storage key of the new object.
    pub path: String,
    pub url: String,
}

/// Status code and JSON body, ready to hand to any HTTP layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

/// Shared, thread-safe watermark fetcher.
pub type SharedFetcher = Arc<dyn WatermarkFetcher + Send + Sync>;

pub struct TransformHandler {
    pipeline: Pipeline,
    storage: Arc<dyn ObjectStorage>,
    records: Arc<dyn ImageRepository>,
    fetcher: SharedFetcher,
    output_prefix: String,
    default_quality: u8,
}

impl TransformHandler {
    pub fn new(
        config: &Config,
        storage: Arc<dyn ObjectStorage>,
        records: Arc<dyn ImageRepository>,
        fetcher: SharedFetcher,
    ) -> Self {
        Self {
            pipeline: Pipeline::new(config.pipeline_config()),
            storage,
            records,
            fetcher,
            output_prefix: config.storage.output_prefix.trim_matches('/').to_string(),
            default_quality: config.pipeline.default_quality,
        }
    }

    /// Handle a request and render the response.
    pub fn handle(&self, user_id: u64, image_id: u64, body: &[u8]) -> Response {
        match self.transform(user_id, image_id, body) {
            Ok(response) => Response {
                status: 200,
                body: json!(response),
            },
            Err(e) => Response {
                status: e.status(),
                body: json!({ "error": e.to_string() }),
            },
        }
    }

    /// Handle a request, returning the typed result.
    pub fn transform(
        &self,
        user_id: u64,
        image_id: u64,
        body: &[u8],
    ) -> Result<TransformResponse, ServiceError> {
        let span = info_span!("transform", image_id, user_id);
        let _guard = span.enter();

        let record = self
            .records
            .find(image_id)
            .ok_or(ServiceError::NotFound(image_id))?;
        if !record.is_owned_by(user_id) {
            warn!(owner = record.user_id, "requester does not own image");
            return Err(ServiceError::Forbidden);
        }

        let options = self.parse_options(body)?;

        let source = self.storage.get(&record.path)?;
        let output = self
            .pipeline
            .run(&record.path, &source, &options, self.fetcher.as_ref())?;
        drop(source);

        let path = format!("{}/{}", self.output_prefix, output.file_name);
        self.storage.put(&path, &output.bytes)?;
        let url = self.storage.url(&path);

        info!(
            path = %path,
            content_type = output.content_type(),
            "transformed image stored"
        );

        Ok(TransformResponse {
            message: SUCCESS_MESSAGE.to_string(),
            path,
            url,
        })
    }

    fn parse_options(&self, body: &[u8]) -> Result<TransformOptions, ServiceError> {
        let request: TransformRequest = if body.iter().all(u8::is_ascii_whitespace) {
            TransformRequest::default()
        } else {
            serde_json::from_slice(body).map_err(|e| ServiceError::InvalidBody(e.to_string()))?
        };

        match request.transformations {
            Some(t) => Ok(t.validate(self.default_quality)?),
            None => Ok(TransformOptions::reencode(self.default_quality)),
        }
    }
}
