//! Method-name dispatch for host applications.
//!
//! A [`MethodCall`] names one of the four operations and carries a JSON
//! argument bag; the reply is a [`MethodResponse`] carrying either the JSON
//! result or a stable error code with a message. Arguments are validated
//! here, before any resolution or inspection happens.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::capability::CapabilityDetector;
use crate::error::{Error, Result};
use crate::extract::MetadataExtractor;
use crate::source::SourceReference;

/// Method names understood by [`Dispatcher::handle`].
pub mod methods {
    pub const IS_HDR_SUPPORTED: &str = "isHdrSupported";
    pub const GET_SUPPORTED_HDR_FORMATS: &str = "getSupportedHdrFormats";
    pub const IS_WIDE_COLOR_GAMUT_SUPPORTED: &str = "isWideColorGamutSupported";
    pub const GET_VIDEO_METADATA: &str = "getVideoMetadata";
}

/// A request from the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }
}

/// The reply to a [`MethodCall`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MethodResponse {
    Success { result: Value },
    Error { code: String, message: String },
    NotImplemented,
}

impl From<&Error> for MethodResponse {
    fn from(e: &Error) -> Self {
        MethodResponse::Error {
            code: e.code().to_string(),
            message: e.to_string(),
        }
    }
}

/// Routes method calls to the capability detector and metadata extractor.
#[derive(Clone)]
pub struct Dispatcher {
    detector: CapabilityDetector,
    extractor: MetadataExtractor,
}

impl Dispatcher {
    pub fn new(detector: CapabilityDetector, extractor: MetadataExtractor) -> Self {
        Self {
            detector,
            extractor,
        }
    }

    pub fn detector(&self) -> &CapabilityDetector {
        &self.detector
    }

    pub fn extractor(&self) -> &MetadataExtractor {
        &self.extractor
    }

    pub async fn handle(&self, call: MethodCall) -> MethodResponse {
        tracing::debug!(method = %call.method, "handling method call");

        let result = match call.method.as_str() {
            methods::IS_HDR_SUPPORTED => self.detector.is_hdr_supported().map(Value::from),
            methods::GET_SUPPORTED_HDR_FORMATS => {
                self.detector.supported_hdr_formats().map(|formats| {
                    Value::from(
                        formats
                            .iter()
                            .map(|f| f.as_str().to_string())
                            .collect::<Vec<_>>(),
                    )
                })
            }
            methods::IS_WIDE_COLOR_GAMUT_SUPPORTED => {
                self.detector.is_wide_color_gamut_supported().map(Value::from)
            }
            methods::GET_VIDEO_METADATA => self.video_metadata(&call.arguments).await,
            other => {
                tracing::debug!(method = other, "method not implemented");
                return MethodResponse::NotImplemented;
            }
        };

        match result {
            Ok(result) => MethodResponse::Success { result },
            Err(e) => {
                tracing::debug!(method = %call.method, code = e.code(), error = %e, "method call failed");
                MethodResponse::from(&e)
            }
        }
    }

    async fn video_metadata(&self, arguments: &Value) -> Result<Value> {
        let source = source_from_arguments(arguments)?;
        let metadata = self.extractor.extract(&source).await?;
        serde_json::to_value(metadata).map_err(Error::metadata)
    }
}

/// Read `filePath` and optional `httpHeaders` out of an argument bag.
pub fn source_from_arguments(arguments: &Value) -> Result<SourceReference> {
    let file_path = arguments
        .get("filePath")
        .ok_or_else(|| Error::invalid_argument("filePath is required"))?
        .as_str()
        .ok_or_else(|| Error::invalid_argument("filePath must be a string"))?;

    let headers = match arguments.get("httpHeaders") {
        None | Some(Value::Null) => HashMap::new(),
        Some(value) => serde_json::from_value::<HashMap<String, String>>(value.clone())
            .map_err(|_| Error::invalid_argument("httpHeaders must map strings to strings"))?,
    };

    Ok(SourceReference::parse(file_path)?.with_headers(headers))
}
