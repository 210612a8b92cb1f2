//! Payloads exchanged with the imaging backend.

use serde::Deserialize;

/// A camera frame as served by `GET /api/image`.
///
/// The wire format carries the pixel data base64-encoded;
/// [`ApiClient`](crate::client::ApiClient) decodes it into raw bytes before
/// handing the frame out. A frame is transient: consumers hold it only until
/// the next capture arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Backend-assigned identifier of the capture.
    pub image_id: String,
    /// Decoded image bytes, as produced by the camera service.
    pub image_data: Vec<u8>,
}

/// Raw `GET /api/image` payload before base64 decoding.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ImagePayload {
    pub image_id: String,
    pub image_data_base64: String,
}

/// Analysis output for one capture, as served by `GET /api/results`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InferenceResult {
    /// Identifier of the capture these results belong to.
    pub image_id: String,
    /// Mean pixel intensity over the frame.
    pub intensity_average: f32,
    /// Focus quality metric.
    pub focus_score: f32,
    /// Classifier output label.
    pub classification_label: String,
    /// Intensity histogram bin counts.
    pub histogram: Vec<u32>,
}
