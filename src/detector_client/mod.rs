//! DetectorClient - detection source adapter
//!
//! ## Responsibilities
//!
//! - Fetch one frame's detections from the external detector service
//! - Partition raw detections into actor/obstacle boxes
//! - Decode the annotated frame for the frame cache
//!
//! A fetch failure means "no update this tick"; the classification loop
//! never blocks on the detector.

use crate::error::{Error, Result};
use crate::geometry::BBox;
use crate::incident::{ActorBox, FrameObservation, OBSTACLE_CLASSES, VEHICLE_CLASSES};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw detection as delivered by the detector service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub class_label: String,
    pub bbox: BBox,
}

/// One frame's payload from the detector service
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObserveResponse {
    #[serde(default)]
    pub detections: Vec<Detection>,
    /// Fire-colored regions from the color/segmentation step
    #[serde(default)]
    pub fire_regions: Vec<BBox>,
    /// Annotated JPEG, base64
    #[serde(default)]
    pub frame_jpeg: Option<String>,
}

/// Detector service HTTP client
pub struct DetectorClient {
    http: reqwest::Client,
    base_url: String,
}

impl DetectorClient {
    pub fn new(base_url: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .connect_timeout(Duration::from_secs(2))
            .build()
            .expect("Failed to build HTTP client");
        Self { http, base_url }
    }

    /// Fetch the latest frame's detections plus the rendered frame bytes
    pub async fn observe(&self) -> Result<(FrameObservation, Option<Vec<u8>>)> {
        let url = format!("{}/observe", self.base_url);
        let response = self.http.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(Error::Api(format!(
                "detector returned {}",
                response.status()
            )));
        }

        let payload: ObserveResponse = response.json().await?;
        let frame = match &payload.frame_jpeg {
            Some(encoded) => Some(
                base64::engine::general_purpose::STANDARD
                    .decode(encoded)
                    .map_err(|e| Error::Parse(format!("frame decode: {}", e)))?,
            ),
            None => None,
        };

        Ok((partition(payload), frame))
    }
}

/// Split raw detections into the classifier's input shape
pub fn partition(payload: ObserveResponse) -> FrameObservation {
    let mut observation = FrameObservation {
        fire_regions: payload.fire_regions,
        ..Default::default()
    };

    for detection in payload.detections {
        observation.objects.push(detection.class_label.clone());

        let label = detection.class_label.as_str();
        if label == "person" || VEHICLE_CLASSES.contains(&label) {
            observation.actors.push(ActorBox {
                class_label: detection.class_label,
                bbox: detection.bbox,
            });
        } else if OBSTACLE_CLASSES.contains(&label) {
            observation.obstacles.push(detection.bbox);
        }
    }

    observation
}
