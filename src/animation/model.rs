use std::path::Path;

use serde::Deserialize as _;

use crate::foundation::{
    core::{FrameIndex, FrameRange},
    error::{ConvertError, ConvertResult},
};

/// Upper bound on the number of frames a single animation may declare.
pub const MAX_FRAMES: u64 = 100_000;

/// The typed subset of a Lottie document the pipeline itself reads.
///
/// Everything else in the document is opaque and only consumed by the player.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnimationHeader {
    /// First frame (`ip`).
    #[serde(rename = "ip")]
    pub in_point: f64,
    /// End frame, exclusive (`op`).
    #[serde(rename = "op")]
    pub out_point: f64,
    /// Frames per second (`fr`).
    #[serde(rename = "fr")]
    pub frame_rate: f64,
    /// Composition width (`w`).
    #[serde(rename = "w", default)]
    pub width: Option<f64>,
    /// Composition height (`h`).
    #[serde(rename = "h", default)]
    pub height: Option<f64>,
    /// Composition name (`nm`).
    #[serde(rename = "nm", default)]
    pub name: Option<String>,
}

impl AnimationHeader {
    pub fn validate(&self) -> ConvertResult<()> {
        if !self.in_point.is_finite() || !self.out_point.is_finite() {
            return Err(ConvertError::format("ip/op must be finite numbers"));
        }
        if self.out_point <= self.in_point {
            return Err(ConvertError::format(format!(
                "op ({}) must be greater than ip ({})",
                self.out_point, self.in_point
            )));
        }
        if !self.frame_rate.is_finite() || self.frame_rate <= 0.0 {
            return Err(ConvertError::format(format!(
                "fr must be a positive number, got {}",
                self.frame_rate
            )));
        }
        let frames = (self.out_point - self.in_point).ceil();
        if frames > MAX_FRAMES as f64 {
            return Err(ConvertError::format(format!(
                "animation declares {frames} frames (limit {MAX_FRAMES})"
            )));
        }
        Ok(())
    }
}

/// A parsed, validated animation description.
#[derive(Clone, Debug)]
pub struct Animation {
    header: AnimationHeader,
    doc: serde_json::Map<String, serde_json::Value>,
}

impl Animation {
    /// Parse a JSON document. The top-level value must be an object carrying `ip`, `op` and `fr`.
    pub fn from_json_str(text: &str) -> ConvertResult<Self> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| ConvertError::format(format!("payload is not valid JSON: {e}")))?;
        Self::from_value(value)
    }

    pub fn from_value(value: serde_json::Value) -> ConvertResult<Self> {
        if !value.is_object() {
            return Err(not_an_object());
        }

        let header = AnimationHeader::deserialize(&value)
            .map_err(|e| ConvertError::format(format!("invalid animation header: {e}")))?;
        header.validate()?;

        let serde_json::Value::Object(doc) = value else {
            return Err(not_an_object());
        };
        Ok(Self { header, doc })
    }

    pub fn header(&self) -> &AnimationHeader {
        &self.header
    }

    pub fn in_point(&self) -> f64 {
        self.header.in_point
    }

    pub fn out_point(&self) -> f64 {
        self.header.out_point
    }

    pub fn frame_rate(&self) -> f64 {
        self.header.frame_rate
    }

    /// Number of frames to capture: `ceil(op - ip)`.
    pub fn frame_count(&self) -> u64 {
        (self.header.out_point - self.header.in_point).ceil() as u64
    }

    /// Player-relative frames `[0, frame_count)`.
    pub fn frame_range(&self) -> FrameRange {
        FrameRange::first_n(self.frame_count())
    }

    /// Duration of the animation in seconds at its declared rate.
    pub fn duration_secs(&self) -> f64 {
        self.frame_count() as f64 / self.header.frame_rate
    }

    pub fn last_frame(&self) -> FrameIndex {
        FrameIndex(self.frame_count().saturating_sub(1))
    }

    pub fn document(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.doc
    }

    /// Compact JSON, as injected into the player page.
    pub fn to_json_string(&self) -> ConvertResult<String> {
        serde_json::to_string(&self.doc)
            .map_err(|e| ConvertError::format(format!("serialize animation: {e}")))
    }

    /// Persist the description as pretty JSON.
    pub fn write_json(&self, path: &Path) -> ConvertResult<()> {
        let text = serde_json::to_string_pretty(&self.doc)
            .map_err(|e| ConvertError::format(format!("serialize animation: {e}")))?;
        std::fs::write(path, text).map_err(|e| ConvertError::io_at("write animation json", path, e))
    }
}

fn not_an_object() -> ConvertError {
    ConvertError::format("invalid JSON format: animation data is not an object")
}

#[cfg(test)]
#[path = "../../tests/unit/animation/model.rs"]
mod tests;
