//! Generation request model and validation.
//!
//! A [`GenerationRequest`] is the full parameter bundle for one
//! submission: prompt, engine, aspect ratio, numeric knobs, reference
//! assets, and the expected output count. Requests are immutable once
//! submitted -- "regenerate" clones the original request into a fresh
//! submission rather than mutating anything in place.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Reference asset tags
// ---------------------------------------------------------------------------

/// The composition canvas the user drew or arranged.
pub const TAG_CANVAS: &str = "canvas";
/// A face/identity reference image.
pub const TAG_FACE: &str = "face";
/// A style reference image.
pub const TAG_STYLE: &str = "style";
/// A pose reference image.
pub const TAG_POSE: &str = "pose";

/// All valid reference asset tags.
pub const VALID_ASSET_TAGS: &[&str] = &[TAG_CANVAS, TAG_FACE, TAG_STYLE, TAG_POSE];

// ---------------------------------------------------------------------------
// Validation limits
// ---------------------------------------------------------------------------

/// Maximum length for the prompt text.
pub const MAX_PROMPT_LEN: usize = 2000;

/// Hard ceiling on outputs per task to keep placeholder fan-out bounded.
pub const MAX_EXPECTED_OUTPUTS: u32 = 8;

/// Maximum number of reference assets per request.
pub const MAX_REFERENCE_ASSETS: usize = 10;

/// Guidance scale range accepted by every supported engine.
pub const MIN_GUIDANCE: f64 = 0.0;
pub const MAX_GUIDANCE: f64 = 30.0;

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

/// A reference image attached to a request, with its semantic role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceAsset {
    /// Fetchable URL of the asset (vault or upload location).
    pub url: String,
    /// Semantic role, one of [`VALID_ASSET_TAGS`].
    pub tag: String,
}

/// Parameter bundle for one generation task submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Engine/model identifier, e.g. `"flux-dev"`.
    pub engine: String,
    /// Aspect ratio as `"W:H"`, e.g. `"3:4"`.
    pub aspect_ratio: String,
    /// Guidance scale. `None` uses the engine default.
    #[serde(default)]
    pub guidance: Option<f64>,
    /// Reference strength in `[0, 1]`. `None` uses the engine default.
    #[serde(default)]
    pub strength: Option<f64>,
    /// Fixed seed for reproducible outputs.
    #[serde(default)]
    pub seed: Option<i64>,
    #[serde(default)]
    pub reference_assets: Vec<ReferenceAsset>,
    /// Character/influencer the generation should stay consistent with.
    #[serde(default)]
    pub influencer_id: Option<String>,
    /// Number of output images the backend is asked to produce.
    pub expected_outputs: u32,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate that a reference asset tag is one of the known constants.
pub fn validate_asset_tag(tag: &str) -> Result<(), CoreError> {
    if VALID_ASSET_TAGS.contains(&tag) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid asset tag '{tag}'. Must be one of: {}",
            VALID_ASSET_TAGS.join(", ")
        )))
    }
}

/// Validate an aspect ratio string of the form `"W:H"` with positive
/// integer components.
pub fn validate_aspect_ratio(ratio: &str) -> Result<(), CoreError> {
    let invalid = || {
        CoreError::Validation(format!(
            "Invalid aspect ratio '{ratio}'. Expected the form W:H, e.g. 3:4"
        ))
    };
    let (w, h) = ratio.split_once(':').ok_or_else(invalid)?;
    let w: u32 = w.parse().map_err(|_| invalid())?;
    let h: u32 = h.parse().map_err(|_| invalid())?;
    if w == 0 || h == 0 {
        return Err(invalid());
    }
    Ok(())
}

/// Validate a full request before submission.
///
/// Submission must not be attempted for an invalid request; the task
/// creation endpoint would reject it anyway, and no placeholder state
/// should exist for it.
pub fn validate_request(request: &GenerationRequest) -> Result<(), CoreError> {
    if request.prompt.trim().is_empty() {
        return Err(CoreError::Validation(
            "Prompt must not be empty".to_string(),
        ));
    }
    if request.prompt.len() > MAX_PROMPT_LEN {
        return Err(CoreError::Validation(format!(
            "Prompt exceeds maximum length of {MAX_PROMPT_LEN} characters"
        )));
    }
    if request.engine.trim().is_empty() {
        return Err(CoreError::Validation(
            "Engine must not be empty".to_string(),
        ));
    }
    validate_aspect_ratio(&request.aspect_ratio)?;

    if request.expected_outputs == 0 || request.expected_outputs > MAX_EXPECTED_OUTPUTS {
        return Err(CoreError::Validation(format!(
            "expected_outputs must be between 1 and {MAX_EXPECTED_OUTPUTS}, got {}",
            request.expected_outputs
        )));
    }

    if let Some(guidance) = request.guidance {
        if !(MIN_GUIDANCE..=MAX_GUIDANCE).contains(&guidance) {
            return Err(CoreError::Validation(format!(
                "Guidance must be between {MIN_GUIDANCE} and {MAX_GUIDANCE}, got {guidance}"
            )));
        }
    }
    if let Some(strength) = request.strength {
        if !(0.0..=1.0).contains(&strength) {
            return Err(CoreError::Validation(format!(
                "Strength must be between 0 and 1, got {strength}"
            )));
        }
    }

    if request.reference_assets.len() > MAX_REFERENCE_ASSETS {
        return Err(CoreError::Validation(format!(
            "At most {MAX_REFERENCE_ASSETS} reference assets are allowed, got {}",
            request.reference_assets.len()
        )));
    }
    for asset in &request.reference_assets {
        if asset.url.trim().is_empty() {
            return Err(CoreError::Validation(
                "Reference asset URL must not be empty".to_string(),
            ));
        }
        validate_asset_tag(&asset.tag)?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GenerationRequest {
        GenerationRequest {
            prompt: "golden hour rooftop portrait".to_string(),
            engine: "flux-dev".to_string(),
            aspect_ratio: "3:4".to_string(),
            guidance: Some(7.5),
            strength: Some(0.8),
            seed: None,
            reference_assets: vec![ReferenceAsset {
                url: "https://vault.example/face.png".to_string(),
                tag: TAG_FACE.to_string(),
            }],
            influencer_id: Some("mia".to_string()),
            expected_outputs: 4,
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(validate_request(&request()).is_ok());
    }

    #[test]
    fn empty_prompt_rejected() {
        let mut r = request();
        r.prompt = "   ".to_string();
        assert!(validate_request(&r).is_err());
    }

    #[test]
    fn overlong_prompt_rejected() {
        let mut r = request();
        r.prompt = "x".repeat(MAX_PROMPT_LEN + 1);
        assert!(validate_request(&r).is_err());
    }

    #[test]
    fn empty_engine_rejected() {
        let mut r = request();
        r.engine = String::new();
        assert!(validate_request(&r).is_err());
    }

    #[test]
    fn zero_expected_outputs_rejected() {
        let mut r = request();
        r.expected_outputs = 0;
        assert!(validate_request(&r).is_err());
    }

    #[test]
    fn expected_outputs_above_cap_rejected() {
        let mut r = request();
        r.expected_outputs = MAX_EXPECTED_OUTPUTS + 1;
        assert!(validate_request(&r).is_err());
    }

    #[test]
    fn guidance_out_of_range_rejected() {
        let mut r = request();
        r.guidance = Some(31.0);
        assert!(validate_request(&r).is_err());
    }

    #[test]
    fn strength_out_of_range_rejected() {
        let mut r = request();
        r.strength = Some(1.5);
        assert!(validate_request(&r).is_err());
    }

    #[test]
    fn unknown_asset_tag_rejected() {
        let mut r = request();
        r.reference_assets[0].tag = "background".to_string();
        assert!(validate_request(&r).is_err());
    }

    #[test]
    fn aspect_ratio_forms() {
        assert!(validate_aspect_ratio("1:1").is_ok());
        assert!(validate_aspect_ratio("16:9").is_ok());
        assert!(validate_aspect_ratio("square").is_err());
        assert!(validate_aspect_ratio("0:4").is_err());
        assert!(validate_aspect_ratio("3:").is_err());
        assert!(validate_aspect_ratio("3x4").is_err());
    }

    #[test]
    fn request_round_trips_through_json() {
        let r = request();
        let json = serde_json::to_string(&r).unwrap();
        let back: GenerationRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
