//! Structural contract builder for the constrained-generation phase.
//!
//! Produces the JSON schema the structured-generation call must
//! conform to: exact slide count, enumerated background/overlay
//! references, bounded positions, enumerated font sizes. The contract
//! is parameterized per request by the resolved reference tokens and
//! the target canvas geometry.

use serde_json::{json, Value};
use slidereel_core::geometry::{CanvasGeometry, SAFE_MARGIN};
use slidereel_core::layout::FONT_TIERS;

use crate::error::GenError;

/// Rotation bounds for image overlays (degrees).
const ROTATION_RANGE: (f64, f64) = (0.0, 360.0);

/// Size bounds for image overlays (percent).
const OVERLAY_SIZE_RANGE: (f64, f64) = (10.0, 100.0);

/// Build the structural contract for one generation request.
///
/// Fails fast when `background_tokens` is empty: every slide requires
/// a background, so a request with no background-eligible images can
/// never produce a valid document.
pub fn build_contract(
    background_tokens: &[String],
    overlay_tokens: &[String],
    slide_count: usize,
    geometry: &CanvasGeometry,
) -> Result<Value, GenError> {
    if background_tokens.is_empty() {
        return Err(GenError::InvalidRequest(
            "At least one background-eligible image is required".to_string(),
        ));
    }
    if slide_count == 0 {
        return Err(GenError::InvalidRequest(
            "Slide count must be positive".to_string(),
        ));
    }

    let sizes: Vec<u32> = FONT_TIERS.iter().map(|t| t.size).collect();
    let (min_rot, max_rot) = ROTATION_RANGE;
    let (min_size, max_size) = OVERLAY_SIZE_RANGE;

    // Overlay references are constrained to the overlay token enum when
    // the pool is non-empty; otherwise any string is accepted so an
    // empty pool does not make the whole contract unsatisfiable.
    let overlay_ref_schema = if overlay_tokens.is_empty() {
        json!({ "type": "string" })
    } else {
        json!({ "type": "string", "enum": overlay_tokens })
    };

    Ok(json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["caption", "slides"],
        "properties": {
            "caption": { "type": "string" },
            "slides": {
                "type": "array",
                "minItems": slide_count,
                "maxItems": slide_count,
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["background_image_ref", "texts", "overlays"],
                    "properties": {
                        "background_image_ref": {
                            "type": "string",
                            "enum": background_tokens,
                        },
                        "texts": {
                            "type": "array",
                            "minItems": 1,
                            "items": {
                                "type": "object",
                                "additionalProperties": false,
                                "required": ["text", "position_x", "position_y", "size"],
                                "properties": {
                                    "text": { "type": "string" },
                                    "position_x": {
                                        "type": "number",
                                        "minimum": SAFE_MARGIN,
                                        "maximum": geometry.width as f64 - SAFE_MARGIN,
                                    },
                                    "position_y": {
                                        "type": "number",
                                        "minimum": SAFE_MARGIN,
                                        "maximum": geometry.height as f64 - SAFE_MARGIN,
                                    },
                                    "size": { "type": "number", "enum": sizes },
                                },
                            },
                        },
                        "overlays": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "additionalProperties": false,
                                "required": ["image_ref", "position_x", "position_y", "rotation", "size"],
                                "properties": {
                                    "image_ref": overlay_ref_schema,
                                    "position_x": {
                                        "type": "number",
                                        "minimum": 0,
                                        "maximum": geometry.width,
                                    },
                                    "position_y": {
                                        "type": "number",
                                        "minimum": 0,
                                        "maximum": geometry.height,
                                    },
                                    "rotation": {
                                        "type": "number",
                                        "minimum": min_rot,
                                        "maximum": max_rot,
                                    },
                                    "size": {
                                        "type": "number",
                                        "minimum": min_size,
                                        "maximum": max_size,
                                    },
                                },
                            },
                        },
                    },
                },
            },
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(prefix: char, n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("{prefix}{i:02}")).collect()
    }

    fn geometry() -> CanvasGeometry {
        CanvasGeometry::from_aspect("9:16").unwrap()
    }

    #[test]
    fn empty_background_pool_always_fails() {
        for count in [1, 3, 8] {
            let result = build_contract(&[], &tokens('p', 2), count, &geometry());
            assert!(matches!(result, Err(GenError::InvalidRequest(_))));
        }
    }

    #[test]
    fn non_empty_background_pool_always_succeeds() {
        let bg = tokens('c', 1);
        for count in [1, 3, 8] {
            assert!(build_contract(&bg, &[], count, &geometry()).is_ok());
        }
    }

    #[test]
    fn zero_slide_count_is_rejected() {
        let result = build_contract(&tokens('c', 1), &[], 0, &geometry());
        assert!(matches!(result, Err(GenError::InvalidRequest(_))));
    }

    #[test]
    fn slide_count_is_exact() {
        let contract = build_contract(&tokens('c', 2), &[], 4, &geometry()).unwrap();
        let slides = &contract["properties"]["slides"];
        assert_eq!(slides["minItems"], 4);
        assert_eq!(slides["maxItems"], 4);
    }

    #[test]
    fn background_refs_are_enumerated() {
        let bg = tokens('c', 3);
        let contract = build_contract(&bg, &[], 2, &geometry()).unwrap();
        let enumed = &contract["properties"]["slides"]["items"]["properties"]
            ["background_image_ref"]["enum"];
        assert_eq!(enumed.as_array().unwrap().len(), 3);
        assert_eq!(enumed[0], "c01");
    }

    #[test]
    fn text_positions_are_bounded_by_safe_margins() {
        let contract = build_contract(&tokens('c', 1), &[], 3, &geometry()).unwrap();
        let pos_x = &contract["properties"]["slides"]["items"]["properties"]["texts"]
            ["items"]["properties"]["position_x"];
        assert_eq!(pos_x["minimum"], 40.0);
        assert_eq!(pos_x["maximum"], 260.0);
    }

    #[test]
    fn texts_must_be_non_empty() {
        let contract = build_contract(&tokens('c', 1), &[], 1, &geometry()).unwrap();
        let texts = &contract["properties"]["slides"]["items"]["properties"]["texts"];
        assert_eq!(texts["minItems"], 1);
    }

    #[test]
    fn overlay_refs_enumerate_when_pool_present() {
        let contract =
            build_contract(&tokens('c', 1), &tokens('p', 2), 1, &geometry()).unwrap();
        let image_ref = &contract["properties"]["slides"]["items"]["properties"]
            ["overlays"]["items"]["properties"]["image_ref"];
        assert_eq!(image_ref["enum"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn overlay_refs_fall_back_to_plain_string() {
        let contract = build_contract(&tokens('c', 1), &[], 1, &geometry()).unwrap();
        let image_ref = &contract["properties"]["slides"]["items"]["properties"]
            ["overlays"]["items"]["properties"]["image_ref"];
        assert_eq!(image_ref["type"], "string");
        assert!(image_ref.get("enum").is_none());
    }

    #[test]
    fn font_sizes_match_the_tier_list() {
        let contract = build_contract(&tokens('c', 1), &[], 1, &geometry()).unwrap();
        let sizes = &contract["properties"]["slides"]["items"]["properties"]["texts"]
            ["items"]["properties"]["size"]["enum"];
        let expected: Vec<u32> = FONT_TIERS.iter().map(|t| t.size).collect();
        assert_eq!(sizes, &serde_json::json!(expected));
    }
}
