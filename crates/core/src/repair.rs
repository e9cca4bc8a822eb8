//! Deterministic repair of structured-generation output.
//!
//! Model output is not trusted to satisfy every structural invariant
//! even under a schema. The transformations here force any JSON value
//! into a fully well-formed [`GeneratedSlideshow`]: they are total
//! (never fail), applied in a fixed order, and individually testable.
//! Total absence of output is handled upstream as a terminal failure;
//! this module only deals with malformed-but-present documents.

use serde_json::Value;

use crate::document::{GeneratedOverlay, GeneratedSlide, GeneratedSlideshow, GeneratedText};
use crate::geometry::CanvasGeometry;
use crate::layout::{safe_position, snap_to_tier, PositionCheck, FONT_TIERS};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Text content used when a slide arrives with no usable text entries.
const PLACEHOLDER_TEXT: &str = "New slide";

/// Overlay size used when the model omits or mangles the field.
const DEFAULT_OVERLAY_SIZE: f64 = 50.0;

/// Allowed overlay size range (percent).
const OVERLAY_SIZE_RANGE: (f64, f64) = (10.0, 100.0);

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Inputs the repair pass needs beyond the raw document.
#[derive(Debug, Clone)]
pub struct RepairContext<'a> {
    /// Exact number of slides the request asked for.
    pub slide_count: usize,
    /// Background tokens available to this request, in pool order.
    pub background_tokens: &'a [String],
    pub geometry: CanvasGeometry,
}

/// A repaired document plus repair observability counters.
#[derive(Debug)]
pub struct RepairOutcome {
    pub document: GeneratedSlideshow,
    /// Number of text positions moved back inside the safe margins.
    pub position_adjustments: u32,
}

/// Force `raw` into a document with exactly `ctx.slide_count`
/// well-formed slides.
pub fn repair_document(raw: &Value, ctx: &RepairContext) -> RepairOutcome {
    let caption = raw
        .get("caption")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let mut slides = normalize_slide_array(raw.get("slides"), ctx);
    pad_to_count(&mut slides, ctx);
    truncate_to_count(&mut slides, ctx.slide_count);

    let mut position_adjustments = 0;
    let slides = slides
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let mut slide = repair_slide(s, i, ctx);
            position_adjustments += reclamp_positions(&mut slide.texts, &ctx.geometry);
            slide
        })
        .collect();

    RepairOutcome {
        document: GeneratedSlideshow { caption, slides },
        position_adjustments,
    }
}

// ---------------------------------------------------------------------------
// Named transformations
// ---------------------------------------------------------------------------

/// Coerce the `slides` field into a non-empty array of slide values.
///
/// A bare object is wrapped; anything absent, non-object, or empty is
/// replaced with `slide_count` placeholder slides cycling through the
/// available background tokens.
pub fn normalize_slide_array(raw: Option<&Value>, ctx: &RepairContext) -> Vec<Value> {
    match raw {
        Some(Value::Array(slides)) if !slides.is_empty() => slides.clone(),
        Some(obj @ Value::Object(_)) => vec![obj.clone()],
        _ => placeholder_slides(ctx),
    }
}

/// Pad a short slide list up to `ctx.slide_count` by cloning existing
/// slides cyclically, reassigning background tokens round-robin so the
/// padding does not repeat one background.
pub fn pad_to_count(slides: &mut Vec<Value>, ctx: &RepairContext) {
    if slides.is_empty() {
        *slides = placeholder_slides(ctx);
        return;
    }

    let original_len = slides.len();
    while slides.len() < ctx.slide_count {
        let mut clone = slides[slides.len() % original_len].clone();
        if let (Some(obj), false) = (clone.as_object_mut(), ctx.background_tokens.is_empty()) {
            let token = &ctx.background_tokens[slides.len() % ctx.background_tokens.len()];
            obj.insert("background_image_ref".into(), Value::String(token.clone()));
        }
        slides.push(clone);
    }
}

/// Drop any slides beyond `count`.
pub fn truncate_to_count(slides: &mut Vec<Value>, count: usize) {
    slides.truncate(count);
}

/// Coerce a slide's `texts` field into a non-empty typed list. A bare
/// object is wrapped; anything else yields one placeholder entry
/// centered on the canvas.
pub fn coerce_texts(raw: Option<&Value>, geometry: &CanvasGeometry) -> Vec<GeneratedText> {
    let entries: Vec<&Value> = match raw {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(obj @ Value::Object(_)) => vec![obj],
        _ => Vec::new(),
    };

    let texts: Vec<GeneratedText> = entries
        .into_iter()
        .filter_map(|v| parse_text(v, geometry))
        .collect();

    if texts.is_empty() {
        vec![placeholder_text(geometry)]
    } else {
        texts
    }
}

/// Coerce a slide's `overlays` field into a typed list. A bare object
/// is wrapped; anything else yields an empty list.
pub fn coerce_overlays(raw: Option<&Value>) -> Vec<GeneratedOverlay> {
    let entries: Vec<&Value> = match raw {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(obj @ Value::Object(_)) => vec![obj],
        _ => Vec::new(),
    };

    entries.into_iter().filter_map(parse_overlay).collect()
}

/// Snap every text entry's size to a tier and move unsafe positions
/// back inside the safe margins. Returns the number of positions
/// adjusted.
pub fn reclamp_positions(texts: &mut [GeneratedText], geometry: &CanvasGeometry) -> u32 {
    let mut adjusted = 0;

    for text in texts {
        let tier = snap_to_tier(text.size);
        text.size = tier.size as f64;

        match safe_position(
            &text.text,
            tier,
            text.position_x,
            text.position_y,
            geometry.width,
            geometry.height,
        ) {
            PositionCheck::Safe => {}
            PositionCheck::Adjusted { x, y } => {
                text.position_x = x;
                text.position_y = y;
                adjusted += 1;
            }
        }
    }

    adjusted
}

// ---------------------------------------------------------------------------
// Slide / entry parsing
// ---------------------------------------------------------------------------

fn repair_slide(raw: &Value, index: usize, ctx: &RepairContext) -> GeneratedSlide {
    let background_image_ref = raw
        .get("background_image_ref")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| fallback_background(index, ctx));

    GeneratedSlide {
        background_image_ref,
        background_image_id: None,
        texts: coerce_texts(raw.get("texts"), &ctx.geometry),
        overlays: coerce_overlays(raw.get("overlays")),
    }
}

fn parse_text(raw: &Value, geometry: &CanvasGeometry) -> Option<GeneratedText> {
    let obj = raw.as_object()?;
    let text = obj
        .get("text")
        .and_then(Value::as_str)
        .unwrap_or(PLACEHOLDER_TEXT)
        .to_string();

    Some(GeneratedText {
        text,
        position_x: number_or(obj.get("position_x"), geometry.width as f64 / 2.0),
        position_y: number_or(obj.get("position_y"), geometry.height as f64 / 2.0),
        size: number_or(obj.get("size"), default_text_size()),
    })
}

fn parse_overlay(raw: &Value) -> Option<GeneratedOverlay> {
    let obj = raw.as_object()?;
    let image_ref = obj.get("image_ref").and_then(Value::as_str)?.to_string();

    let (min_size, max_size) = OVERLAY_SIZE_RANGE;
    Some(GeneratedOverlay {
        image_ref,
        image_id: None,
        position_x: number_or(obj.get("position_x"), 0.0),
        position_y: number_or(obj.get("position_y"), 0.0),
        rotation: number_or(obj.get("rotation"), 0.0).rem_euclid(360.0),
        size: number_or(obj.get("size"), DEFAULT_OVERLAY_SIZE).clamp(min_size, max_size),
    })
}

fn placeholder_slides(ctx: &RepairContext) -> Vec<Value> {
    (0..ctx.slide_count)
        .map(|i| {
            serde_json::json!({
                "background_image_ref": fallback_background(i, ctx),
                "texts": [],
                "overlays": [],
            })
        })
        .collect()
}

fn placeholder_text(geometry: &CanvasGeometry) -> GeneratedText {
    GeneratedText {
        text: PLACEHOLDER_TEXT.to_string(),
        position_x: geometry.width as f64 / 2.0,
        position_y: geometry.height as f64 / 2.0,
        size: default_text_size(),
    }
}

/// Middle tier; matches the editor's default for new text overlays.
fn default_text_size() -> f64 {
    FONT_TIERS[FONT_TIERS.len() / 2].size as f64
}

fn fallback_background(index: usize, ctx: &RepairContext) -> String {
    if ctx.background_tokens.is_empty() {
        String::new()
    } else {
        ctx.background_tokens[index % ctx.background_tokens.len()].clone()
    }
}

fn number_or(raw: Option<&Value>, default: f64) -> f64 {
    raw.and_then(Value::as_f64).unwrap_or(default)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
