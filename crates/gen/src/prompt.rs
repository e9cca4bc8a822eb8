//! Prompt assembly and user-prompt parsing.

use std::sync::OnceLock;

use regex::Regex;

use crate::orchestrator::{CandidateImage, ProductBrief};

/// Slides generated when the prompt does not name a count.
pub const DEFAULT_SLIDE_COUNT: usize = 3;

/// Upper bound on requested slide counts; keeps the structural
/// contract a sane size.
pub const MAX_SLIDE_COUNT: usize = 10;

/// Extract the requested slide count from a free-text prompt.
///
/// Matches a digit sequence preceding the word "slide" (`"make a 3
/// slide video"`, `"5 slides please"`). Defaults to
/// [`DEFAULT_SLIDE_COUNT`], clamped to `1..=MAX_SLIDE_COUNT`.
pub fn extract_slide_count(prompt: &str) -> usize {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(\d+)\s*slide").expect("slide-count pattern is valid")
    });

    pattern
        .captures(prompt)
        .and_then(|caps| caps[1].parse::<usize>().ok())
        .unwrap_or(DEFAULT_SLIDE_COUNT)
        .clamp(1, MAX_SLIDE_COUNT)
}

/// System prompt for both phases.
pub fn build_system_prompt() -> String {
    [
        "You are a short-form video creative director for product marketing.",
        "You plan and produce slideshow documents: a sequence of slides, each \
         with a background image, text overlays, and optional product-image \
         overlays.",
        "Backgrounds are referenced by their c-tokens and product images by \
         their p-tokens; never invent tokens that were not offered.",
        "During planning you may call the provided read-only tools to study \
         example slideshows and image details before committing to a layout.",
        "Keep text punchy. One idea per slide.",
    ]
    .join("\n")
}

/// User message opening the planning phase: product metadata, the
/// user's own prompt, and the serialized candidate briefs.
pub fn build_planning_message(
    product: &ProductBrief,
    user_prompt: &str,
    backgrounds: &[(String, CandidateImage)],
    overlays: &[(String, CandidateImage)],
) -> String {
    let mut lines = Vec::new();

    lines.push(format!("Product: {}", product.name));
    if !product.description.is_empty() {
        lines.push(format!("Description: {}", product.description));
    }
    if let Some(industry) = &product.industry {
        lines.push(format!("Industry: {industry}"));
    }
    if let Some(product_type) = &product.product_type {
        lines.push(format!("Product type: {product_type}"));
    }

    lines.push(String::new());
    lines.push(format!("Request: {user_prompt}"));

    lines.push(String::new());
    lines.push("Background candidates:".to_string());
    for (token, image) in backgrounds {
        lines.push(format!("  {token}: {}", image.brief));
    }

    if overlays.is_empty() {
        lines.push("No product-image overlay candidates.".to_string());
    } else {
        lines.push("Product overlay candidates:".to_string());
        for (token, image) in overlays {
            lines.push(format!("  {token}: {}", image.brief));
        }
    }

    lines.push(String::new());
    lines.push(
        "Think through the slideshow out loud: narrative arc, which \
         backgrounds fit which beat, where product overlays help."
            .to_string(),
    );

    lines.join("\n")
}

/// User message that closes planning and demands the final document.
pub fn build_generation_message(slide_count: usize) -> String {
    format!(
        "Now produce the final slideshow document with exactly {slide_count} \
         slide(s), conforming to the response schema. Use only the offered \
         reference tokens."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_count_before_slide() {
        assert_eq!(extract_slide_count("make a 3 slide video"), 3);
        assert_eq!(extract_slide_count("5 slides please"), 5);
        assert_eq!(extract_slide_count("I want 7slide reel"), 7);
    }

    #[test]
    fn is_case_insensitive() {
        assert_eq!(extract_slide_count("4 SLIDES about coffee"), 4);
    }

    #[test]
    fn defaults_when_absent() {
        assert_eq!(extract_slide_count("make it pop"), DEFAULT_SLIDE_COUNT);
        assert_eq!(extract_slide_count(""), DEFAULT_SLIDE_COUNT);
    }

    #[test]
    fn ignores_numbers_not_tied_to_slides() {
        assert_eq!(
            extract_slide_count("show our 20% discount"),
            DEFAULT_SLIDE_COUNT
        );
    }

    #[test]
    fn clamps_to_bounds() {
        assert_eq!(extract_slide_count("0 slides"), 1);
        assert_eq!(extract_slide_count("99 slides"), MAX_SLIDE_COUNT);
    }

    #[test]
    fn planning_message_lists_tokens_and_briefs() {
        let product = ProductBrief {
            name: "Trail Mug".into(),
            description: "Enamel camping mug".into(),
            industry: Some("outdoor".into()),
            product_type: None,
        };
        let backgrounds = vec![(
            "c01".to_string(),
            CandidateImage {
                id: uuid::Uuid::new_v4(),
                url: "http://img/1.jpg".into(),
                brief: "campfire at dusk".into(),
            },
        )];
        let message = build_planning_message(&product, "make a 3 slide video", &backgrounds, &[]);
        assert!(message.contains("Trail Mug"));
        assert!(message.contains("c01: campfire at dusk"));
        assert!(message.contains("No product-image overlay candidates."));
    }
}
