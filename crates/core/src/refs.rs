//! Request-scoped reference tokens for candidate images.
//!
//! Generation prompts and schemas refer to images by short tokens
//! (`c01` for background/collection candidates, `p01` for product
//! candidates) instead of database UUIDs. The resolver assigns tokens
//! in pool order, keeps the reverse lookup, and swaps tokens back for
//! persistent ids and URLs once a document has been generated. Tokens
//! exist only for the lifetime of one request and are never persisted.

use std::collections::HashMap;

use crate::document::GeneratedSlideshow;
use crate::types::DbId;

/// Token prefix for background-eligible (collection-sourced) images.
const BACKGROUND_PREFIX: char = 'c';

/// Token prefix for overlay-eligible (product-sourced) images.
const PRODUCT_PREFIX: char = 'p';

/// Minimum zero-padded width of a token's numeric suffix.
const MIN_SUFFIX_WIDTH: usize = 2;

/// A candidate image with its resolved client-fetchable URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolImage {
    pub id: DbId,
    pub url: String,
}

/// A token assigned to one pool image.
#[derive(Debug, Clone)]
pub struct TokenRef {
    pub token: String,
    pub image: PoolImage,
}

/// The result of resolving both candidate pools for one request.
#[derive(Debug, Default)]
pub struct ResolvedRefs {
    pub background: Vec<TokenRef>,
    pub overlay: Vec<TokenRef>,
    reverse: HashMap<String, PoolImage>,
}

impl ResolvedRefs {
    /// Assign tokens to both pools in pool order.
    ///
    /// Suffixes are zero-padded to two digits; pools larger than 99
    /// entries widen the padding to however many digits the pool size
    /// needs, so tokens never collide.
    pub fn resolve(backgrounds: &[PoolImage], overlays: &[PoolImage]) -> Self {
        let background = assign_tokens(BACKGROUND_PREFIX, backgrounds);
        let overlay = assign_tokens(PRODUCT_PREFIX, overlays);

        let mut reverse = HashMap::with_capacity(background.len() + overlay.len());
        for r in background.iter().chain(overlay.iter()) {
            reverse.insert(r.token.clone(), r.image.clone());
        }

        Self {
            background,
            overlay,
            reverse,
        }
    }

    pub fn background_tokens(&self) -> Vec<String> {
        self.background.iter().map(|r| r.token.clone()).collect()
    }

    pub fn overlay_tokens(&self) -> Vec<String> {
        self.overlay.iter().map(|r| r.token.clone()).collect()
    }

    /// Look a token up in the reverse map.
    pub fn lookup(&self, token: &str) -> Option<&PoolImage> {
        self.reverse.get(token)
    }

    /// Replace every resolvable token in `doc` with the image's URL and
    /// record the persistent id alongside. Tokens that fail to resolve
    /// are left untouched -- a broken reference must not abort an
    /// otherwise-valid slideshow.
    ///
    /// Returns the number of references resolved.
    pub fn materialize(&self, doc: &mut GeneratedSlideshow) -> usize {
        let mut resolved = 0;

        for slide in &mut doc.slides {
            if let Some(image) = self.reverse.get(&slide.background_image_ref) {
                slide.background_image_id = Some(image.id);
                slide.background_image_ref = image.url.clone();
                resolved += 1;
            }
            for overlay in &mut slide.overlays {
                if let Some(image) = self.reverse.get(&overlay.image_ref) {
                    overlay.image_id = Some(image.id);
                    overlay.image_ref = image.url.clone();
                    resolved += 1;
                }
            }
        }

        resolved
    }
}

/// Assign `<prefix><NN>` tokens to a pool in order, 1-based.
fn assign_tokens(prefix: char, pool: &[PoolImage]) -> Vec<TokenRef> {
    let width = suffix_width(pool.len());
    pool.iter()
        .enumerate()
        .map(|(i, image)| TokenRef {
            token: format!("{prefix}{:0width$}", i + 1),
            image: image.clone(),
        })
        .collect()
}

/// Digits needed for a pool of `len` entries, never less than
/// [`MIN_SUFFIX_WIDTH`].
fn suffix_width(len: usize) -> usize {
    let mut digits = 1;
    let mut n = len;
    while n >= 10 {
        digits += 1;
        n /= 10;
    }
    digits.max(MIN_SUFFIX_WIDTH)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
