//! Variant selection by policy.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::playlist::{Resolution, VariantStream};

/// How to pick a variant from a master playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QualityPolicy {
    /// Maximum height; ties broken by maximum bandwidth.
    Best,
    /// Minimum height; ties broken by maximum bandwidth.
    Worst,
    /// First variant whose resolution string contains the needle
    /// (case-insensitive); falls back to `Best` when nothing matches.
    Match(String),
    /// Delegate the choice to a [`VariantPrompt`].
    Interactive,
}

impl QualityPolicy {
    /// Maps the CLI quality token; an absent token means interactive.
    pub fn from_token(token: Option<&str>) -> Self {
        match token {
            None => Self::Interactive,
            Some(t) if t.eq_ignore_ascii_case("best") => Self::Best,
            Some(t) if t.eq_ignore_ascii_case("worst") => Self::Worst,
            Some(t) => Self::Match(t.to_owned()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    #[error("master playlist has no variants with resolution information")]
    NoVariants,

    #[error("variant selection cancelled")]
    Cancelled,
}

/// Capability for interactive variant choice, so automated contexts can
/// supply a deterministic implementation instead of blocking on a console.
/// Implementations receive the candidates sorted best-first and return an
/// index into that slice; `None` cancels the run.
#[async_trait]
pub trait VariantPrompt: Send + Sync {
    async fn choose(&self, variants: &[VariantStream]) -> Option<usize>;
}

fn sort_key(variant: &VariantStream) -> (u32, u64) {
    let resolution = variant.resolution.unwrap_or(Resolution {
        width: 0,
        height: 0,
    });
    (resolution.height, variant.bandwidth)
}

/// Picks one variant. Entries lacking resolution information are filtered
/// out first; an empty remainder is `SelectError::NoVariants`.
pub async fn select_variant(
    variants: &[VariantStream],
    policy: &QualityPolicy,
    prompt: &dyn VariantPrompt,
) -> Result<VariantStream, SelectError> {
    let mut candidates: Vec<VariantStream> = variants
        .iter()
        .filter(|v| v.resolution.is_some())
        .cloned()
        .collect();
    if candidates.is_empty() {
        return Err(SelectError::NoVariants);
    }
    // Best-first: height descending, bandwidth breaking ties.
    candidates.sort_by(|a, b| sort_key(b).cmp(&sort_key(a)));

    let chosen = match policy {
        QualityPolicy::Best => candidates.first().cloned(),
        QualityPolicy::Worst => {
            let min_height = candidates.iter().map(|v| sort_key(v).0).min().unwrap_or(0);
            // First hit in the best-first order has the highest bandwidth
            // among the lowest-height group.
            candidates
                .iter()
                .find(|v| sort_key(v).0 == min_height)
                .cloned()
        }
        QualityPolicy::Match(needle) => {
            let needle_lower = needle.to_lowercase();
            let hit = candidates
                .iter()
                .find(|v| {
                    v.resolution
                        .map(|r| r.to_string().contains(&needle_lower))
                        .unwrap_or(false)
                })
                .cloned();
            if hit.is_none() {
                warn!(quality = %needle, "no variant matches requested quality, using best");
            }
            hit.or_else(|| candidates.first().cloned())
        }
        QualityPolicy::Interactive => match prompt.choose(&candidates).await {
            Some(index) => candidates.get(index).cloned(),
            None => return Err(SelectError::Cancelled),
        },
    };

    let chosen = chosen.ok_or(SelectError::NoVariants)?;
    debug!(uri = %chosen.uri, bandwidth = chosen.bandwidth, "variant selected");
    Ok(chosen)
}
