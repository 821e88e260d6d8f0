use super::types::ReviewThreshold;

/// Whether a child with `priority` needs manual approval under `threshold`.
pub fn requires_review(priority: i64, threshold: &ReviewThreshold) -> bool {
    match threshold {
        ReviewThreshold::All => true,
        ReviewThreshold::None => false,
        ReviewThreshold::P0 => priority == 0,
        ReviewThreshold::P0P1 => priority <= 1,
        ReviewThreshold::P0P2 => priority <= 2,
        ReviewThreshold::Unrecognized(_) => true,
    }
}
