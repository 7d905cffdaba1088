//! Demo-mode stand-in predictions
//!
//! Used only when no real model can be obtained. Labels carry no meaning; they
//! keep downstream consumers working end-to-end.

use rand::Rng;

/// Draw `rows` labels independently and uniformly from `[0, clusters)`
///
/// `clusters` of zero is treated as one.
pub fn demo_labels(rows: usize, clusters: usize) -> Vec<u32> {
    let upper = u32::try_from(clusters.max(1)).unwrap_or(u32::MAX);
    let mut rng = rand::thread_rng();
    (0..rows).map(|_| rng.gen_range(0..upper)).collect()
}
