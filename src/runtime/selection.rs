use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::{ModelConfig, ModelRegistry};

/// Pick up to `count` distinct models not named in `exclude`, uniformly at random
pub fn select_models<'a>(
    registry: &'a ModelRegistry,
    count: usize,
    exclude: &[String],
) -> Vec<&'a ModelConfig> {
    select_models_with(&mut rand::thread_rng(), registry, count, exclude)
}

/// Same as [`select_models`] with a caller-supplied RNG
pub fn select_models_with<'a, R: Rng + ?Sized>(
    rng: &mut R,
    registry: &'a ModelRegistry,
    count: usize,
    exclude: &[String],
) -> Vec<&'a ModelConfig> {
    let mut candidates: Vec<&ModelConfig> = registry
        .models()
        .iter()
        .filter(|m| !exclude.contains(&m.key))
        .collect();

    candidates.shuffle(rng);
    candidates.truncate(count);
    candidates
}
