//! Test helpers for the queue simulation. More docs to come...

#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::default_trait_access,
    clippy::cast_precision_loss
)]

use rand::rngs::mock::StepRng;

/// Number of bits of a `u64` discarded by `rand` when producing an `f64` in `[0, 1)`.
const DISCARDED_BITS: u32 = 64 - 53;

/// Returns a generator for which every standard `f64` draw equals `u` (rounded down to the
/// nearest multiple of `2^-53`).
///
/// This relies on `rand` turning `next_u64` into a float by keeping the 53 most significant bits,
/// so a constant `StepRng` yields a constant uniform variate. Handy for pinning the exact
/// cumulative bucket a discrete sampler lands in.
///
/// # Panics
///
/// Panics if `u` is not in `[0, 1)`.
#[must_use]
pub fn fixed_uniform(u: f64) -> StepRng {
    assert!((0.0..1.0).contains(&u), "uniform variate must be in [0, 1)");
    StepRng::new(bits_for(u), 0)
}

/// Returns a generator producing the uniform variates `start`, `start + step`, ... (each rounded
/// down to the nearest multiple of `2^-53`, wrapping around at 1).
#[must_use]
pub fn stepped_uniform(start: f64, step: f64) -> StepRng {
    StepRng::new(bits_for(start), bits_for(step))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn bits_for(u: f64) -> u64 {
    let scale = (1_u64 << 53) as f64;
    ((u * scale) as u64) << DISCARDED_BITS
}
