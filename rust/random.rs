//! Uniform random fills, behind the `rand` feature.

use rand::distributions::uniform::SampleUniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::layout::ResolvedLayout;
use crate::view::StridedView;

/// Uniform random fills for views of any rank.
pub trait Randomize: StridedView
where
    Self::Element: SampleUniform + PartialOrd,
{
    /// Sets every element to a uniform draw from `[min, max]`, in row-major order.
    #[track_caller]
    fn randomize<R: Rng + ?Sized>(&self, min: Self::Element, max: Self::Element, rng: &mut R) {
        assert!(min <= max, "empty random range");
        let storage = self.storage();
        for position in self.layout().positions() {
            storage.set(position, rng.gen_range(min..=max));
        }
    }

    /// Same as [`randomize`](Self::randomize) with a reproducible generator.
    #[track_caller]
    fn randomize_seeded(&self, min: Self::Element, max: Self::Element, seed: u64) {
        self.randomize(min, max, &mut StdRng::seed_from_u64(seed))
    }
}

impl<V: StridedView> Randomize for V where V::Element: SampleUniform + PartialOrd {}
