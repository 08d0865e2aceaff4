use std::collections::BTreeMap;
use std::iter::FusedIterator;

use sweep_core::Condition;

use crate::expand::Hypercube;

/// Odometer over the points of a [`Hypercube`].
///
/// Each factor is one digit whose radix is the length of its level list. The
/// all-zero index is emitted first; each step adds one to the last factor and
/// propagates the carry towards the first. The sequence ends when the carry
/// overflows out of the first factor.
#[derive(Debug, Clone)]
pub struct Conditions<'a> {
    cube: &'a Hypercube,
    digits: Vec<usize>,
    remaining: usize,
}

impl<'a> Conditions<'a> {
    fn starting_at(cube: &'a Hypercube, index: usize) -> Self {
        let total = cube.len();
        let digits = digits_for(cube, index.min(total));
        Self {
            cube,
            digits,
            remaining: total.saturating_sub(index),
        }
    }

    /// Flat index of the next condition to be produced.
    pub fn position(&self) -> usize {
        self.cube.len() - self.remaining
    }

    fn current(&self) -> Condition {
        let levels: BTreeMap<_, _> = self
            .cube
            .factors()
            .iter()
            .zip(&self.digits)
            .map(|(factor, &digit)| (factor.name.clone(), factor.levels[digit].clone()))
            .collect();
        Condition::from_levels_unchecked(levels)
    }

    fn advance(&mut self) {
        for (digit, factor) in self
            .digits
            .iter_mut()
            .zip(self.cube.factors())
            .rev()
        {
            *digit += 1;
            if *digit < factor.levels.len() {
                return;
            }
            *digit = 0;
        }
    }
}

impl Iterator for Conditions<'_> {
    type Item = Condition;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let condition = self.current();
        self.remaining -= 1;
        if self.remaining > 0 {
            self.advance();
        }
        Some(condition)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Conditions<'_> {}

impl FusedIterator for Conditions<'_> {}

fn digits_for(cube: &Hypercube, mut index: usize) -> Vec<usize> {
    let mut digits = vec![0; cube.factors().len()];
    for (digit, factor) in digits.iter_mut().zip(cube.factors()).rev() {
        let radix = factor.levels.len();
        *digit = index % radix;
        index /= radix;
    }
    digits
}

impl Hypercube {
    /// Enumerates every condition in odometer order.
    pub fn conditions(&self) -> Conditions<'_> {
        Conditions::starting_at(self, 0)
    }

    /// Enumerates conditions starting at a flat index, as a restart would.
    pub fn conditions_from(&self, index: usize) -> Conditions<'_> {
        Conditions::starting_at(self, index)
    }

    /// Returns the condition at a flat index without enumerating its predecessors.
    pub fn condition_at(&self, index: usize) -> Option<Condition> {
        if index >= self.len() {
            return None;
        }
        Conditions::starting_at(self, index).next()
    }

    /// Returns true when every level of `condition` for this hypercube's
    /// factors is one of the factor's levels.
    pub fn contains(&self, condition: &Condition) -> bool {
        self.factors().iter().all(|factor| {
            condition.get(&factor.name).is_some_and(|level| {
                factor
                    .levels
                    .iter()
                    .any(|candidate| candidate.kind() == level.kind() && candidate.render() == level.render())
            })
        })
    }
}
