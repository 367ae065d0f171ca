//! Sequence combinators: concatenation, sampling, filtering and mapping.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SamplingConfig;
use crate::error::EmptyStateError;
use crate::sequence::{BoxedSequence, ValueSequence};

/// Yields every element of each input sequence in turn.
///
/// Inputs already exhausted at construction are dropped up front, so the
/// front of the queue always has an element unless the whole thing is done.
pub struct Concat<T> {
    parts: VecDeque<BoxedSequence<T>>,
}

impl<T> Concat<T> {
    pub fn new(parts: Vec<BoxedSequence<T>>) -> Self {
        Self {
            parts: parts.into_iter().filter(|part| part.has_element()).collect(),
        }
    }

    /// Number of inputs not yet exhausted
    pub fn remaining_parts(&self) -> usize {
        self.parts.len()
    }
}

impl<T> ValueSequence for Concat<T> {
    type Item = T;

    fn has_element(&self) -> bool {
        self.parts.front().is_some_and(|part| part.has_element())
    }

    fn element(&self) -> Result<T, EmptyStateError> {
        self.parts.front().ok_or(EmptyStateError)?.element()
    }

    fn advance(&mut self) {
        if let Some(front) = self.parts.front_mut() {
            front.advance();
        }
        while self.parts.front().is_some_and(|part| !part.has_element()) {
            self.parts.pop_front();
        }
    }
}

/// Concatenate sequences in order
pub fn concat<T>(parts: Vec<BoxedSequence<T>>) -> Concat<T> {
    Concat::new(parts)
}

/// Keeps a seeded pseudo-random subset of the inner sequence.
///
/// The first element of a non-empty input is always kept, so sampling never
/// turns a non-empty sequence into an empty one. Every later element is kept
/// with probability `fraction`.
pub struct Sampled<S> {
    inner: S,
    fraction: f64,
    rng: StdRng,
}

impl<S: ValueSequence> Sampled<S> {
    pub fn new(inner: S, config: SamplingConfig) -> Self {
        Self {
            inner,
            fraction: config.fraction(),
            rng: StdRng::seed_from_u64(config.seed()),
        }
    }

    fn keep_next(&mut self) -> bool {
        self.fraction >= 1.0 || self.rng.gen_bool(self.fraction)
    }
}

impl<S: ValueSequence> ValueSequence for Sampled<S> {
    type Item = S::Item;

    fn has_element(&self) -> bool {
        self.inner.has_element()
    }

    fn element(&self) -> Result<S::Item, EmptyStateError> {
        self.inner.element()
    }

    fn advance(&mut self) {
        self.inner.advance();
        while self.inner.has_element() && !self.keep_next() {
            self.inner.advance();
        }
    }
}

/// Skips elements rejected by a predicate.
pub struct Filtered<S, F> {
    inner: S,
    predicate: F,
}

impl<S, F> Filtered<S, F>
where
    S: ValueSequence,
    F: Fn(&S::Item) -> bool,
{
    pub fn new(inner: S, predicate: F) -> Self {
        let mut filtered = Self { inner, predicate };
        filtered.settle();
        filtered
    }

    fn settle(&mut self) {
        while let Ok(value) = self.inner.element() {
            if (self.predicate)(&value) {
                break;
            }
            self.inner.advance();
        }
    }
}

impl<S, F> ValueSequence for Filtered<S, F>
where
    S: ValueSequence,
    F: Fn(&S::Item) -> bool,
{
    type Item = S::Item;

    fn has_element(&self) -> bool {
        self.inner.has_element()
    }

    fn element(&self) -> Result<S::Item, EmptyStateError> {
        self.inner.element()
    }

    fn advance(&mut self) {
        if self.inner.has_element() {
            self.inner.advance();
            self.settle();
        }
    }
}

/// Applies a pure function to every element.
///
/// The function runs on every `element()` call, so it must be deterministic
/// for repeated reads to agree.
pub struct Mapped<S, F> {
    inner: S,
    mapper: F,
}

impl<S, F> Mapped<S, F> {
    pub fn new(inner: S, mapper: F) -> Self {
        Self { inner, mapper }
    }
}

impl<S, F, U> ValueSequence for Mapped<S, F>
where
    S: ValueSequence,
    F: Fn(S::Item) -> U,
{
    type Item = U;

    fn has_element(&self) -> bool {
        self.inner.has_element()
    }

    fn element(&self) -> Result<U, EmptyStateError> {
        self.inner.element().map(&self.mapper)
    }

    fn advance(&mut self) {
        self.inner.advance()
    }
}
