//! The repeated-access sequence abstraction every generator builds on.
//!
//! A [`ValueSequence`] is a cursor: it has a current element that can be read
//! any number of times, and it moves forward only when told to. This lets
//! combinators peek at a sub-sequence while deciding whether to advance it.

use std::rc::Rc;

use crate::combinators::{Filtered, Mapped, Sampled};
use crate::config::SamplingConfig;
use crate::error::EmptyStateError;

/// A lazy cursor over a finite or unbounded run of values.
///
/// Once `has_element()` returns false it never returns true again.
pub trait ValueSequence {
    /// The type of values this sequence yields
    type Item;

    /// Is there a current element?
    fn has_element(&self) -> bool;

    /// The current element; equal results until the next `advance()`
    fn element(&self) -> Result<Self::Item, EmptyStateError>;

    /// Move to the next element; a no-op once exhausted
    fn advance(&mut self);

    /// Transform every element with a pure function
    fn map<U, F>(self, mapper: F) -> Mapped<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Item) -> U,
    {
        Mapped::new(self, mapper)
    }

    /// Skip elements rejected by the predicate
    fn filter<F>(self, predicate: F) -> Filtered<Self, F>
    where
        Self: Sized,
        F: Fn(&Self::Item) -> bool,
    {
        Filtered::new(self, predicate)
    }

    /// Keep a seeded pseudo-random fraction of the elements
    fn sampled(self, config: SamplingConfig) -> Sampled<Self>
    where
        Self: Sized,
    {
        Sampled::new(self, config)
    }

    /// Erase the concrete sequence type
    fn boxed(self) -> BoxedSequence<Self::Item>
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }

    /// Drain the sequence through a standard iterator
    fn into_values(self) -> SequenceIter<Self>
    where
        Self: Sized,
    {
        SequenceIter { sequence: self }
    }

    /// Read and advance past up to `limit` elements
    fn take_values(&mut self, limit: usize) -> Vec<Self::Item> {
        let mut values = Vec::new();
        while values.len() < limit {
            match self.element() {
                Ok(value) => values.push(value),
                Err(EmptyStateError) => break,
            }
            self.advance();
        }
        values
    }
}

/// A type-erased sequence
pub type BoxedSequence<T> = Box<dyn ValueSequence<Item = T>>;

/// Produces fresh sequences from scratch, for dimensions that must be
/// re-derived after exhaustion.
pub type SequenceFactory<T> = Rc<dyn Fn() -> BoxedSequence<T>>;

impl<S: ValueSequence + ?Sized> ValueSequence for Box<S> {
    type Item = S::Item;

    fn has_element(&self) -> bool {
        (**self).has_element()
    }

    fn element(&self) -> Result<Self::Item, EmptyStateError> {
        (**self).element()
    }

    fn advance(&mut self) {
        (**self).advance()
    }
}

/// A sequence over a fixed list of values
#[derive(Debug, Clone)]
pub struct VecSequence<T> {
    values: Vec<T>,
    position: usize,
}

impl<T: Clone> VecSequence<T> {
    pub fn new(values: Vec<T>) -> Self {
        Self {
            values,
            position: 0,
        }
    }
}

impl<T: Clone> ValueSequence for VecSequence<T> {
    type Item = T;

    fn has_element(&self) -> bool {
        self.position < self.values.len()
    }

    fn element(&self) -> Result<T, EmptyStateError> {
        self.values.get(self.position).cloned().ok_or(EmptyStateError)
    }

    fn advance(&mut self) {
        if self.position < self.values.len() {
            self.position += 1;
        }
    }
}

/// A sequence with no elements
#[derive(Debug, Clone, Copy)]
pub struct EmptySequence<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> ValueSequence for EmptySequence<T> {
    type Item = T;

    fn has_element(&self) -> bool {
        false
    }

    fn element(&self) -> Result<T, EmptyStateError> {
        Err(EmptyStateError)
    }

    fn advance(&mut self) {}
}

/// Adapter turning a standard iterator into a repeated-access sequence by
/// caching the current item.
#[derive(Debug)]
pub struct IterSequence<I: Iterator> {
    iter: I,
    current: Option<I::Item>,
}

impl<I> ValueSequence for IterSequence<I>
where
    I: Iterator,
    I::Item: Clone,
{
    type Item = I::Item;

    fn has_element(&self) -> bool {
        self.current.is_some()
    }

    fn element(&self) -> Result<I::Item, EmptyStateError> {
        self.current.clone().ok_or(EmptyStateError)
    }

    fn advance(&mut self) {
        if self.current.is_some() {
            // fused: once the iterator has returned None we stop asking
            self.current = self.iter.next();
        }
    }
}

/// A standard iterator draining a sequence
#[derive(Debug)]
pub struct SequenceIter<S> {
    sequence: S,
}

impl<S: ValueSequence> Iterator for SequenceIter<S> {
    type Item = S::Item;

    fn next(&mut self) -> Option<S::Item> {
        let value = self.sequence.element().ok()?;
        self.sequence.advance();
        Some(value)
    }
}

/// Create a sequence over the given values
pub fn from_vec<T: Clone>(values: Vec<T>) -> VecSequence<T> {
    VecSequence::new(values)
}

/// Create a sequence over the items of an iterator
pub fn from_iter<I>(iter: I) -> IterSequence<I::IntoIter>
where
    I: IntoIterator,
    I::Item: Clone,
{
    let mut iter = iter.into_iter();
    let current = iter.next();
    IterSequence { iter, current }
}

/// Create a sequence with exactly one element
pub fn once<T: Clone>(value: T) -> VecSequence<T> {
    VecSequence::new(vec![value])
}

/// Create a sequence with no elements
pub fn empty<T>() -> EmptySequence<T> {
    EmptySequence {
        _phantom: std::marker::PhantomData,
    }
}

/// Wrap a closure as a sequence factory
pub fn factory<T, F>(make: F) -> SequenceFactory<T>
where
    F: Fn() -> BoxedSequence<T> + 'static,
{
    Rc::new(make)
}

/// A factory that restarts a fixed list of values on every call
pub fn repeat_vec<T: Clone + 'static>(values: Vec<T>) -> SequenceFactory<T> {
    factory(move || from_vec(values.clone()).boxed())
}
