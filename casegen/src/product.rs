//! Lazy Cartesian products using an odometer.

use tracing::trace;

use crate::error::EmptyStateError;
use crate::sequence::{BoxedSequence, SequenceFactory, ValueSequence};

/// The Cartesian product of several sequences, enumerated like a mixed-radix
/// counter with the last dimension varying fastest.
///
/// Only the current tuple is held in memory. When a dimension runs out, the
/// dimension to its left advances and every dimension to its right is
/// re-derived from its factory.
pub struct CartesianProduct<T> {
    factories: Vec<SequenceFactory<T>>,
    dimensions: Vec<BoxedSequence<T>>,
    current: Option<Vec<T>>,
}

impl<T: Clone> CartesianProduct<T> {
    /// Build the product, deriving each dimension's first sequence from its
    /// factory.
    pub fn new(factories: Vec<SequenceFactory<T>>) -> Self {
        let dimensions = factories.iter().map(|make| make()).collect();
        Self::with_initial(dimensions, factories)
    }

    /// Build the product from already-derived first sequences; the factories
    /// are only used for re-derivation.
    ///
    /// Dimensions are paired with factories by position; entries of the
    /// longer list without a partner are dropped.
    pub fn with_initial(dimensions: Vec<BoxedSequence<T>>, factories: Vec<SequenceFactory<T>>) -> Self {
        if dimensions.len() != factories.len() {
            trace!(
                dimensions = dimensions.len(),
                factories = factories.len(),
                "unpaired product dimensions dropped"
            );
        }
        let (dimensions, factories): (Vec<_>, Vec<_>) = dimensions.into_iter().zip(factories).unzip();
        // any empty dimension empties the product
        let current = dimensions
            .iter()
            .map(|dimension| dimension.element().ok())
            .collect();
        Self {
            factories,
            dimensions,
            current,
        }
    }

    /// Number of dimensions
    pub fn arity(&self) -> usize {
        self.dimensions.len()
    }
}

impl<T: Clone> ValueSequence for CartesianProduct<T> {
    type Item = Vec<T>;

    fn has_element(&self) -> bool {
        self.current.is_some()
    }

    fn element(&self) -> Result<Vec<T>, EmptyStateError> {
        self.current.clone().ok_or(EmptyStateError)
    }

    fn advance(&mut self) {
        let Some(mut tuple) = self.current.take() else {
            return;
        };

        let mut slot = self.dimensions.len();
        loop {
            if slot == 0 {
                // the leftmost dimension ran out
                return;
            }
            slot -= 1;
            self.dimensions[slot].advance();
            if let Ok(value) = self.dimensions[slot].element() {
                tuple[slot] = value;
                break;
            }
        }

        for trailing in slot + 1..self.dimensions.len() {
            let fresh = (self.factories[trailing])();
            match fresh.element() {
                Ok(value) => {
                    tuple[trailing] = value;
                    self.dimensions[trailing] = fresh;
                }
                Err(EmptyStateError) => {
                    trace!(dimension = trailing, "re-derived dimension is empty; product exhausted");
                    return;
                }
            }
        }

        self.current = Some(tuple);
    }
}
