//! Structural synthesis of arrays from a component sequence.

use crate::error::EmptyStateError;
use crate::product::CartesianProduct;
use crate::sequence::{SequenceFactory, ValueSequence};

enum Phase<T> {
    Absent,
    Empty,
    Filled {
        length: usize,
        product: CartesianProduct<T>,
    },
    Done,
}

/// Arrays of every length from 0 to a maximum, built from a component
/// sequence.
///
/// Yields `None` (the null array) first, then `Some(vec![])`, then every
/// array of length `1..=max_length` in odometer order over the component
/// values. The two boundary values are produced even when `max_length` is 0
/// or the component sequence is empty.
pub struct ArraySequence<T> {
    component: SequenceFactory<T>,
    max_length: usize,
    phase: Phase<T>,
}

impl<T: Clone> ArraySequence<T> {
    pub fn new(component: SequenceFactory<T>, max_length: usize) -> Self {
        Self {
            component,
            max_length,
            phase: Phase::Absent,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    fn start_length(&self, length: usize) -> Phase<T> {
        if length > self.max_length {
            return Phase::Done;
        }
        let product = CartesianProduct::new(vec![self.component.clone(); length]);
        if product.has_element() {
            Phase::Filled { length, product }
        } else {
            // longer arrays need the same component values, so none exist
            Phase::Done
        }
    }
}

impl<T: Clone> ValueSequence for ArraySequence<T> {
    type Item = Option<Vec<T>>;

    fn has_element(&self) -> bool {
        !matches!(self.phase, Phase::Done)
    }

    fn element(&self) -> Result<Option<Vec<T>>, EmptyStateError> {
        match &self.phase {
            Phase::Absent => Ok(None),
            Phase::Empty => Ok(Some(Vec::new())),
            Phase::Filled { product, .. } => product.element().map(Some),
            Phase::Done => Err(EmptyStateError),
        }
    }

    fn advance(&mut self) {
        self.phase = match std::mem::replace(&mut self.phase, Phase::Done) {
            Phase::Absent => Phase::Empty,
            Phase::Empty => self.start_length(1),
            Phase::Filled {
                length,
                mut product,
            } => {
                product.advance();
                if product.has_element() {
                    Phase::Filled { length, product }
                } else {
                    self.start_length(length + 1)
                }
            }
            Phase::Done => Phase::Done,
        };
    }
}
