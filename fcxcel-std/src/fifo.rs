//! Bounded FIFO.

use std::collections::VecDeque;

/// FIFO with a fixed number of slots.
#[derive(Debug, Clone)]
pub struct Fifo<V> {
    slots: usize,
    inner: VecDeque<V>,
}

impl<V> Fifo<V> {
    /// Creates an empty FIFO with `slots` slots.
    pub fn new(slots: usize) -> Self { Self { slots, inner: VecDeque::with_capacity(slots) } }

    /// Number of occupied slots.
    pub fn len(&self) -> usize { self.inner.len() }

    /// Number of free slots.
    pub fn vacancy(&self) -> usize { self.slots - self.inner.len() }

    /// Returns whether no slot is occupied.
    pub fn is_empty(&self) -> bool { self.inner.is_empty() }

    /// Returns whether every slot is occupied.
    pub fn is_full(&self) -> bool { self.inner.len() >= self.slots }

    /// Pushes `value` to the back. Returns it back if the FIFO is full.
    pub fn enq(&mut self, value: V) -> Result<(), V> {
        if self.is_full() {
            return Err(value);
        }
        self.inner.push_back(value);
        Ok(())
    }

    /// Pops the front value.
    pub fn deq(&mut self) -> Option<V> { self.inner.pop_front() }

    /// Returns the front value.
    pub fn peek(&self) -> Option<&V> { self.inner.front() }

    /// Removes every value.
    pub fn clear(&mut self) { self.inner.clear() }

    /// Iterates from front to back.
    pub fn iter(&self) -> impl Iterator<Item = &V> + '_ { self.inner.iter() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_in_first_out() {
        let mut fifo = Fifo::new(3);
        assert!(fifo.is_empty());
        assert_eq!(fifo.enq(1), Ok(()));
        assert_eq!(fifo.enq(2), Ok(()));
        assert_eq!(fifo.peek(), Some(&1));
        assert_eq!(fifo.deq(), Some(1));
        assert_eq!(fifo.enq(3), Ok(()));
        assert_eq!(fifo.iter().copied().collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(fifo.deq(), Some(2));
        assert_eq!(fifo.deq(), Some(3));
        assert_eq!(fifo.deq(), None);
    }

    #[test]
    fn full_fifo_rejects() {
        let mut fifo = Fifo::new(2);
        fifo.enq('a').unwrap();
        fifo.enq('b').unwrap();
        assert!(fifo.is_full());
        assert_eq!(fifo.vacancy(), 0);
        assert_eq!(fifo.enq('c'), Err('c'));
        assert_eq!(fifo.len(), 2);
        fifo.clear();
        assert_eq!(fifo.vacancy(), 2);
    }
}
