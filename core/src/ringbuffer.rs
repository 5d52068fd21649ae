use crate::error::{AprsError, Result};

/// Fixed-capacity FIFO with indexed reads from the head
///
/// Writes never overwrite unread data: pushing into a full buffer is an
/// error. Storage is allocated once at construction.
pub struct RingBuffer<T> {
    storage: Vec<T>,
    head: usize,
    len: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            storage: vec![T::default(); capacity],
            head: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Free slots
    pub fn available(&self) -> usize {
        self.capacity() - self.len
    }

    pub fn push(&mut self, item: T) -> Result<()> {
        if self.available() == 0 {
            return Err(AprsError::BufferOverflow {
                needed: 1,
                available: 0,
            });
        }
        let tail = (self.head + self.len) % self.capacity();
        self.storage[tail] = item;
        self.len += 1;
        Ok(())
    }

    /// Append all of `items` or nothing
    pub fn extend_from_slice(&mut self, items: &[T]) -> Result<()> {
        if items.len() > self.available() {
            return Err(AprsError::BufferOverflow {
                needed: items.len(),
                available: self.available(),
            });
        }
        for &item in items {
            let tail = (self.head + self.len) % self.capacity();
            self.storage[tail] = item;
            self.len += 1;
        }
        Ok(())
    }

    /// Item `index` positions after the head
    pub fn get(&self, index: usize) -> Option<T> {
        if index >= self.len {
            return None;
        }
        Some(self.storage[(self.head + index) % self.capacity()])
    }

    /// Drop up to `count` items from the head, returning how many were dropped
    pub fn remove(&mut self, count: usize) -> usize {
        let count = count.min(self.len);
        if count > 0 {
            self.head = (self.head + count) % self.capacity();
            self.len -= count;
        }
        count
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Buffered items in order, as at most two contiguous slices
    pub fn as_slices(&self) -> (&[T], &[T]) {
        let capacity = self.capacity();
        if self.len == 0 {
            return (&[], &[]);
        }
        let end = self.head + self.len;
        if end <= capacity {
            (&self.storage[self.head..end], &[])
        } else {
            (&self.storage[self.head..], &self.storage[..end - capacity])
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        let (front, back) = self.as_slices();
        front.iter().chain(back.iter()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order_across_wrap() {
        let mut ring = RingBuffer::new(4);
        ring.extend_from_slice(&[1, 2, 3]).unwrap();
        assert_eq!(ring.remove(2), 2);
        ring.extend_from_slice(&[4, 5, 6]).unwrap();
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.iter().collect::<Vec<i32>>(), vec![3, 4, 5, 6]);
        assert_eq!(ring.get(0), Some(3));
        assert_eq!(ring.get(3), Some(6));
        assert_eq!(ring.get(4), None);

        let (front, back) = ring.as_slices();
        assert_eq!(front.len() + back.len(), 4);
    }

    #[test]
    fn test_overflow_is_an_error() {
        let mut ring = RingBuffer::new(3);
        ring.extend_from_slice(&[1u8, 2]).unwrap();
        match ring.extend_from_slice(&[3, 4]) {
            Err(AprsError::BufferOverflow { needed, available }) => {
                assert_eq!((needed, available), (2, 1));
            }
            other => panic!("Expected BufferOverflow, got {:?}", other),
        }
        // Rejected write leaves contents untouched
        assert_eq!(ring.iter().collect::<Vec<u8>>(), vec![1, 2]);
        ring.push(3).unwrap();
        assert!(ring.push(4).is_err());
    }

    #[test]
    fn test_remove_clamps_to_len() {
        let mut ring = RingBuffer::new(8);
        ring.extend_from_slice(&[0.5f32; 5]).unwrap();
        assert_eq!(ring.remove(100), 5);
        assert!(ring.is_empty());
        assert_eq!(ring.available(), 8);
    }
}
