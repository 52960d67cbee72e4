//! Lock-free SPSC ring buffer between the cpal callback and the
//! conditioning thread.
//!
//! The callback thread pushes raw mono samples at the device's native
//! rate; the conditioning thread pops fixed-size blocks. Backed by the
//! `ringbuf` crate so the audio callback never takes a lock.

use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapRb,
};

/// Default capacity: ~5 seconds of 48 kHz mono audio.
const DEFAULT_CAPACITY: usize = 262_144;

/// Producer half — lives in the cpal audio callback.
pub struct SampleProducer {
    inner: ringbuf::HeapProd<f32>,
}

/// Consumer half — lives in the conditioning thread.
pub struct SampleConsumer {
    inner: ringbuf::HeapCons<f32>,
}

/// Create a matched producer/consumer pair.
pub fn sample_ring(capacity: Option<usize>) -> (SampleProducer, SampleConsumer) {
    let rb = HeapRb::<f32>::new(capacity.unwrap_or(DEFAULT_CAPACITY));
    let (prod, cons) = rb.split();
    (SampleProducer { inner: prod }, SampleConsumer { inner: cons })
}

impl SampleProducer {
    /// Push samples, returning how many were written. A full buffer drops
    /// the tail; the consumer will catch up.
    pub fn push_slice(&mut self, samples: &[f32]) -> usize {
        self.inner.push_slice(samples)
    }
}

impl SampleConsumer {
    /// Number of samples currently buffered.
    pub fn available(&self) -> usize {
        self.inner.occupied_len()
    }

    /// Pop exactly one block of `len` samples, or `None` if fewer are
    /// buffered. Never returns a partial block.
    pub fn pop_block(&mut self, len: usize) -> Option<Vec<f32>> {
        if self.available() < len {
            return None;
        }
        let mut buf = vec![0.0f32; len];
        let read = self.inner.pop_slice(&mut buf);
        debug_assert_eq!(read, len);
        Some(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_block_is_all_or_nothing() {
        let (mut prod, mut cons) = sample_ring(Some(16));
        prod.push_slice(&[1.0, 2.0, 3.0]);
        assert!(cons.pop_block(4).is_none());
        prod.push_slice(&[4.0]);
        assert_eq!(cons.pop_block(4).unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(cons.available(), 0);
    }

    #[test]
    fn full_buffer_drops_tail() {
        let (mut prod, _cons) = sample_ring(Some(4));
        assert_eq!(prod.push_slice(&[0.0; 6]), 4);
    }
}
