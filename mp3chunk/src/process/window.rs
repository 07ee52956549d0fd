use anyhow::{Result, bail};
use log::{debug, trace, warn};

use crate::process::source::DataSource;
use crate::utils::errors::ConfigError;

/// Geometry of a [`ChunkWindow`].
///
/// The window holds `lookback_slots + lookahead_slots` slots of
/// `slot_capacity` bytes each. Decoding happens inside the lookback slots;
/// once the consumer moves past them the lookahead slots are moved down and
/// the tail is refilled from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    pub slot_capacity: usize,
    pub lookback_slots: usize,
    pub lookahead_slots: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            slot_capacity: 4096,
            lookback_slots: 2,
            lookahead_slots: 2,
        }
    }
}

impl WindowConfig {
    pub fn total_slots(&self) -> usize {
        self.lookback_slots + self.lookahead_slots
    }

    /// Total window size in bytes.
    pub fn capacity(&self) -> usize {
        self.total_slots() * self.slot_capacity
    }

    /// Consumption offset at which the window shifts.
    pub fn lookback_bytes(&self) -> usize {
        self.lookback_slots * self.slot_capacity
    }

    pub fn lookahead_bytes(&self) -> usize {
        self.lookahead_slots * self.slot_capacity
    }

    /// Checks the geometry against the largest frame the decoder can meet.
    ///
    /// While the consumer sits inside the lookback slots at least
    /// `lookahead_bytes` lie ahead of it, so a maximum frame must fit there.
    pub fn validate(&self, max_frame_bytes: usize) -> Result<()> {
        if self.slot_capacity == 0 {
            bail!(ConfigError::ZeroSlotCapacity);
        }
        if self.lookback_slots == 0 {
            bail!(ConfigError::NoLookbackSlots);
        }
        if self.lookahead_slots == 0 {
            bail!(ConfigError::NoLookaheadSlots);
        }
        if self.lookahead_bytes() < max_frame_bytes {
            bail!(ConfigError::LookaheadTooSmall {
                lookahead: self.lookahead_bytes(),
                max_frame: max_frame_bytes,
            });
        }

        Ok(())
    }
}

/// Location of one slot inside the window buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub offset: usize,
    pub len: usize,
}

/// Fixed-capacity sliding window over a [`DataSource`].
///
/// ```text
/// ----------------------------------------------------------
///  | slot 0 | slot 1 | slot 2 | slot 3 |
/// ----------------------------------------------------------
///  ^                                   ^
///  window_start                        supply_position
/// ```
///
/// The buffer is allocated once. Slots are filled in order and only the
/// last filled slot may be short; a short fill marks the end of the stream
/// and nothing after it is filled until the window is primed again.
#[derive(Debug)]
pub struct ChunkWindow<S> {
    source: S,
    config: WindowConfig,
    buffer: Box<[u8]>,
    fill: Box<[usize]>,
    window_start: u64,
    supply_position: u64,
    end_of_stream: Option<u64>,
}

impl<S: DataSource> ChunkWindow<S> {
    /// Creates an empty window. Nothing is read until [`prime`](Self::prime).
    pub fn new(source: S, config: WindowConfig) -> Result<Self> {
        config.validate(0)?;

        Ok(Self {
            source,
            config,
            buffer: vec![0u8; config.capacity()].into_boxed_slice(),
            fill: vec![0usize; config.total_slots()].into_boxed_slice(),
            window_start: 0,
            supply_position: 0,
            end_of_stream: None,
        })
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Absolute stream offset of the first buffered byte.
    pub fn window_start(&self) -> u64 {
        self.window_start
    }

    /// Absolute stream offset up to which data has been requested.
    pub fn supply_position(&self) -> u64 {
        self.supply_position
    }

    /// Stream length, once a short fill has revealed it.
    pub fn end_of_stream(&self) -> Option<u64> {
        self.end_of_stream
    }

    /// Number of valid bytes buffered.
    pub fn valid_len(&self) -> usize {
        self.fill.iter().sum()
    }

    pub fn slot(&self, index: usize) -> Slot {
        Slot {
            offset: index * self.config.slot_capacity,
            len: self.fill[index],
        }
    }

    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        (0..self.fill.len()).map(|i| self.slot(i))
    }

    /// Contiguous valid bytes from `from` to the end of the buffered data.
    pub fn view(&self, from: usize) -> &[u8] {
        let end = self.valid_len();
        &self.buffer[from.min(end)..end]
    }

    /// Pulls up to one slot of data from the source into slot `index`.
    ///
    /// Returns `true` when the source returned less than a full slot. I/O
    /// errors count as a zero-length read.
    pub fn fill_slot(&mut self, index: usize) -> bool {
        let capacity = self.config.slot_capacity;
        let offset = index * capacity;
        let dst = &mut self.buffer[offset..offset + capacity];

        let count = match self.source.read_at(self.supply_position, dst) {
            Ok(count) => count.min(capacity),
            Err(e) => {
                warn!(
                    "Data source failed at offset {}, treating as end of stream: {e}",
                    self.supply_position
                );
                0
            }
        };

        trace!(
            "Filled slot {index} with {count} bytes at offset {}",
            self.supply_position
        );

        self.fill[index] = count;
        self.supply_position += count as u64;

        let short = count < capacity;
        if short {
            self.end_of_stream = Some(self.supply_position);
        }
        short
    }

    /// Discards all buffered data and refills every slot starting at the
    /// absolute offset `start`.
    ///
    /// Returns the end-of-stream offset when priming hit it.
    pub fn prime(&mut self, start: u64) -> Option<u64> {
        self.window_start = start;
        self.supply_position = start;
        self.end_of_stream = None;
        self.fill.fill(0);

        for index in 0..self.fill.len() {
            if self.fill_slot(index) {
                break;
            }
        }

        debug!(
            "Primed window at offset {start}: {} bytes buffered, end of stream {:?}",
            self.valid_len(),
            self.end_of_stream
        );

        self.end_of_stream
    }

    /// Drops the lookback slots, moves the lookahead slots to the front and
    /// refills the tail.
    ///
    /// Does nothing once the end of the stream is known, since every
    /// remaining byte is already buffered. Returns the end-of-stream offset
    /// when it is known after the shift.
    pub fn shift(&mut self) -> Option<u64> {
        if self.end_of_stream.is_some() {
            return self.end_of_stream;
        }

        let capacity = self.config.slot_capacity;
        let lookback = self.config.lookback_slots;
        let total = self.config.total_slots();
        let kept = total - lookback;

        self.buffer
            .copy_within(lookback * capacity..total * capacity, 0);
        self.fill.copy_within(lookback.., 0);
        self.fill[kept..].fill(0);
        self.window_start += (lookback * capacity) as u64;

        for index in kept..total {
            if self.fill_slot(index) {
                break;
            }
        }

        debug!(
            "Shifted window to offset {}, supply at {}",
            self.window_start, self.supply_position
        );

        self.end_of_stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::source::{CountingSource, SliceSource};
    use std::io;

    fn small_config() -> WindowConfig {
        WindowConfig {
            slot_capacity: 8,
            lookback_slots: 2,
            lookahead_slots: 2,
        }
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| i as u8).collect()
    }

    fn assert_supply_invariant<S: DataSource>(window: &ChunkWindow<S>) {
        assert_eq!(
            window.supply_position(),
            window.window_start() + window.valid_len() as u64
        );
    }

    #[test]
    fn default_geometry() {
        let config = WindowConfig::default();
        assert_eq!(config.total_slots(), 4);
        assert_eq!(config.capacity(), 16384);
        assert_eq!(config.lookback_bytes(), 8192);
    }

    #[test]
    fn config_validation() {
        let cases = [
            (
                WindowConfig {
                    slot_capacity: 0,
                    ..Default::default()
                },
                ConfigError::ZeroSlotCapacity,
            ),
            (
                WindowConfig {
                    lookback_slots: 0,
                    ..Default::default()
                },
                ConfigError::NoLookbackSlots,
            ),
            (
                WindowConfig {
                    lookahead_slots: 0,
                    ..Default::default()
                },
                ConfigError::NoLookaheadSlots,
            ),
            (
                WindowConfig {
                    slot_capacity: 1024,
                    lookahead_slots: 1,
                    ..Default::default()
                },
                ConfigError::LookaheadTooSmall {
                    lookahead: 1024,
                    max_frame: 2881,
                },
            ),
        ];

        for (config, expected) in cases {
            let err = config.validate(2881).unwrap_err();
            assert_eq!(err.downcast_ref::<ConfigError>(), Some(&expected));
        }

        assert!(WindowConfig::default().validate(2881).is_ok());
    }

    #[test]
    fn prime_fills_every_slot() -> Result<()> {
        let mut window = ChunkWindow::new(SliceSource::new(pattern(100)), small_config())?;

        assert_eq!(window.prime(0), None);
        assert_eq!(window.valid_len(), 32);
        assert_eq!(window.view(0), &pattern(32)[..]);
        assert_eq!(window.view(30), &[30, 31]);
        assert_eq!(window.view(40), &[] as &[u8]);
        assert_supply_invariant(&window);
        Ok(())
    }

    #[test]
    fn prime_stops_at_short_fill() -> Result<()> {
        let mut window = ChunkWindow::new(SliceSource::new(pattern(100)), small_config())?;

        // 100 - 88 = 12 bytes left: one full slot, one short slot, two empty
        assert_eq!(window.prime(88), Some(100));
        let lens = window.slots().map(|slot| slot.len).collect::<Vec<_>>();
        assert_eq!(lens, [8, 4, 0, 0]);
        assert_eq!(window.view(0), &pattern(100)[88..]);
        assert_supply_invariant(&window);

        // re-priming clears the previous end of stream
        assert_eq!(window.prime(0), None);
        assert_eq!(window.end_of_stream(), None);
        Ok(())
    }

    #[test]
    fn shift_moves_lookahead_down() -> Result<()> {
        let source = CountingSource::new(SliceSource::new(pattern(44)));
        let mut window = ChunkWindow::new(source, small_config())?;

        window.prime(0);
        assert_eq!(window.source().stats().reads, 4);

        // slots 2 and 3 become 0 and 1, 12 bytes remain for the tail
        assert_eq!(window.shift(), Some(44));
        assert_eq!(window.window_start(), 16);
        let lens = window.slots().map(|slot| slot.len).collect::<Vec<_>>();
        assert_eq!(lens, [8, 8, 8, 4]);
        assert_eq!(window.view(0), &pattern(44)[16..]);
        assert_eq!(window.slot(3).offset, 24);
        assert_supply_invariant(&window);

        // no more reads once the end is known
        assert_eq!(window.shift(), Some(44));
        assert_eq!(window.window_start(), 16);
        assert_eq!(window.source().stats().reads, 6);
        Ok(())
    }

    #[test]
    fn requests_never_exceed_capacity() -> Result<()> {
        let source = CountingSource::new(SliceSource::new(pattern(1000)));
        let mut window = ChunkWindow::new(source, small_config())?;

        window.prime(500);
        let stats = window.source().stats();
        assert_eq!(stats.bytes_requested, 32);
        assert!(window.view(0).len() <= window.config().capacity());
        Ok(())
    }

    #[test]
    fn source_error_ends_stream() -> Result<()> {
        struct Failing;

        impl DataSource for Failing {
            fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
                if offset == 0 {
                    buf.fill(1);
                    Ok(buf.len())
                } else {
                    Err(io::Error::other("disk gone"))
                }
            }
        }

        let mut window = ChunkWindow::new(Failing, small_config())?;
        assert_eq!(window.prime(0), Some(8));
        assert_eq!(window.valid_len(), 8);
        Ok(())
    }
}
