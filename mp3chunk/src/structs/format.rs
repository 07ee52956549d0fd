use crate::structs::header::FrameHeader;

/// Output bit depth of every PCM sample produced by the stream.
pub const BITS_PER_SAMPLE: u32 = 16;

/// Stream characteristics reported by the most recent decoded frame.
///
/// Values are zero until a frame has been seen. Consumers should go through
/// [`StreamFormat::channels`], which never reports fewer than one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub channel_count: u16,
    pub bitrate_kbps: u32,
}

impl StreamFormat {
    pub fn channels(&self) -> u16 {
        self.channel_count.max(1)
    }

    pub fn bits_per_sample(&self) -> u32 {
        BITS_PER_SAMPLE
    }

    /// Bytes occupied by `samples` per-channel samples of interleaved PCM.
    pub fn bytes_for_samples(&self, samples: usize) -> usize {
        samples * self.channels() as usize * (BITS_PER_SAMPLE / 8) as usize
    }
}

impl From<&FrameHeader> for StreamFormat {
    fn from(header: &FrameHeader) -> Self {
        Self {
            sample_rate: header.sample_rate,
            channel_count: header.channels(),
            bitrate_kbps: header.bitrate_kbps,
        }
    }
}

#[test]
fn channel_floor() {
    let format = StreamFormat::default();
    assert_eq!(format.channel_count, 0);
    assert_eq!(format.channels(), 1);
    assert_eq!(format.bytes_for_samples(1152), 2304);

    let stereo = StreamFormat {
        sample_rate: 44100,
        channel_count: 2,
        bitrate_kbps: 192,
    };
    assert_eq!(stereo.bytes_for_samples(1152), 4608);
    assert_eq!(stereo.bits_per_sample(), 16);
}
