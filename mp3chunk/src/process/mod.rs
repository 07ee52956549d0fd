/// Random-access byte providers.
///
/// Defines the [`DataSource`](source::DataSource) trait and in-memory,
/// reader-backed and counting implementations.
pub mod source;

/// Frame decoder contract.
///
/// Provides the [`FrameDecoder`](frame::FrameDecoder) trait the stream
/// adapter drives one frame at a time.
pub mod frame;

/// Fixed-capacity sliding window over a data source.
///
/// Provides the [`ChunkWindow`](window::ChunkWindow) and its
/// [`WindowConfig`](window::WindowConfig).
pub mod window;

/// Stream adapter turning a window and a frame decoder into PCM bursts.
///
/// Provides the [`StreamDecoder`](stream::StreamDecoder).
pub mod stream;

/// Frame decoder over minimp3.
#[cfg(feature = "minimp3")]
pub mod minimp3;
