#[macro_export]
macro_rules! log_or_err {
    ($state:expr, $level:expr, $err:expr $(,)?) => {{
        if $level <= $state.fail_level {
            return Err($err);
        } else {
            match $level {
                ::log::Level::Error => ::log::error!("{}", $err),
                ::log::Level::Warn => ::log::warn!("{}", $err),
                ::log::Level::Info => ::log::info!("{}", $err),
                ::log::Level::Debug => ::log::debug!("{}", $err),
                ::log::Level::Trace => ::log::trace!("{}", $err),
            }
        }
    }};
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum StreamError {
    #[error("Output buffer holds {len} bytes, at least {required} are needed for one frame")]
    BufferTooSmall { len: usize, required: usize },

    #[error("Frame decoder made no progress at stream offset {position}")]
    Stalled { position: u64 },
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("slot_capacity must be non-zero")]
    ZeroSlotCapacity,

    #[error("lookback_slots must be at least 1")]
    NoLookbackSlots,

    #[error("lookahead_slots must be at least 1")]
    NoLookaheadSlots,

    #[error(
        "Lookahead of {lookahead} bytes cannot hold a maximum frame of {max_frame} bytes"
    )]
    LookaheadTooSmall { lookahead: usize, max_frame: usize },
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum HeaderError {
    #[error("Frame sync not found, read {0:#06X}")]
    NoSync(u16),

    #[error("MPEG version bits are reserved")]
    ReservedVersion,

    #[error("Layer bits are reserved")]
    ReservedLayer,

    #[error("bitrate_index must not be 15")]
    BadBitrate,

    #[error("Free format bitrate is not supported")]
    FreeFormat,

    #[error("sampling_frequency index must not be 3")]
    BadSampleRate,

    #[error("Header needs 4 bytes, got {0}")]
    Truncated(usize),
}
