//! Differential tile-hash diffing, codec selection, and the AVC/NonAVC refresh-interval
//! state machine that together decide how each captured frame is compressed.

mod codec;
mod engine;
mod error;
mod state;
mod tile;

pub use codec::{select_codec, ClientCodecSupport, Codec, CodecClass, CodecMode};
pub use engine::{AvcEncoder, EncodedFrame, EncodingEngine, ProgressiveEncoder, RemoteFxEncoder};
pub use error::{EncodeError, Result};
pub use state::{EncodingOptions, EncodingState, RefreshTracker};
pub use tile::{DiffResult, DirtyRect, TileHashTable, TILE_SIZE};
