//! Profile-driven media transcoding: one inbox object in, a configured set of
//! resized and replica variants out, an optional completion event once every
//! variant is durable.

pub mod codec;
pub mod config;
pub mod media;
pub mod profile;
pub mod reader;
pub mod scaler;
pub mod store;
pub mod writer;

pub use codec::{Codec, CodecError, ObjectCreated};
pub use profile::{Profile, Resolution};
