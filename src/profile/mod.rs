pub mod decoder;
pub mod structs;

pub use decoder::{decode, decode_render};
pub use structs::{
    round2, serialize_rounded, EpochSeconds, Flamebearer, FunctionSample, ProfileSnapshot, ProfileType, RenderResponse,
    TimeWindow,
};
