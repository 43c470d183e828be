pub mod actor;

pub use actor::{HistoryActor, HistoryAsk, HistoryError, HistoryHandle, HistoryStats, HistoryTell};
