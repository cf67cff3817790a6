pub mod describe;
pub mod event;
pub mod event_list;

pub use describe::{TimingDescription, Verbosity};
pub use event::{beat_length_ms, MusicEvent, TIMING_THRESHOLD_MS};
pub use event_list::{EventList, GradingInfo};
