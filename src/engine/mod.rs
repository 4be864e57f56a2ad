// Engine module - tempo state and the lookahead click scheduler

mod timing;

pub use timing::{
    AccentPattern, BeatCallback, ScheduleWindow, TimeSignature, TimingEngine, CLICK_LENGTH_SECS,
    MAX_TEMPO_BPM, MIN_TEMPO_BPM,
};
