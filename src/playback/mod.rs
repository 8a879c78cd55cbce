// Playback - clock abstraction, sound collaborators and the two engines

pub mod clock;
pub mod driver;
pub mod live;
pub mod sink;

pub use clock::{AudioClock, Fired, ManualClock, TimerHandle};
pub use driver::{DriverTick, TrainingDriver, layout_step};
pub use live::{LiveEngine, LiveTick, START_LATENCY};
pub use sink::{NullSink, SamplePlayer, StepLog, TriggerLog, VisualizationSink};
