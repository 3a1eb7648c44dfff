// Hall sensor side of the position interface
// Pattern table, pattern driver, warm-up gate and signal simulator

pub mod interval;
pub mod pattern;
pub mod pattern_driver;
pub mod simulator;
pub mod warm_up;

// Re-export main types for easier access
pub use interval::IntervalAccumulator;
pub use pattern::{HallCode, HallLine, HallPattern, HALL_PATTERN_TABLE, HALL_SEQUENCE};
pub use pattern_driver::PatternDriver;
pub use simulator::{HallSimulator, SimulatorStep};
pub use warm_up::WarmUp;
