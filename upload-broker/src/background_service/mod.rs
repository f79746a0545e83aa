mod sweep_runner;

pub use sweep_runner::SweepRunner;
