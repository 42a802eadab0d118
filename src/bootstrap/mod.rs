//! Process bootstrap: things that run once before the broker loads.

pub mod logger;
