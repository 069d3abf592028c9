//! Application wiring: options, settings, state and the run loop

pub mod options;
pub mod run;
pub mod settings;
pub mod state;
