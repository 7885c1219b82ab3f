pub mod adoption;
pub mod change_bus;
pub mod color;
pub mod command;
pub mod context;
pub mod engine;
pub mod hotkey;
pub mod locator;
pub mod logging;
pub mod panel;
pub mod pointer;
pub mod prefs;
pub mod scheduler;
pub mod settings;
pub mod storage;
pub mod timer;
pub mod visibility;

pub use engine::{CaretEngine, EngineDeps, VERSION};
