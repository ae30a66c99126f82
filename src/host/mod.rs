//! Hosts that render the widget and feed it user actions

mod console;

pub use console::ConsoleHost;
