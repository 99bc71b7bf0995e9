mod console;
mod export;
mod sink;

pub use console::ConsoleReporter;
pub use export::{JsonExporter, ScanReport};
pub use sink::{FindingsSink, Observer};
