pub mod change;
pub mod diff;
pub mod report;
