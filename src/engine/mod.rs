//! The scan engine: full scans (C9), filtered narrowing scans (C10), and
//! the parallel scheduler that fans a full scan out across regions (C11).

mod full_scan;
mod filter_scan;
mod scheduler;

pub use filter_scan::filter_scan;
pub use full_scan::full_scan_serial;
pub use scheduler::full_scan;
