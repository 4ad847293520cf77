#![allow(warnings)]
#![cfg_attr(feature = "nightly", feature(backtrace))]

pub(crate) mod deps {
    pub use derive_more;
    pub use lazy_static;
    pub use libc;
    pub use log;
    pub use regex;
    pub use serde;
    pub use thiserror;
}

mod fmt;

pub mod classifier;
pub mod collector;
pub mod config;
pub mod endian;
pub mod engine;
pub mod error;
pub mod flags;
pub mod liveness;
pub mod maps;
pub mod paths;
pub mod procmem;
pub mod region;
pub mod routines;
pub mod scan_type;
pub mod session;
pub mod store;
pub mod value;
pub mod writer;

pub use classifier::{
    RegionClassifier,
    RegionFilter,
};
pub use collector::MatchEntry;
pub use config::{
    RegionFilterConfig,
    RegionFilterMode,
    RegionLevel,
    ScanOptions,
};
pub use error::{
    Error,
    Result,
};
pub use endian::Endianness;
pub use liveness::ProcessLiveness;
pub use region::{
    Region,
    RegionType,
    ScanLevel,
};
pub use scan_type::{
    ScanDataType,
    ScanMatchType,
};
pub use session::ScannerSession;
pub use value::{
    OldValue,
    UserValue,
};
pub use writer::WriteReport;
