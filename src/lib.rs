pub mod blacklist;
pub mod catalog;
pub mod checksum;
pub mod config;
pub mod convert;
pub mod error;
pub mod fs_util;
pub mod granule;
pub mod merge;
pub mod output;
pub mod pipeline;
pub mod staleness;
pub mod tools;
