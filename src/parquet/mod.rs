//! Handles serialising and saving data to disk in the _parquet_ file format.

pub mod monthly;

pub use monthly::save_monthly;
