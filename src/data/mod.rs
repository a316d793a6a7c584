//! Data module
//!
//! Sample matrices, CSV ingestion, feature scaling and synthetic data.

mod io;
mod preprocessing;
mod synthetic;
mod types;

pub use io::{load_csv, save_csv, save_labels};
pub use preprocessing::{min_max_scale, MinMaxScaler};
pub use synthetic::{make_blobs, three_blobs, DEMO_CENTERS};
pub use types::DataMatrix;
