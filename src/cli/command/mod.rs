pub mod download;
pub mod precip;
pub mod schema;
pub mod subset;

use std::path::PathBuf;

use chrono::{Datelike, Local};
pub use download::download;
pub use precip::precip;
pub use schema::schema;
pub use subset::subset;

/// Dated output file in the home directory, or the working directory when
/// there is no home.
pub fn make_output_file_name(kind: &str, extension: &str) -> PathBuf {
    let today = Local::now();
    let file_name = format!(
        "watershed-{}-{}-{:02}-{:02}.{}",
        kind,
        today.year(),
        today.month(),
        today.day(),
        extension
    );

    dirs::home_dir().unwrap_or_default().join(file_name)
}

// -- Tests -------------------------------------------------------------------
