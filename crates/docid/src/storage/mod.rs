pub mod filesystem;
pub mod locator;

pub use filesystem::{ensure_directory, safe_file_name, unique_path, FileMover, Renamer};
pub use locator::FileLocator;
