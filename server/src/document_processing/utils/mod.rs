pub mod file_utils;

pub use file_utils::{ensure_dir_exists, file_stem, find_files_by_extension, safe_component, sanitize_name};
