pub mod file_utils;

pub use file_utils::{make_dirs, rename_with_fallback};

#[cfg(test)]
#[path = "tests/file_utils_tests.rs"]
mod file_utils_tests;
