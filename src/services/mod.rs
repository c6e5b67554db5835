pub mod config;
pub mod export;
pub mod filter;
pub mod fs_utils;
pub mod host;
pub mod layer_tree;
pub mod naming;
pub mod overwrite;
