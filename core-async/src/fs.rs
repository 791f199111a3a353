//! Async filesystem helpers backed by `tokio::fs`.

pub use tokio::fs::{
    copy, create_dir_all, metadata, read, read_dir, remove_file, try_exists, write, File,
};
