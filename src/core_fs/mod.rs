pub mod adapter;

pub use adapter::{FileAdapter, NativeFileAdapter};
