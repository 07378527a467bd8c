pub mod cache;
pub mod codec;
pub mod store;
