pub mod cache;
pub mod import;
pub mod rest;
pub mod sqlite;
