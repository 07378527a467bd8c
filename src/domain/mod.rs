pub mod entities;
pub mod pricing;
pub mod schema;
