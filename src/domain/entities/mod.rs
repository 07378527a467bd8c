pub mod product;
pub mod reference;
pub mod sort;
pub mod stock;
