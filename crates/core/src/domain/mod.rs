pub mod bundle;
pub mod cart;
pub mod product;
pub mod selection;
