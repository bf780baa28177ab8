pub mod message;
pub mod participant;
pub mod pricing;
pub mod product;
