pub mod settlement;
pub mod signature;
