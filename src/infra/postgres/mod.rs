pub mod settlement_store;
