pub mod coupon;
pub mod course;
pub mod enrollment;
pub mod error;
pub mod id;
pub mod money;
pub mod payment;
pub mod pricing;
pub mod store;
pub mod webhook;
