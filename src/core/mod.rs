// Core modules: cursor contract, row adapter, projections, encoding, and errors.
pub mod adapter;
pub mod cursor;
pub mod encode;
pub mod error;
pub mod memory;
pub mod normalize;
pub mod stream;
pub mod value;
