pub mod context;
pub mod counter;
pub mod engine;
pub mod pool;
pub mod providers;
pub mod registry;
pub mod unique;
pub mod value;
