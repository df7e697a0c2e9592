pub mod stock;
pub mod financial;
pub mod row;

pub use stock::*;
pub use financial::*;
pub use row::*;
