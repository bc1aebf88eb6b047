pub mod account;
pub mod market;
pub mod operation;
pub mod order;
pub mod venue;

pub use account::*;
pub use market::*;
pub use operation::*;
pub use order::*;
pub use venue::*;
