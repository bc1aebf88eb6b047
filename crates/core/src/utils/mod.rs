pub mod numeric;
pub mod time;

pub use numeric::*;
pub use time::*;
