pub mod sensor;
pub mod surf;
pub mod surfline;
pub mod weather;
