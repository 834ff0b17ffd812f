pub mod capabilities;
pub mod device;
pub mod puller;
pub mod runner;
pub mod signal;
