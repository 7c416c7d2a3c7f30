pub mod device;
pub mod job;
pub mod outcome;
pub mod package;
pub mod version;
