pub mod allocation;
pub mod bucket;
pub mod code;
pub mod profile;
pub mod session;
