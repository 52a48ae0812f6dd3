pub mod allocation_service;
pub mod auth_service;
pub mod export_service;
