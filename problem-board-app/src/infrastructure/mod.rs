pub mod integrity;
pub mod security;
pub mod store;
