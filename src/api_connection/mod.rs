pub mod connection;
pub mod endpoints;
pub mod key_rotation;
