pub mod credentials;
pub mod providers;
