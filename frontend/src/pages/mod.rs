pub mod home;
pub mod timeline;
