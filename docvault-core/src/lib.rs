pub mod auth;
pub mod blob;
pub mod error;
pub mod events;
pub mod permissions;
pub mod revisions;
pub mod service;
pub mod storage;
pub mod tree;
