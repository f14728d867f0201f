//! Clients for the third-party services the portal hands work off to.

pub mod image_host;
pub mod mail;
