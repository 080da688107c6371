//! Poster image uploads.
//!
//! [`ImageGateway`] turns a local file into a public URL through an
//! [`ImageHost`]; [`CloudinaryHost`] is the hosted implementation.

mod host;
mod service;

pub use host::{secure_url, sign, CloudinaryHost, ImageHost, UploadedImage};
pub use service::{public_id_for, ImageGateway, FALLBACK_PUBLIC_ID};
