pub mod domain;
pub mod error;
pub mod extract;
pub mod hydrate;
pub mod normalize;
pub mod report;
pub mod timeline;
pub mod validate;
