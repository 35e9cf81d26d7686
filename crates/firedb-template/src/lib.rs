//! firedb-template - Handlebars templates rendered into page regions.
//!
//! A [`Template`] fetches its text from a [`TemplateSource`] and renders JSON
//! object data into one named region of a [`Page`].

pub mod error;
pub mod page;
pub mod source;
pub mod template;

pub use error::{Result, TemplateError};
pub use page::Page;
pub use source::{DefaultSource, FileSource, HttpSource, TemplateSource};
pub use template::Template;
