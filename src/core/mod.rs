// Core modules implementing item validation, normalization, and error modeling.
pub mod collection;
pub mod date;
pub mod error;
pub(crate) mod fields;
pub mod geolocation;
pub mod item;
pub mod tabular;
pub mod text;
