pub mod registry;
pub mod validator;

pub use registry::SchemaRegistry;
pub use validator::{SchemaValidator, ValidationError, ValidationResult};
