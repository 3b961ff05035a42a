pub mod error;
pub mod options;
pub mod tpl;
pub mod value;

pub use error::{Result, TemplateError};
pub use options::{Delimiters, EngineOptions};
pub use tpl::engine::{Engine, Template, compile};
pub use value::{Value, to_value};
