//! 回复层：表格解码与回复解释

pub mod interpreter;
pub mod table;

pub use interpreter::{server_error_text, transport_error_text, with_latency, ResponseInterpreter};
pub use table::{Scalar, TabularData};
