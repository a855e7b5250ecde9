//! The embedding runtime the code generator targets: host AST, versioned
//! bytecode artifacts, and a tree-walking interpreter.

pub mod ast;
pub mod code;
pub mod interp;

pub use ast::HostModule;
pub use code::{CodeDecodeError, CodeObject, CODE_MAGIC, CODE_VERSION};
pub use interp::{Interp, Namespace, RuntimeError, Value};
