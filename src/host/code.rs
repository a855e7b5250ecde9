//! The bytecode artifact: a versioned byte encoding of a compiled module.
//!
//! Artifacts are opaque to everything but this module and the interpreter.
//! The magic/version header makes cache corruption and stale-format entries
//! detectable; the cache treats any decode failure as a miss.

use serde::{Deserialize, Serialize};

use super::ast::HostModule;

pub const CODE_MAGIC: &[u8; 4] = b"JBC\0";
/// Bumped whenever the host AST encoding changes shape.
pub const CODE_VERSION: u32 = 1;

/// A compiled host module ready for execution or caching.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CodeObject {
    pub module: HostModule,
    pub filename: String,
}

#[derive(Debug)]
pub enum CodeDecodeError {
    BadMagic,
    VersionMismatch { found: u32, expected: u32 },
    Truncated,
    Payload(String),
}

impl std::fmt::Display for CodeDecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodeDecodeError::BadMagic => write!(f, "not a bytecode artifact"),
            CodeDecodeError::VersionMismatch { found, expected } => {
                write!(f, "bytecode version {found}, expected {expected}")
            }
            CodeDecodeError::Truncated => write!(f, "truncated bytecode artifact"),
            CodeDecodeError::Payload(msg) => write!(f, "corrupt bytecode payload: {msg}"),
        }
    }
}

impl std::error::Error for CodeDecodeError {}

impl CodeObject {
    pub fn new(module: HostModule, filename: impl Into<String>) -> Self {
        CodeObject {
            module,
            filename: filename.into(),
        }
    }

    /// Encode to the opaque artifact bytes. Reproducible for a given
    /// module: the payload is a deterministic serialization.
    pub fn to_bytes(&self) -> Vec<u8> {
        let payload = bincode::serialize(self).expect("host AST is always serializable");
        let mut out = Vec::with_capacity(payload.len() + 8);
        out.extend_from_slice(CODE_MAGIC);
        out.extend_from_slice(&CODE_VERSION.to_le_bytes());
        out.extend_from_slice(&payload);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodeDecodeError> {
        if bytes.len() < 8 {
            return Err(CodeDecodeError::Truncated);
        }
        if &bytes[..4] != CODE_MAGIC {
            return Err(CodeDecodeError::BadMagic);
        }
        let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if version != CODE_VERSION {
            return Err(CodeDecodeError::VersionMismatch {
                found: version,
                expected: CODE_VERSION,
            });
        }
        bincode::deserialize(&bytes[8..]).map_err(|e| CodeDecodeError::Payload(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ast::{HostExpr, HostStmt};

    fn sample() -> CodeObject {
        CodeObject::new(
            HostModule {
                name: "m".into(),
                doc: None,
                body: vec![HostStmt::Assign {
                    targets: vec![HostExpr::Name("x".into())],
                    value: HostExpr::Int(42),
                    jac: None,
                }],
            },
            "m.jac",
        )
    }

    #[test]
    fn round_trips() {
        let code = sample();
        let bytes = code.to_bytes();
        let back = CodeObject::from_bytes(&bytes).unwrap();
        assert_eq!(back, code);
    }

    #[test]
    fn encoding_is_reproducible() {
        assert_eq!(sample().to_bytes(), sample().to_bytes());
    }

    #[test]
    fn bad_magic_rejected() {
        let mut bytes = sample().to_bytes();
        bytes[0] = b'X';
        assert!(matches!(
            CodeObject::from_bytes(&bytes),
            Err(CodeDecodeError::BadMagic)
        ));
    }

    #[test]
    fn version_mismatch_rejected() {
        let mut bytes = sample().to_bytes();
        bytes[4] = 99;
        assert!(matches!(
            CodeObject::from_bytes(&bytes),
            Err(CodeDecodeError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn truncated_rejected() {
        assert!(matches!(
            CodeObject::from_bytes(&[1, 2, 3]),
            Err(CodeDecodeError::Truncated)
        ));
        let bytes = sample().to_bytes();
        assert!(CodeObject::from_bytes(&bytes[..10]).is_err());
    }
}
