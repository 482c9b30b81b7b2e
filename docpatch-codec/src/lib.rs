//! # docpatch-codec
//!
//! Deterministic text encodings of documents.
//!
//! - [`encode`] — canonical and relaxed extended JSON; the canonical compact
//!   form is what checksums are computed over
//! - [`shell`] — console constructor syntax for emitted commands
//! - [`decode`] — extended-JSON parser (canonical and relaxed)
//! - [`dump`] — editable dump files in array or line shape
//!
//! ## Usage
//!
//! ```rust
//! use docpatch_codec::{encode_document, EncodeOptions};
//! use docpatch_core::Document;
//!
//! let a = Document::new().with("_id", "1").with("b", 2).with("a", 1);
//! let b = Document::new().with("a", 1).with("b", 2).with("_id", "1");
//! let opts = EncodeOptions::canonical_compact();
//! assert_eq!(encode_document(&a, &opts).unwrap(), encode_document(&b, &opts).unwrap());
//! ```

pub mod decode;
pub mod dump;
pub mod encode;
pub mod error;
pub mod shell;

pub use decode::{document_from_json, from_json_str, value_from_json};
pub use dump::{read_dump, write_dump, DumpFormat};
pub use encode::{encode, encode_document, to_extended_json, EncodeOptions, MAX_DEPTH};
pub use error::{DecodeError, EncodeError};
pub use shell::{render_document, render_value};
