//! Adversarial identifier-rename attack for watermark robustness testing.
//!
//! Watermarks seeded on token context are sensitive to surface edits that
//! leave program behavior intact. This crate implements the canonical such
//! edit for code: renaming local identifiers. A [`Renamer`] picks a seeded,
//! ratio-controlled subset of a document's renamable identifiers and
//! rewrites them under one of three naming strategies, while the
//! [`tokenizer`] module's fail-closed classifier guarantees strings,
//! comments, keywords, builtins, imports, and declared names survive
//! untouched.
//!
//! Everything here is deterministic: the same input, strategy, ratio, and
//! seed always produce the same output, so attacked corpora are
//! reproducible across evaluation runs.

pub mod renamer;
pub mod tokenizer;

pub use renamer::{derived_output_path, RenameResult, Renamer};
pub use tokenizer::{tokenize, IdentifierIndex, Token, TokenKind};
