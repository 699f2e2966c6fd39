//! The identifier rename attack.
//!
//! Renames a seeded, ratio-sized subset of a document's renamable
//! identifiers according to a [`RenameStrategy`]. The attack only ever
//! touches identifier occurrences the classifier marked safe: strings,
//! comments, attribute accesses, and preserved names pass through
//! byte-for-byte. The same `(strategy, ratio, seed)` triple on the same
//! input always yields the same output.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use codemark_core::{CodemarkError, RenameStrategy, Result};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use regex::Regex;
use tracing::debug;

use crate::tokenizer::{is_attribute_access, tokenize, IdentifierIndex, Token, TokenKind};

/// Length of the random part of generated names.
const RANDOM_NAME_LEN: usize = 8;
const OBFUSCATE_TAG_LEN: usize = 6;

/// Outcome of one rename pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameResult {
    /// The rewritten source.
    pub code: String,
    /// Old name → new name, for every identifier actually renamed.
    pub mapping: HashMap<String, String>,
}

/// Deterministic identifier renamer.
///
/// `ratio` selects what fraction of the renamable identifiers to rewrite;
/// `seed` fixes both the subset choice and any generated random names.
pub struct Renamer {
    strategy: RenameStrategy,
    ratio: f64,
    seed: u64,
    word_re: Regex,
}

impl Renamer {
    /// Build a renamer. Rejects ratios outside `[0, 1]`.
    pub fn new(strategy: RenameStrategy, ratio: f64, seed: u64) -> Result<Self> {
        if !(0.0..=1.0).contains(&ratio) || ratio.is_nan() {
            return Err(CodemarkError::Config(format!(
                "rename ratio must be in [0, 1], got {ratio}"
            )));
        }
        let word_re = Regex::new(r"[A-Za-z_][A-Za-z0-9_]*")
            .map_err(|e| CodemarkError::Attack(e.to_string()))?;
        Ok(Self {
            strategy,
            ratio,
            seed,
            word_re,
        })
    }

    /// Rename identifiers in `source`.
    ///
    /// When `protected_prefix` is given, every identifier-shaped word in it
    /// is treated as preserved, and the prefix itself is restored verbatim
    /// in the output (generation may have reflowed its whitespace).
    pub fn rename(&self, source: &str, protected_prefix: Option<&str>) -> Result<RenameResult> {
        // Ratio zero is an exact no-op, byte for byte.
        if self.ratio == 0.0 {
            return Ok(RenameResult {
                code: source.to_string(),
                mapping: HashMap::new(),
            });
        }

        let tokens = tokenize(source);
        let mut index = IdentifierIndex::build(source, &tokens);
        if let Some(prefix) = protected_prefix {
            index.preserve_names(
                self.word_re
                    .find_iter(prefix)
                    .map(|m| m.as_str().to_string()),
            );
        }

        let selected = self.select_targets(index.renamable());
        let mapping = self.build_mapping(&selected, &index)?;
        let mut code = substitute(source, &tokens, &mapping);

        if let Some(prefix) = protected_prefix {
            code = restore_prefix(&code, prefix);
        }

        debug!(
            strategy = %self.strategy,
            ratio = self.ratio,
            renamable = index.renamable().len(),
            renamed = mapping.len(),
            "rename pass complete"
        );
        Ok(RenameResult { code, mapping })
    }

    /// Pick `round(ratio * n)` names. The shuffle decides *which* names are
    /// taken; the result is put back into first-occurrence order so that
    /// sequential numbering follows document order.
    fn select_targets(&self, renamable: &[String]) -> Vec<String> {
        let count = ((self.ratio * renamable.len() as f64).round() as usize).min(renamable.len());
        let mut indices: Vec<usize> = (0..renamable.len()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        indices.shuffle(&mut rng);
        let mut chosen: Vec<usize> = indices.into_iter().take(count).collect();
        chosen.sort_unstable();
        chosen.into_iter().map(|i| renamable[i].clone()).collect()
    }

    /// Generate an injective old → new mapping for the selected names. New
    /// names never collide with any word in the document, any preserved
    /// name, or each other.
    fn build_mapping(
        &self,
        selected: &[String],
        index: &IdentifierIndex,
    ) -> Result<HashMap<String, String>> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(1));
        let mut taken: HashSet<String> = selected.iter().cloned().collect();
        let mut mapping = HashMap::with_capacity(selected.len());

        for (position, old) in selected.iter().enumerate() {
            let new = self.fresh_name(position + 1, index, &taken, &mut rng)?;
            taken.insert(new.clone());
            mapping.insert(old.clone(), new);
        }
        Ok(mapping)
    }

    fn fresh_name(
        &self,
        ordinal: usize,
        index: &IdentifierIndex,
        taken: &HashSet<String>,
        rng: &mut ChaCha8Rng,
    ) -> Result<String> {
        // The ordinal makes sequential/obfuscate names unique by
        // construction; random names retry on collision.
        for attempt in 0..1000 {
            let candidate = match self.strategy {
                RenameStrategy::Random => random_lowercase(rng, RANDOM_NAME_LEN),
                RenameStrategy::Sequential => {
                    if attempt == 0 {
                        format!("var_{ordinal}")
                    } else {
                        format!("var_{ordinal}_{attempt}")
                    }
                }
                RenameStrategy::Obfuscate => {
                    format!("_{}_{ordinal}", random_lowercase(rng, OBFUSCATE_TAG_LEN))
                }
            };
            if !taken.contains(&candidate)
                && !index.contains_name(&candidate)
                && !index.is_preserved(&candidate)
            {
                return Ok(candidate);
            }
        }
        Err(CodemarkError::Attack(
            "could not generate a collision-free replacement name".to_string(),
        ))
    }
}

fn random_lowercase(rng: &mut ChaCha8Rng, len: usize) -> String {
    (0..len)
        .map(|_| char::from(b'a' + rng.gen_range(0..26)))
        .collect()
}

/// Rebuild the source, swapping mapped identifier occurrences and copying
/// everything else through untouched. Attribute accesses keep their
/// original name even when the bare name is being renamed.
fn substitute(source: &str, tokens: &[Token], mapping: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(source.len());
    for (i, token) in tokens.iter().enumerate() {
        let text = token.text(source);
        if token.kind == TokenKind::Word && !is_attribute_access(source, tokens, i) {
            if let Some(new) = mapping.get(text) {
                out.push_str(new);
                continue;
            }
        }
        out.push_str(text);
    }
    out
}

/// Restore a protected prefix at the head of `code`.
///
/// The match is whitespace-insensitive: generation may have reflowed
/// spacing, but the prefix's non-whitespace characters must appear first
/// and in order. On a match the covered span is replaced with the prefix
/// verbatim; otherwise the code is returned unchanged.
fn restore_prefix(code: &str, prefix: &str) -> String {
    let want: Vec<char> = prefix.chars().filter(|c| !c.is_whitespace()).collect();
    if want.is_empty() {
        return code.to_string();
    }

    let mut matched = 0usize;
    for (offset, c) in code.char_indices() {
        if c.is_whitespace() {
            continue;
        }
        if c != want[matched] {
            return code.to_string();
        }
        matched += 1;
        if matched == want.len() {
            let rest = &code[offset + c.len_utf8()..];
            return format!("{prefix}{rest}");
        }
    }
    code.to_string()
}

/// Derive the conventional output path for an attacked file:
/// `<stem>_renamed_<strategy>_<ratio*100>.<ext>`.
#[must_use]
pub fn derived_output_path(input: &Path, strategy: RenameStrategy, ratio: f64) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "output".to_string(), |s| s.to_string_lossy().into_owned());
    let percent = (ratio * 100.0).round() as i64;
    let name = match input.extension() {
        Some(ext) => format!("{stem}_renamed_{strategy}_{percent}.{}", ext.to_string_lossy()),
        None => format!("{stem}_renamed_{strategy}_{percent}"),
    };
    input.with_file_name(name)
}
