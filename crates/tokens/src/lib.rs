//! Pure building blocks for turning a semantic token stream into annotation
//! candidates.
//!
//! The pipeline is strictly one-way:
//!
//! ```text
//! u32 stream ──▶ decode ──▶ merge_adjacent ──▶ canonicalize ──▶ exclusion filter
//! ```
//!
//! - [`decode`]: reconstructs absolute, ordered ranges per targeted token type.
//! - [`merge`]: coalesces ranges that touch exactly at a boundary.
//! - [`canonical`]: maps raw token text to the identity string used for
//!   grouping, caching and exclusion.
//! - [`exclusion`]: exact and prefix-wildcard suppression rules, plus the
//!   candidate rules offered when a user excludes a token.
//!
//! Nothing here performs I/O; the async orchestration lives in
//! `codespex-engine`.

pub mod canonical;
pub mod decode;
pub mod exclusion;
pub mod merge;

pub use canonical::{CanonicalRule, Canonicalizer, first_line};
pub use decode::{DecodeStrategy, DecodedTokens, RawToken, RawTokens, TargetTypes, TokenRanges, TokenTypeId, decode, decode_with};
pub use exclusion::{ExclusionRule, ExclusionSet, exclusion_candidates};
pub use lsp_types;
pub use merge::merge_adjacent;
