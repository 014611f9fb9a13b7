//! Token annotation engine.
//!
//! Turns a document's semantic token stream plus on-demand hover lookups into
//! a stable, de-duplicated, exclusion-filtered set of [`Annotation`]s, and
//! keeps that set correct as the document changes, as settings change, and as
//! the user resolves, mutes or excludes individual findings.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  legend/tokens/hover  ┌───────────────────┐
//! │ LanguageServices │◀─────────────────────│                   │
//! └──────────────────┘                       │                   │  show/update/dispose
//! ┌──────────────────┐  snapshot/active      │ AnnotationManager │────────────────────▶ CommentSurface
//! │    Workspace     │◀─────────────────────│  (per-document    │
//! └──────────────────┘                       │   registry and    │
//! ┌──────────────────┐  read/write           │   debounce timers)│
//! │  SettingsStore   │◀─────────────────────│                   │
//! └──────────────────┘                       └───────────────────┘
//! ```
//!
//! The manager owns the only shared mutable state: the document → annotation
//! registry and the document → pending rebuild registry. Host calls are the
//! suspension points; results of a build are applied only if the document's
//! registry entry still belongs to that build.

mod annotation;
mod build;
mod command;
mod config;
mod error;
mod host;
mod hover;
mod manager;
mod position;
mod settings;
mod tasks;

#[cfg(test)]
mod test_support;

pub use annotation::{Annotation, AnnotationHandle, AnnotationId, AnnotationTag, CommentView, ResolutionState, TokenIdentity};
pub use command::{Command, CommandOutcome};
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use host::{CommentSurface, DocumentKey, DocumentSnapshot, Host, LanguageServices, Workspace};
pub use hover::{HoverCache, hover_body, hover_fragments};
pub use manager::{AnnotationManager, DocumentState};
pub use position::{OffsetEncoding, lsp_position_to_char};
pub use settings::{ExclusionScope, LanguageSettings, SettingsScope, SettingsStore, TokenSettings};
pub use tasks::TaskClass;
