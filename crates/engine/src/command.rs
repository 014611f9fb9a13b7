//! Host-bindable commands.
//!
//! Every UI entry point (command palette, comment thread menu, title bar
//! toggle) converts its request into a [`Command`] before dispatch via
//! [`AnnotationManager::execute`].

use tracing::{debug, warn};

use crate::annotation::AnnotationHandle;
use crate::manager::AnnotationManager;
use crate::settings::ExclusionScope;
use crate::{Error, Result};

/// A user-invoked engine operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
	/// Remove every annotation of the active document.
	DismissAllOnActive,
	Mute(AnnotationHandle),
	Resolve(AnnotationHandle),
	Unresolve(AnnotationHandle),
	/// Resolve every annotation in the same document with the same identity.
	ResolveToken(AnnotationHandle),
	/// Resolve every annotation in every tracked document with the same identity.
	ResolveTokenEverywhere(AnnotationHandle),
	Exclude {
		target: AnnotationHandle,
		scope: ExclusionScope,
	},
	ToggleCommenting,
}

impl Command {
	pub const DISMISS_ALL_ON_ACTIVE: &'static str = "codeSpex.dismissAllOnActive";
	pub const MUTE_THREAD: &'static str = "codeSpex.muteThread";
	pub const RESOLVE_THREAD: &'static str = "codeSpex.resolveThread";
	pub const UNRESOLVE_THREAD: &'static str = "codeSpex.unresolveThread";
	pub const RESOLVE_TOKEN: &'static str = "codeSpex.resolveToken";
	pub const RESOLVE_TOKEN_EVERYWHERE: &'static str = "codeSpex.resolveTokenEverywhere";
	pub const EXCLUDE_TOKEN: &'static str = "codeSpex.excludeToken";
	pub const EXCLUDE_TOKEN_GLOBAL: &'static str = "codeSpex.excludeToken.global";
	pub const TOGGLE_COMMENTING: &'static str = "codeSpex.toggleCommenting";

	/// Every command id, for host registration.
	pub const IDS: [&'static str; 9] = [
		Self::DISMISS_ALL_ON_ACTIVE,
		Self::MUTE_THREAD,
		Self::RESOLVE_THREAD,
		Self::UNRESOLVE_THREAD,
		Self::RESOLVE_TOKEN,
		Self::RESOLVE_TOKEN_EVERYWHERE,
		Self::EXCLUDE_TOKEN,
		Self::EXCLUDE_TOKEN_GLOBAL,
		Self::TOGGLE_COMMENTING,
	];

	/// Builds a command from a host command id and the annotation the UI
	/// action was invoked on, if any.
	pub fn parse(id: &str, target: Option<AnnotationHandle>) -> Result<Self> {
		let id = Self::IDS
			.into_iter()
			.find(|known| *known == id)
			.ok_or_else(|| Error::UnknownCommand(id.to_owned()))?;
		match id {
			Self::DISMISS_ALL_ON_ACTIVE => return Ok(Self::DismissAllOnActive),
			Self::TOGGLE_COMMENTING => return Ok(Self::ToggleCommenting),
			_ => {}
		}

		let target = target.ok_or(Error::MissingTarget(id))?;
		Ok(match id {
			Self::MUTE_THREAD => Self::Mute(target),
			Self::RESOLVE_THREAD => Self::Resolve(target),
			Self::UNRESOLVE_THREAD => Self::Unresolve(target),
			Self::RESOLVE_TOKEN => Self::ResolveToken(target),
			Self::RESOLVE_TOKEN_EVERYWHERE => Self::ResolveTokenEverywhere(target),
			Self::EXCLUDE_TOKEN => Self::Exclude {
				target,
				scope: ExclusionScope::Local,
			},
			_ => Self::Exclude {
				target,
				scope: ExclusionScope::Global,
			},
		})
	}

	pub const fn id(&self) -> &'static str {
		match self {
			Self::DismissAllOnActive => Self::DISMISS_ALL_ON_ACTIVE,
			Self::Mute(_) => Self::MUTE_THREAD,
			Self::Resolve(_) => Self::RESOLVE_THREAD,
			Self::Unresolve(_) => Self::UNRESOLVE_THREAD,
			Self::ResolveToken(_) => Self::RESOLVE_TOKEN,
			Self::ResolveTokenEverywhere(_) => Self::RESOLVE_TOKEN_EVERYWHERE,
			Self::Exclude {
				scope: ExclusionScope::Local,
				..
			} => Self::EXCLUDE_TOKEN,
			Self::Exclude {
				scope: ExclusionScope::Global,
				..
			} => Self::EXCLUDE_TOKEN_GLOBAL,
			Self::ToggleCommenting => Self::TOGGLE_COMMENTING,
		}
	}
}

/// Result of executing a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
	/// Number of annotations whose state or presence changed.
	Changed(usize),
	/// An exclusion rule was persisted.
	Excluded(String),
	CommentingVisible(bool),
	/// The command had nothing to act on, or the user dismissed a prompt.
	Unchanged,
}

impl AnnotationManager {
	/// Dispatches one command.
	///
	/// Failures are logged and returned; exclusion persistence failures are
	/// additionally reported on the host surface.
	pub async fn execute(&self, command: Command) -> Result<CommandOutcome> {
		let id = command.id();
		debug!(command = id, "command.execute");
		let result = match command {
			Command::DismissAllOnActive => Ok(changed(self.dismiss_active())),
			Command::Mute(target) => self.mute(&target).map(|()| CommandOutcome::Changed(1)),
			Command::Resolve(target) => self.resolve(&target).map(|resolved| if resolved { CommandOutcome::Changed(1) } else { CommandOutcome::Unchanged }),
			Command::Unresolve(target) => self.unresolve(&target).map(|()| CommandOutcome::Changed(1)),
			Command::ResolveToken(target) => self.resolve_matching(&target).map(changed),
			Command::ResolveTokenEverywhere(target) => self.resolve_matching_everywhere(&target).map(changed),
			Command::Exclude { target, scope } => self
				.exclude(&target, scope)
				.await
				.map(|rule| rule.map_or(CommandOutcome::Unchanged, CommandOutcome::Excluded)),
			Command::ToggleCommenting => Ok(CommandOutcome::CommentingVisible(self.toggle_commenting())),
		};
		if let Err(error) = &result {
			warn!(command = id, %error, "command.failed");
		}
		result
	}
}

fn changed(count: usize) -> CommandOutcome {
	if count == 0 { CommandOutcome::Unchanged } else { CommandOutcome::Changed(count) }
}
