//! Resolution, mute and dismissal of live annotations.

use tracing::{debug, info};

use super::AnnotationManager;
use crate::Result;
use crate::annotation::{AnnotationHandle, TokenIdentity};
use crate::host::DocumentKey;

impl AnnotationManager {
	/// Marks one annotation resolved. Returns `false` if it already was.
	pub fn resolve(&self, handle: &AnnotationHandle) -> Result<bool> {
		let mut state = self.inner.state.lock();
		let annotation = state.annotation_mut(handle)?;
		if !annotation.resolve() {
			return Ok(false);
		}
		self.inner.host.surface.update(&annotation.view(&self.inner.config.author));
		debug!(doc = %handle.document, id = %handle.id, "resolution.resolved");
		Ok(true)
	}

	/// Reverts one annotation to unresolved and expands it.
	pub fn unresolve(&self, handle: &AnnotationHandle) -> Result<()> {
		let mut state = self.inner.state.lock();
		let annotation = state.annotation_mut(handle)?;
		annotation.unresolve();
		self.inner.host.surface.update(&annotation.view(&self.inner.config.author));
		debug!(doc = %handle.document, id = %handle.id, "resolution.unresolved");
		Ok(())
	}

	/// Resolves every annotation in the handle's document that shares its
	/// identity. Returns how many changed state.
	pub fn resolve_matching(&self, handle: &AnnotationHandle) -> Result<usize> {
		let identity = self.identity_of(handle)?;
		let changed = self.resolve_where(&identity, |doc| *doc == handle.document);
		info!(doc = %handle.document, token_type = %identity.token_type, canonical = %identity.canonical_value, changed, "resolution.resolved_in_document");
		Ok(changed)
	}

	/// Resolves every annotation in every tracked document that shares the
	/// handle's identity. Returns how many changed state.
	pub fn resolve_matching_everywhere(&self, handle: &AnnotationHandle) -> Result<usize> {
		let identity = self.identity_of(handle)?;
		let changed = self.resolve_where(&identity, |_| true);
		info!(token_type = %identity.token_type, canonical = %identity.canonical_value, changed, "resolution.resolved_everywhere");
		Ok(changed)
	}

	fn identity_of(&self, handle: &AnnotationHandle) -> Result<TokenIdentity> {
		let mut state = self.inner.state.lock();
		Ok(state.annotation_mut(handle)?.identity.clone())
	}

	fn resolve_where(&self, identity: &TokenIdentity, include: impl Fn(&DocumentKey) -> bool) -> usize {
		let author = &self.inner.config.author;
		let mut state = self.inner.state.lock();
		let mut changed = 0;
		for (key, entry) in state.documents.iter_mut() {
			if !include(key) {
				continue;
			}
			for annotation in entry.annotations.iter_mut().filter(|a| a.identity == *identity) {
				if annotation.resolve() {
					self.inner.host.surface.update(&annotation.view(author));
					changed += 1;
				}
			}
		}
		changed
	}

	/// Permanently removes one annotation. Others sharing its identity stay.
	pub fn mute(&self, handle: &AnnotationHandle) -> Result<()> {
		let mut state = self.inner.state.lock();
		let entry = state.documents.get_mut(&handle.document).ok_or_else(|| super::unknown(handle))?;
		let index = entry
			.annotations
			.iter()
			.position(|a| a.id == handle.id)
			.ok_or_else(|| super::unknown(handle))?;
		let annotation = entry.annotations.remove(index);
		self.inner.host.surface.dispose(&annotation);
		debug!(doc = %handle.document, id = %handle.id, "resolution.muted");
		Ok(())
	}

	/// Removes every annotation of the active document. The document stays
	/// tracked, so it is not rebuilt until edited or reconfigured.
	pub fn dismiss_active(&self) -> usize {
		let Some(active) = self.inner.host.workspace.active_document() else {
			return 0;
		};
		let mut state = self.inner.state.lock();
		let Some(entry) = state.documents.get_mut(&active) else {
			return 0;
		};
		let removed = std::mem::take(&mut entry.annotations);
		for annotation in &removed {
			self.inner.host.surface.dispose(annotation);
		}
		info!(doc = %active, dismissed = removed.len(), "resolution.dismissed_active");
		removed.len()
	}

	/// Flips whether the host shows comment affordances. Returns the new value.
	pub fn toggle_commenting(&self) -> bool {
		let mut state = self.inner.state.lock();
		state.commenting_hidden = !state.commenting_hidden;
		let visible = !state.commenting_hidden;
		self.inner.host.surface.set_commenting_visible(visible);
		debug!(visible, "surface.commenting_toggled");
		visible
	}

	pub fn commenting_visible(&self) -> bool {
		!self.inner.state.lock().commenting_hidden
	}
}
