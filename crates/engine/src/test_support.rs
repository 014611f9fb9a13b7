//! In-memory host for lifecycle tests.
//!
//! One [`StubHost`] implements every host trait. Legend fetches can be held
//! behind a [`Notify`] barrier to keep builds in flight.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use lsp_types::{Hover, HoverContents, MarkedString, Position, SemanticTokenType, SemanticTokensLegend};
use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use tokio::sync::Notify;

use crate::annotation::{Annotation, AnnotationId, CommentView, TokenIdentity};
use crate::host::{CommentSurface, DocumentKey, DocumentSnapshot, Host, LanguageServices, Workspace};
use crate::settings::{SettingsScope, SettingsStore};
use crate::{EngineConfig, Error, Result};

pub(crate) const LANGUAGE: &str = "objectscript";

/// Three class references; the first two canonicalize to the same value.
pub(crate) const CLASS_REFS: &str = "Set x = ##class(%Integer).%New()\nSet y = ##class(%Library.Integer).Foo()\nSet z = ##class(MyApp.Foo).Bar()\n";

pub(crate) const CLASS_REF_TOKENS: [u32; 15] = [0, 16, 8, 1, 0, 1, 16, 16, 1, 0, 1, 16, 9, 1, 0];

pub(crate) struct StubHost {
	documents: Mutex<HashMap<DocumentKey, DocumentSnapshot>>,
	tokens: Mutex<HashMap<DocumentKey, Vec<u32>>>,
	active: Mutex<Option<DocumentKey>>,
	visible: Mutex<Vec<DocumentKey>>,
	legend: Mutex<Option<SemanticTokensLegend>>,
	hover_misses: Mutex<HashSet<(u32, u32)>>,
	settings: Mutex<HashMap<SettingsScope, Value>>,
	fail_writes: AtomicBool,

	gated: AtomicBool,
	gate: Notify,
	pub(crate) legend_calls: Mutex<Vec<DocumentKey>>,
	pub(crate) hover_calls: AtomicUsize,

	pub(crate) shown: Mutex<Vec<CommentView>>,
	pub(crate) updated: Mutex<Vec<CommentView>>,
	pub(crate) disposed: Mutex<Vec<AnnotationId>>,
	pub(crate) offered: Mutex<Vec<Vec<String>>>,
	pick: Mutex<Option<usize>>,
	pub(crate) reports: Mutex<Vec<String>>,
	pub(crate) commenting_visible: Mutex<Option<bool>>,
}

impl StubHost {
	/// A host whose legend knows `COS_Command` and `CLS_ClassName`, with
	/// `CLS_ClassName` enabled globally for [`LANGUAGE`].
	pub(crate) fn new() -> Arc<Self> {
		let host = Self {
			documents: Mutex::default(),
			tokens: Mutex::default(),
			active: Mutex::default(),
			visible: Mutex::default(),
			legend: Mutex::new(Some(legend(&["COS_Command", "CLS_ClassName"]))),
			hover_misses: Mutex::default(),
			settings: Mutex::default(),
			fail_writes: AtomicBool::new(false),
			gated: AtomicBool::new(false),
			gate: Notify::new(),
			legend_calls: Mutex::default(),
			hover_calls: AtomicUsize::new(0),
			shown: Mutex::default(),
			updated: Mutex::default(),
			disposed: Mutex::default(),
			offered: Mutex::default(),
			pick: Mutex::new(Some(0)),
			reports: Mutex::default(),
			commenting_visible: Mutex::default(),
		};
		host.set_tokens_setting(&SettingsScope::Global, json!({ "CLS_ClassName": { "enabled": true } }));
		Arc::new(host)
	}

	pub(crate) fn host(self: &Arc<Self>) -> Host {
		Host {
			services: self.clone(),
			workspace: self.clone(),
			settings: self.clone(),
			surface: self.clone(),
		}
	}

	/// Opens `key` with the class reference fixture and makes it visible.
	pub(crate) fn open(&self, key: &str) -> DocumentKey {
		self.open_with(key, CLASS_REFS, &CLASS_REF_TOKENS)
	}

	/// Opens a document whose provider reports `data` mirrored twice over.
	pub(crate) fn open_with(&self, key: &str, text: &str, data: &[u32]) -> DocumentKey {
		let key = DocumentKey::from(key);
		self.documents.lock().insert(key.clone(), DocumentSnapshot::new(key.clone(), LANGUAGE, text));
		self.tokens.lock().insert(key.clone(), [data, data].concat());
		self.visible.lock().push(key.clone());
		key
	}

	pub(crate) fn set_active(&self, key: Option<&DocumentKey>) {
		*self.active.lock() = key.cloned();
	}

	pub(crate) fn set_visible(&self, keys: &[&DocumentKey]) {
		*self.visible.lock() = keys.iter().map(|&k| k.clone()).collect();
	}

	pub(crate) fn set_legend(&self, legend: Option<SemanticTokensLegend>) {
		*self.legend.lock() = legend;
	}

	/// Hover at `(line, character)` returns nothing.
	pub(crate) fn miss_hover_at(&self, line: u32, character: u32) {
		self.hover_misses.lock().insert((line, character));
	}

	/// Replaces the token settings of [`LANGUAGE`] at `scope`.
	pub(crate) fn set_tokens_setting(&self, scope: &SettingsScope, tokens: Value) {
		let section = EngineConfig::default().tokens_section(LANGUAGE);
		let mut settings = self.settings.lock();
		let root = settings.entry(scope.clone()).or_insert_with(|| Value::Object(Map::new()));
		set_path(root, &section, tokens);
	}

	pub(crate) fn setting(&self, scope: &SettingsScope, key: &str) -> Option<Value> {
		self.settings.lock().get(scope).and_then(|root| get_path(root, key)).cloned()
	}

	pub(crate) fn fail_writes(&self) {
		self.fail_writes.store(true, Ordering::SeqCst);
	}

	/// Picks the candidate at `index` on the next prompt; `None` dismisses it.
	pub(crate) fn pick(&self, index: Option<usize>) {
		*self.pick.lock() = index;
	}

	/// Holds every legend fetch until released.
	pub(crate) fn hold(&self) {
		self.gated.store(true, Ordering::SeqCst);
	}

	/// Lets one held legend fetch proceed.
	pub(crate) fn proceed(&self) {
		self.gate.notify_one();
	}

	pub(crate) fn release_all(&self) {
		self.gated.store(false, Ordering::SeqCst);
		self.gate.notify_waiters();
	}

	pub(crate) fn legend_call_count(&self) -> usize {
		self.legend_calls.lock().len()
	}
}

pub(crate) fn legend(types: &[&'static str]) -> SemanticTokensLegend {
	SemanticTokensLegend {
		token_types: types.iter().map(|&t| SemanticTokenType::new(t)).collect(),
		token_modifiers: vec![],
	}
}

fn get_path<'v>(root: &'v Value, path: &str) -> Option<&'v Value> {
	path.split('.').try_fold(root, |value, segment| value.get(segment))
}

fn set_path(root: &mut Value, path: &str, value: Value) {
	let mut node = root;
	for segment in path.split('.') {
		if !node.is_object() {
			*node = Value::Object(Map::new());
		}
		let Value::Object(map) = node else { unreachable!() };
		node = map.entry(segment).or_insert(Value::Null);
	}
	*node = value;
}

/// Unblocks held builds on drop so a failing test cannot hang.
pub(crate) struct HostGuard(pub(crate) Arc<StubHost>);

impl Drop for HostGuard {
	fn drop(&mut self) {
		self.0.release_all();
	}
}

#[async_trait]
impl LanguageServices for StubHost {
	async fn legend(&self, doc: &DocumentKey) -> Result<Option<SemanticTokensLegend>> {
		self.legend_calls.lock().push(doc.clone());
		if self.gated.load(Ordering::SeqCst) {
			self.gate.notified().await;
		}
		Ok(self.legend.lock().clone())
	}

	async fn semantic_tokens(&self, doc: &DocumentKey) -> Result<Vec<u32>> {
		Ok(self.tokens.lock().get(doc).cloned().unwrap_or_default())
	}

	async fn hover(&self, _doc: &DocumentKey, position: Position) -> Result<Option<Hover>> {
		self.hover_calls.fetch_add(1, Ordering::SeqCst);
		if self.hover_misses.lock().contains(&(position.line, position.character)) {
			return Ok(None);
		}
		Ok(Some(Hover {
			contents: HoverContents::Scalar(MarkedString::String(format!("doc@{}:{}", position.line, position.character))),
			range: None,
		}))
	}
}

impl Workspace for StubHost {
	fn snapshot(&self, doc: &DocumentKey) -> Option<DocumentSnapshot> {
		self.documents.lock().get(doc).cloned()
	}

	fn active_document(&self) -> Option<DocumentKey> {
		self.active.lock().clone()
	}

	fn visible_documents(&self) -> Vec<DocumentKey> {
		self.visible.lock().clone()
	}
}

#[async_trait]
impl SettingsStore for StubHost {
	async fn read(&self, scope: &SettingsScope, section: &str) -> Result<Option<Value>> {
		Ok(self.setting(scope, section))
	}

	async fn write(&self, scope: &SettingsScope, key: &str, value: Value) -> Result<()> {
		if self.fail_writes.load(Ordering::SeqCst) {
			return Err(Error::Host("settings backend is read-only".into()));
		}
		let mut settings = self.settings.lock();
		let root = settings.entry(scope.clone()).or_insert_with(|| Value::Object(Map::new()));
		set_path(root, key, value);
		Ok(())
	}
}

#[async_trait]
impl CommentSurface for StubHost {
	fn show(&self, view: &CommentView) {
		self.shown.lock().push(view.clone());
	}

	fn update(&self, view: &CommentView) {
		self.updated.lock().push(view.clone());
	}

	fn dispose(&self, annotation: &Annotation) {
		self.disposed.lock().push(annotation.id);
	}

	fn set_commenting_visible(&self, visible: bool) {
		*self.commenting_visible.lock() = Some(visible);
	}

	async fn pick_exclusion(&self, _identity: &TokenIdentity, candidates: &[String]) -> Option<String> {
		self.offered.lock().push(candidates.to_vec());
		let index = (*self.pick.lock())?;
		candidates.get(index).cloned()
	}

	fn report(&self, message: &str) {
		self.reports.lock().push(message.to_owned());
	}
}
