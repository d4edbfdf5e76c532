//! Runtime recorder: the per-framework adapter seam.
//!
//! A [`RunRecorder`] is one registration context: it owns the monotonic
//! `source_order` counter for its module (no ambient global survives across
//! unrelated test files) and the scenario currently under construction.
//! Test adapters call the narrative methods while a test runs, then
//! [`finish_scenario`](RunRecorder::finish_scenario) flushes the story to
//! whatever [`StorySink`] the recorder was built over: in-memory for
//! same-process runners, the file channel for workers.
//!
//! Narrative calls with no registered scenario are programmer errors and
//! fail loudly with [`StorydocError::NoActiveScenario`]; an incomplete
//! report must surface in the test's own output, not vanish.
//!
//! Doc entries attach positionally: to the scenario while no step exists
//! yet, to the most recent step afterwards. Entries added inside
//! [`timed_step`](RunRecorder::timed_step) are recorded with the `runtime`
//! phase; everything else is `static`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use storydoc_error::{Result, StorydocError};
use storydoc_store::StorySink;
use storydoc_types::{
    DocEntry, DocPhase, HostStatus, ScenarioIdentity, StepKeyword, StepMode, StoryMeta,
    StoryPartial, StoryStep,
};

/// Declaration-time options for a scenario.
#[derive(Debug, Clone, Default)]
pub struct ScenarioOptions {
    /// Tags, order preserved; duplicates are dropped at registration.
    pub tags: Vec<String>,
    /// Ticket references, ordered.
    pub tickets: Vec<String>,
    /// Free-form user metadata.
    pub meta: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug)]
struct ActiveScenario {
    identity: ScenarioIdentity,
    story: StoryMeta,
    /// True while a timed step body runs; switches doc phase to runtime.
    executing: bool,
    started: Option<Instant>,
}

/// One registration context bound to one source module and one sink.
pub struct RunRecorder {
    sink: Arc<dyn StorySink>,
    source_file: String,
    next_order: AtomicU64,
    active: Mutex<Option<ActiveScenario>>,
}

impl std::fmt::Debug for RunRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunRecorder")
            .field("source_file", &self.source_file)
            .field("next_order", &self.next_order)
            .finish_non_exhaustive()
    }
}

impl RunRecorder {
    /// A recorder for one source module, flushing into `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn StorySink>, source_file: impl Into<String>) -> Self {
        Self {
            sink,
            source_file: source_file.into(),
            next_order: AtomicU64::new(0),
            active: Mutex::new(None),
        }
    }

    // ─── Scenario lifecycle ─────────────────────────────────────────

    /// Register a scenario and make it current. An unfinished previous
    /// scenario is flushed first.
    ///
    /// # Errors
    /// [`StorydocError::EmptyScenarioTitle`] on an empty title, or a sink
    /// error while flushing a previous scenario.
    pub fn start_scenario(
        &self,
        suite_path: Vec<String>,
        title: &str,
        options: ScenarioOptions,
    ) -> Result<()> {
        if title.is_empty() {
            return Err(StorydocError::EmptyScenarioTitle);
        }
        // Flush anything still open; a module registers scenarios
        // sequentially, so this only fires on a missing finish call.
        if self.active.lock().is_some() {
            tracing::debug!(title, "previous scenario left open; flushing");
            self.finish_scenario()?;
        }

        let mut story = StoryMeta::new(title);
        story.source_file = self.source_file.clone();
        story.suite_path = suite_path.clone();
        story.source_order = self.next_order.fetch_add(1, Ordering::Relaxed);
        for tag in options.tags {
            if !story.tags.contains(&tag) {
                story.tags.push(tag);
            }
        }
        story.tickets = options.tickets;
        story.meta = options.meta;

        let mut title_path = suite_path;
        title_path.push(title.to_owned());
        let identity = ScenarioIdentity::new(self.source_file.clone(), title_path);

        *self.active.lock() = Some(ActiveScenario {
            identity,
            story,
            executing: false,
            started: None,
        });
        Ok(())
    }

    /// Flush the current scenario's narrative to the sink and clear it.
    /// Returns the flushed identity.
    ///
    /// # Errors
    /// [`StorydocError::NoActiveScenario`] with nothing to finish, or a
    /// sink error.
    pub fn finish_scenario(&self) -> Result<ScenarioIdentity> {
        let active = self
            .active
            .lock()
            .take()
            .ok_or(StorydocError::NoActiveScenario)?;
        let partial = StoryPartial::narrative(active.story, now_ms());
        self.sink.record(active.identity.clone(), partial)?;
        Ok(active.identity)
    }

    /// Whether a scenario is currently registered.
    #[must_use]
    pub fn has_active_scenario(&self) -> bool {
        self.active.lock().is_some()
    }

    // ─── Steps ──────────────────────────────────────────────────────

    /// Append a step with an explicit keyword. The new step becomes the
    /// attachment target for subsequent docs and mode markers.
    ///
    /// # Errors
    /// [`StorydocError::NoActiveScenario`] outside a scenario.
    pub fn step(&self, keyword: StepKeyword, text: &str) -> Result<()> {
        self.with_active(|active| {
            active.story.steps.push(StoryStep::new(keyword, text));
        })
    }

    /// Precondition step.
    ///
    /// # Errors
    /// See [`step`](Self::step).
    pub fn given(&self, text: &str) -> Result<()> {
        self.step(StepKeyword::Given, text)
    }

    /// Action step.
    ///
    /// # Errors
    /// See [`step`](Self::step).
    pub fn when(&self, text: &str) -> Result<()> {
        self.step(StepKeyword::When, text)
    }

    /// Assertion step.
    ///
    /// # Errors
    /// See [`step`](Self::step).
    pub fn then(&self, text: &str) -> Result<()> {
        self.step(StepKeyword::Then, text)
    }

    /// Continuation step.
    ///
    /// # Errors
    /// See [`step`](Self::step).
    pub fn and(&self, text: &str) -> Result<()> {
        self.step(StepKeyword::And, text)
    }

    /// Negated continuation step.
    ///
    /// # Errors
    /// See [`step`](Self::step).
    pub fn but(&self, text: &str) -> Result<()> {
        self.step(StepKeyword::But, text)
    }

    /// Arrange/act/assert and friends map straight onto the BDD keywords.
    ///
    /// # Errors
    /// See [`step`](Self::step).
    pub fn arrange(&self, text: &str) -> Result<()> {
        self.given(text)
    }

    /// Alias for [`given`](Self::given).
    ///
    /// # Errors
    /// See [`step`](Self::step).
    pub fn setup(&self, text: &str) -> Result<()> {
        self.given(text)
    }

    /// Alias for [`given`](Self::given).
    ///
    /// # Errors
    /// See [`step`](Self::step).
    pub fn context(&self, text: &str) -> Result<()> {
        self.given(text)
    }

    /// Alias for [`when`](Self::when).
    ///
    /// # Errors
    /// See [`step`](Self::step).
    pub fn act(&self, text: &str) -> Result<()> {
        self.when(text)
    }

    /// Alias for [`when`](Self::when).
    ///
    /// # Errors
    /// See [`step`](Self::step).
    pub fn execute(&self, text: &str) -> Result<()> {
        self.when(text)
    }

    /// Alias for [`when`](Self::when).
    ///
    /// # Errors
    /// See [`step`](Self::step).
    pub fn action(&self, text: &str) -> Result<()> {
        self.when(text)
    }

    /// Alias for [`then`](Self::then).
    ///
    /// # Errors
    /// See [`step`](Self::step).
    pub fn assert(&self, text: &str) -> Result<()> {
        self.then(text)
    }

    /// Alias for [`then`](Self::then).
    ///
    /// # Errors
    /// See [`step`](Self::step).
    pub fn verify(&self, text: &str) -> Result<()> {
        self.then(text)
    }

    /// Alias for [`then`](Self::then).
    ///
    /// # Errors
    /// See [`step`](Self::step).
    pub fn check(&self, text: &str) -> Result<()> {
        self.then(text)
    }

    /// Mark the current step's mode (skip/todo/fail/slow). With no step
    /// declared yet this is a no-op.
    ///
    /// # Errors
    /// [`StorydocError::NoActiveScenario`] outside a scenario.
    pub fn mark_step(&self, mode: StepMode) -> Result<()> {
        self.with_active(|active| match active.story.steps.last_mut() {
            Some(step) => step.mode = mode,
            None => {
                tracing::debug!(mode = mode.label(), "mode marker before any step; ignored");
            }
        })
    }

    /// Run a step body, measuring it. The current step gets `wrapped` and
    /// `duration_ms`; doc entries added by `body` carry the runtime phase.
    ///
    /// # Errors
    /// [`StorydocError::NoActiveScenario`] outside a scenario.
    pub fn timed_step<R>(&self, body: impl FnOnce() -> R) -> Result<R> {
        self.with_active(|active| {
            active.executing = true;
            active.started = Some(Instant::now());
        })?;
        let result = body();
        self.with_active(|active| {
            let elapsed = active
                .started
                .take()
                .map_or(0, |started| u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX));
            active.executing = false;
            if let Some(step) = active.story.steps.last_mut() {
                step.wrapped = true;
                step.duration_ms = Some(elapsed);
            }
        })?;
        Ok(result)
    }

    // ─── Docs ───────────────────────────────────────────────────────

    /// Free-text note.
    ///
    /// # Errors
    /// [`StorydocError::NoActiveScenario`] outside a scenario.
    pub fn note(&self, text: &str) -> Result<()> {
        let text = text.to_owned();
        self.attach(move |phase| DocEntry::Note { text, phase })
    }

    /// Labelled key/value pair.
    ///
    /// # Errors
    /// [`StorydocError::NoActiveScenario`] outside a scenario.
    pub fn kv(&self, label: &str, value: impl Into<serde_json::Value>) -> Result<()> {
        let label = label.to_owned();
        let value = value.into();
        self.attach(move |phase| DocEntry::Kv { label, value, phase })
    }

    /// Labelled code block.
    ///
    /// # Errors
    /// [`StorydocError::NoActiveScenario`] outside a scenario.
    pub fn code(&self, label: &str, content: &str, lang: Option<&str>) -> Result<()> {
        let label = label.to_owned();
        let content = content.to_owned();
        let lang = lang.map(str::to_owned);
        self.attach(move |phase| DocEntry::Code {
            label,
            content,
            lang,
            phase,
        })
    }

    /// JSON shorthand: pretty-prints `value` into a `json` code block.
    ///
    /// # Errors
    /// [`StorydocError::NoActiveScenario`] outside a scenario, or a
    /// serialization failure.
    pub fn json(&self, label: &str, value: &impl serde::Serialize) -> Result<()> {
        let content = serde_json::to_string_pretty(value)?;
        self.code(label, &content, Some("json"))
    }

    /// Labelled table.
    ///
    /// # Errors
    /// [`StorydocError::NoActiveScenario`] outside a scenario.
    pub fn table(&self, label: &str, columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<()> {
        let label = label.to_owned();
        self.attach(move |phase| DocEntry::Table {
            label,
            columns,
            rows,
            phase,
        })
    }

    /// Hyperlink.
    ///
    /// # Errors
    /// [`StorydocError::NoActiveScenario`] outside a scenario.
    pub fn link(&self, label: &str, url: &str) -> Result<()> {
        let label = label.to_owned();
        let url = url.to_owned();
        self.attach(move |phase| DocEntry::Link { label, url, phase })
    }

    /// Titled markdown section.
    ///
    /// # Errors
    /// [`StorydocError::NoActiveScenario`] outside a scenario.
    pub fn section(&self, title: &str, markdown: &str) -> Result<()> {
        let title = title.to_owned();
        let markdown = markdown.to_owned();
        self.attach(move |phase| DocEntry::Section {
            title,
            markdown,
            phase,
        })
    }

    /// Mermaid diagram.
    ///
    /// # Errors
    /// [`StorydocError::NoActiveScenario`] outside a scenario.
    pub fn mermaid(&self, code: &str, title: Option<&str>) -> Result<()> {
        let code = code.to_owned();
        let title = title.map(str::to_owned);
        self.attach(move |phase| DocEntry::Mermaid { code, title, phase })
    }

    /// Screenshot reference.
    ///
    /// # Errors
    /// [`StorydocError::NoActiveScenario`] outside a scenario.
    pub fn screenshot(&self, path: &str, alt: Option<&str>) -> Result<()> {
        let path = path.to_owned();
        let alt = alt.map(str::to_owned);
        self.attach(move |phase| DocEntry::Screenshot { path, alt, phase })
    }

    /// One tag entry with a single name. Separate calls stay separate
    /// entries; they are never merged.
    ///
    /// # Errors
    /// [`StorydocError::NoActiveScenario`] outside a scenario.
    pub fn tag(&self, name: &str) -> Result<()> {
        self.tags(vec![name.to_owned()])
    }

    /// One tag entry with several names.
    ///
    /// # Errors
    /// [`StorydocError::NoActiveScenario`] outside a scenario.
    pub fn tags(&self, names: Vec<String>) -> Result<()> {
        self.attach(move |phase| DocEntry::Tag { names, phase })
    }

    /// Custom entry for a user-registered renderer.
    ///
    /// # Errors
    /// [`StorydocError::NoActiveScenario`] outside a scenario.
    pub fn custom(&self, type_name: &str, data: serde_json::Value) -> Result<()> {
        let type_name = type_name.to_owned();
        self.attach(move |phase| DocEntry::Custom {
            type_name,
            data,
            phase,
        })
    }

    // ─── Outcome convenience for framework adapters ─────────────────

    /// Record an outcome delta for an already-known identity, bypassing
    /// the narrative state. Used by adapters that observe results per
    /// attempt (retries get distinct tokens).
    ///
    /// # Errors
    /// Sink failure.
    pub fn record_outcome(
        &self,
        identity: ScenarioIdentity,
        status: HostStatus,
        duration_ms: u64,
        failure_details: Option<String>,
        write_token: Option<String>,
    ) -> Result<()> {
        let mut partial =
            StoryPartial::outcome_delta(status.as_counts(), duration_ms, now_ms());
        partial.failure_details = failure_details.filter(|text| !text.is_empty());
        partial.write_token = write_token;
        self.sink.record(identity, partial)
    }

    // ─── Internals ──────────────────────────────────────────────────

    fn with_active<R>(&self, f: impl FnOnce(&mut ActiveScenario) -> R) -> Result<R> {
        let mut guard = self.active.lock();
        let active = guard.as_mut().ok_or(StorydocError::NoActiveScenario)?;
        Ok(f(active))
    }

    fn attach(&self, build: impl FnOnce(DocPhase) -> DocEntry) -> Result<()> {
        self.with_active(|active| {
            let phase = if active.executing {
                DocPhase::Runtime
            } else {
                DocPhase::Static
            };
            let entry = build(phase);
            // Positional rule: scenario scope until the first step exists,
            // current step afterwards.
            match active.story.steps.last_mut() {
                Some(step) => step.docs.push(entry),
                None => active.story.docs.push(entry),
            }
        })
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use storydoc_store::MemoryStore;

    fn recorder() -> (Arc<MemoryStore>, RunRecorder) {
        let store = Arc::new(MemoryStore::new());
        let rec = RunRecorder::new(store.clone(), "calc.test.ts");
        (store, rec)
    }

    #[test]
    fn narrative_before_registration_fails_loudly() {
        let (_, rec) = recorder();
        assert!(matches!(
            rec.given("anything"),
            Err(StorydocError::NoActiveScenario)
        ));
        assert!(matches!(
            rec.note("anything"),
            Err(StorydocError::NoActiveScenario)
        ));
    }

    #[test]
    fn empty_title_is_rejected() {
        let (_, rec) = recorder();
        assert!(matches!(
            rec.start_scenario(vec![], "", ScenarioOptions::default()),
            Err(StorydocError::EmptyScenarioTitle)
        ));
    }

    #[test]
    fn docs_attach_to_scenario_before_first_step_then_to_current_step() {
        let (store, rec) = recorder();
        rec.start_scenario(vec!["Calculator".into()], "adds", ScenarioOptions::default())
            .unwrap();
        rec.note("scenario-scope note").unwrap();
        rec.given("two numbers").unwrap();
        rec.note("step-scope note").unwrap();
        rec.finish_scenario().unwrap();

        let drained = store.drain();
        let story = drained[0].1.story.as_ref().unwrap();
        assert_eq!(story.docs.len(), 1);
        assert_eq!(story.steps[0].docs.len(), 1);
    }

    #[test]
    fn identity_is_suite_path_plus_title() {
        let (store, rec) = recorder();
        rec.start_scenario(vec!["Calculator".into()], "adds", ScenarioOptions::default())
            .unwrap();
        let identity = rec.finish_scenario().unwrap();
        assert_eq!(identity.source_file, "calc.test.ts");
        assert_eq!(identity.title_path, vec!["Calculator".to_owned(), "adds".to_owned()]);
        assert_eq!(store.drain().len(), 1);
    }

    #[test]
    fn source_order_increments_per_registration() {
        let (store, rec) = recorder();
        for title in ["first", "second", "third"] {
            rec.start_scenario(vec![], title, ScenarioOptions::default())
                .unwrap();
            rec.finish_scenario().unwrap();
        }
        let drained = store.drain();
        let mut orders: Vec<u64> = drained
            .iter()
            .map(|(_, m)| m.story.as_ref().unwrap().source_order)
            .collect();
        orders.sort_unstable();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn separate_tag_calls_stay_separate_entries() {
        let (store, rec) = recorder();
        rec.start_scenario(vec![], "tagged", ScenarioOptions::default())
            .unwrap();
        rec.given("first").unwrap();
        rec.tag("admin").unwrap();
        rec.when("second").unwrap();
        rec.tags(vec!["admin".into(), "elevated".into()]).unwrap();
        rec.finish_scenario().unwrap();

        let drained = store.drain();
        let story = drained[0].1.story.as_ref().unwrap();
        let tag_entries: Vec<&DocEntry> = story
            .steps
            .iter()
            .flat_map(|s| &s.docs)
            .filter(|d| d.kind() == "tag")
            .collect();
        assert_eq!(tag_entries.len(), 2);
        match (tag_entries[0], tag_entries[1]) {
            (DocEntry::Tag { names: a, .. }, DocEntry::Tag { names: b, .. }) => {
                assert_eq!(a, &vec!["admin".to_owned()]);
                assert_eq!(b, &vec!["admin".to_owned(), "elevated".to_owned()]);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn timed_step_marks_wrapped_and_runtime_phase() {
        let (store, rec) = recorder();
        rec.start_scenario(vec![], "measured", ScenarioOptions::default())
            .unwrap();
        rec.when("computation runs").unwrap();
        let result = rec
            .timed_step(|| {
                rec.kv("intermediate", serde_json::json!(41)).unwrap();
                41 + 1
            })
            .unwrap();
        assert_eq!(result, 42);
        rec.finish_scenario().unwrap();

        let drained = store.drain();
        let story = drained[0].1.story.as_ref().unwrap();
        let step = &story.steps[0];
        assert!(step.wrapped);
        assert!(step.duration_ms.is_some());
        assert_eq!(step.docs[0].phase(), DocPhase::Runtime);
    }

    #[test]
    fn static_docs_outside_timed_step_keep_static_phase() {
        let (store, rec) = recorder();
        rec.start_scenario(vec![], "plain", ScenarioOptions::default())
            .unwrap();
        rec.given("a step").unwrap();
        rec.kv("configured", serde_json::json!(true)).unwrap();
        rec.finish_scenario().unwrap();

        let drained = store.drain();
        let story = drained[0].1.story.as_ref().unwrap();
        assert_eq!(story.steps[0].docs[0].phase(), DocPhase::Static);
    }

    #[test]
    fn duplicate_tags_in_options_are_dropped_in_order() {
        let (store, rec) = recorder();
        let options = ScenarioOptions {
            tags: vec!["b".into(), "a".into(), "b".into()],
            ..Default::default()
        };
        rec.start_scenario(vec![], "tagged", options).unwrap();
        rec.finish_scenario().unwrap();

        let drained = store.drain();
        let story = drained[0].1.story.as_ref().unwrap();
        assert_eq!(story.tags, vec!["b".to_owned(), "a".to_owned()]);
    }

    #[test]
    fn mode_markers_apply_to_the_current_step() {
        let (store, rec) = recorder();
        rec.start_scenario(vec![], "modal", ScenarioOptions::default())
            .unwrap();
        rec.given("declared but skipped").unwrap();
        rec.mark_step(StepMode::Skip).unwrap();
        rec.then("unwritten").unwrap();
        rec.mark_step(StepMode::Todo).unwrap();
        rec.finish_scenario().unwrap();

        let drained = store.drain();
        let story = drained[0].1.story.as_ref().unwrap();
        assert_eq!(story.steps[0].mode, StepMode::Skip);
        assert_eq!(story.steps[1].mode, StepMode::Todo);
    }

    #[test]
    fn record_outcome_filters_empty_failure_text() {
        let (store, rec) = recorder();
        let identity = ScenarioIdentity::new("calc.test.ts", vec!["adds".into()]);
        rec.record_outcome(identity, HostStatus::Failed, 10, Some(String::new()), None)
            .unwrap();
        let drained = store.drain();
        assert!(drained[0].1.failure_details.is_none());
        assert_eq!(drained[0].1.outcome.failed, 1);
    }
}
