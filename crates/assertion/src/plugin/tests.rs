use std::panic::{AssertUnwindSafe, catch_unwind};

use pretty_assertions::assert_eq;
use vouch_host::failure::NATIVE_FAILURE;
use vouch_host::{BufferedCapture, CaptureManager, ModuleSource, SharedBuffer, Terminal};

use super::*;
use crate::compare::{CompareOp, Comparator, FnComparator};
use crate::explain::LINE_SEPARATOR;
use crate::hook::{HookState, REWRITE_LOADER};

const UNSET_CI_VAR: &str = "VOUCH_PLUGIN_TESTS_NEVER_SET";

struct Marker;

impl ModuleRewriter for Marker {
	fn rewrite(&self, source: &ModuleSource) -> vouch_host::Result<String> {
		Ok(format!("# rewritten\n{}", source.code))
	}
}

struct Reinterp;

impl Reinterpreter for Reinterp {
	fn failure_type(&self) -> &str {
		"ReinterpretedAssertionError"
	}
}

struct Fixture {
	config: RunConfig,
	capture: Arc<BufferedCapture>,
	screen: SharedBuffer,
}

fn settings() -> DiagnosticsSettings {
	DiagnosticsSettings {
		ci_env_vars: vec![UNSET_CI_VAR.to_string()],
		..DiagnosticsSettings::default()
	}
}

fn capabilities() -> Capabilities {
	Capabilities {
		runtime: RuntimeCapabilities::full(),
		rewriter: Some(Arc::new(Marker)),
		reinterpreter: Some(Arc::new(Reinterp)),
	}
}

fn fixture_with(settings: DiagnosticsSettings, options: AssertOptions, capabilities: Capabilities) -> Fixture {
	let (terminal, screen) = Terminal::buffered();
	let capture = Arc::new(BufferedCapture::new(terminal.clone()));
	let host = Host::new(capture.clone(), terminal);
	Fixture {
		config: RunConfig::new(host, settings, &options, capabilities),
		capture,
		screen,
	}
}

fn fixture() -> Fixture {
	fixture_with(settings(), AssertOptions::default(), capabilities())
}

fn wide_lines(header: &str, count: usize) -> Vec<String> {
	std::iter::once(header.to_string())
		.chain((0..count).map(|i| format!("{i:02}{}", "y".repeat(98))))
		.collect()
}

fn register_lines(config: &RunConfig, lines: Vec<String>) {
	let comparator: Arc<dyn Comparator> = Arc::new(FnComparator::new("fixed", move |op, _, _| {
		Ok((op == CompareOp::Lt).then(|| lines.clone()))
	}));
	config.comparators().register(comparator);
}

#[test]
fn configure_installs_rewrite_hook() {
	let f = fixture();
	let state = f.config.configure().unwrap();

	assert_eq!(state.mode(), Mode::Rewrite);
	assert_eq!(state.hook_state(), HookState::Installed);
	assert_eq!(f.config.host().imports.names(), vec![REWRITE_LOADER.to_string()]);
	assert_eq!(f.config.mode(), Mode::Rewrite);
}

#[test]
fn configure_twice_is_rejected() {
	let f = fixture();
	f.config.configure().unwrap();
	let err = f.config.configure().unwrap_err();
	assert!(matches!(err, DiagnosticsError::AlreadyConfigured), "unexpected error: {err}");
	assert_eq!(f.config.host().imports.len(), 1);
}

#[test]
fn missing_rewriter_downgrades_to_reinterp() {
	let f = fixture_with(
		settings(),
		AssertOptions::default(),
		Capabilities {
			rewriter: None,
			..capabilities()
		},
	);
	let state = f.config.configure().unwrap();

	assert_eq!(state.mode(), Mode::Reinterpret);
	assert_eq!(state.hook_state(), HookState::Uninstalled);
	assert!(f.config.host().imports.is_empty());
}

#[test]
fn legacy_flag_forces_plain() {
	let options = AssertOptions {
		no_magic: true,
		..AssertOptions::default()
	};
	let f = fixture_with(settings(), options, capabilities());
	let state = f.config.configure().unwrap();

	assert_eq!(state.mode(), Mode::Plain);
	assert!(f.config.host().imports.is_empty());
	assert_eq!(&*f.config.host().failure.current(), NATIVE_FAILURE);
}

#[test]
fn failure_type_is_swapped_until_cleanup() {
	let f = fixture();
	f.config.configure().unwrap();
	assert_eq!(&*f.config.host().failure.current(), "ReinterpretedAssertionError");

	f.config.cleanup().unwrap();
	assert_eq!(&*f.config.host().failure.current(), NATIVE_FAILURE);
}

#[test]
fn unenforced_assertions_warn_past_capture() {
	let f = fixture_with(
		settings(),
		AssertOptions::default(),
		Capabilities {
			runtime: RuntimeCapabilities {
				assertions_enforced: false,
				..RuntimeCapabilities::full()
			},
			..capabilities()
		},
	);
	f.capture.write_out("captured before\n").unwrap();
	f.config.configure().unwrap();

	let screen = f.screen.contents();
	assert!(screen.starts_with("WARNING: assertions which are not in test modules will be ignored"), "{screen}");
	assert!(!screen.contains("captured before"));
	assert!(!f.capture.is_suspended());
	assert_eq!(f.capture.suspend().unwrap().out, "captured before\n");
}

#[test]
fn enforced_assertions_stay_quiet() {
	let f = fixture();
	f.config.configure().unwrap();
	assert_eq!(f.screen.contents(), "");
}

#[test]
fn collection_binds_session_to_hook() {
	let f = fixture();
	let session = Arc::new(Session::new("run").unwrap());
	assert!(!f.config.collection(&session));

	let state = f.config.configure().unwrap();
	assert!(f.config.collection(&session));
	let hook = state.hook().unwrap();
	assert!(Arc::ptr_eq(&hook.session().unwrap(), &session));

	let module = ModuleSource::new("tests.test_io", "tests/test_io.py", "assert read() == b''");
	assert_eq!(f.config.host().imports.import(&module).unwrap().loader, REWRITE_LOADER);

	f.config.session_finish();
	assert!(hook.session().is_none());
	assert_eq!(state.hook_state(), HookState::Installed);
}

#[test]
fn collection_without_hook_is_noop() {
	let f = fixture_with(
		settings(),
		AssertOptions {
			mode: Some(Mode::Plain),
			..AssertOptions::default()
		},
		capabilities(),
	);
	f.config.configure().unwrap();
	assert!(!f.config.collection(&Arc::new(Session::new("run").unwrap())));
}

#[test]
fn setup_and_teardown_toggle_callback() {
	let f = fixture();
	f.config.configure().unwrap();
	register_lines(&f.config, vec!["1 < 0".into(), "left is larger".into()]);
	assert!(!f.config.reprcompare().is_active());

	f.config.runtest_setup();
	assert_eq!(
		f.config.reprcompare().call(CompareOp::Lt, &1, &0).unwrap(),
		Some(format!("1 < 0{LINE_SEPARATOR}left is larger"))
	);

	f.config.runtest_teardown();
	assert!(!f.config.reprcompare().is_active());
	assert_eq!(f.config.reprcompare().call(CompareOp::Lt, &1, &0).unwrap(), None);
}

#[test]
fn run_test_clears_callback_after_panic() {
	let f = fixture();
	f.config.configure().unwrap();

	let result = catch_unwind(AssertUnwindSafe(|| {
		f.config.run_test(|| {
			assert!(f.config.reprcompare().is_active());
			panic!("test body failed");
		})
	}));
	assert!(result.is_err());
	assert!(!f.config.reprcompare().is_active());
}

#[test]
fn long_explanations_truncate_end_to_end() {
	let f = fixture();
	f.config.configure().unwrap();
	register_lines(&f.config, wide_lines("a < b", 15));

	let rendered = f
		.config
		.run_test(|| f.config.reprcompare().call(CompareOp::Lt, &"a", &"b"))
		.unwrap()
		.unwrap();
	let parts: Vec<&str> = rendered.split(LINE_SEPARATOR).collect();
	assert_eq!(parts.len(), 12);
	assert_eq!(parts[11], "Detailed information truncated (5 more lines), use \"-vv\" to show");
}

#[test]
fn very_verbose_run_keeps_everything() {
	let options = AssertOptions {
		verbose: 2,
		..AssertOptions::default()
	};
	let f = fixture_with(settings(), options, capabilities());
	f.config.configure().unwrap();
	register_lines(&f.config, wide_lines("a < b", 15));

	let rendered = f.config.run_test(|| f.config.reprcompare().call(CompareOp::Lt, &"a", &"b")).unwrap();
	assert_eq!(rendered.map(|r| r.split(LINE_SEPARATOR).count()), Some(16));
}

#[test]
fn percent_signs_are_doubled_only_when_rewriting() {
	let cases = [(None, "100%% sure"), (Some(Mode::Reinterpret), "100% sure")];
	for (mode, expected) in cases {
		let options = AssertOptions {
			mode,
			..AssertOptions::default()
		};
		let f = fixture_with(settings(), options, capabilities());
		f.config.configure().unwrap();
		register_lines(&f.config, vec!["100% sure".into()]);

		let rendered = f.config.run_test(|| f.config.reprcompare().call(CompareOp::Lt, &0, &1)).unwrap();
		assert_eq!(rendered.as_deref(), Some(expected));
	}
}

#[test]
fn configure_reports_mode_to_tracer() {
	let f = fixture();
	let seen = Arc::new(Mutex::new(Vec::new()));
	let sink = seen.clone();
	f.config
		.host()
		.tracer
		.set_processor(move |tags, message| sink.lock().push(format!("[{tags}] {message}")));

	f.config.configure().unwrap();
	assert!(
		seen.lock()
			.contains(&"[assertion] configured with mode set to \"rewrite\"".to_string()),
		"{:?}",
		seen.lock()
	);
}

#[test]
fn cleanup_removes_hook_and_is_repeatable() {
	let f = fixture();
	f.config.configure().unwrap();
	f.config.runtest_setup();

	f.config.cleanup().unwrap();
	assert!(f.config.host().imports.is_empty());
	assert!(f.config.state().is_none());
	assert!(!f.config.reprcompare().is_active());
	assert_eq!(f.config.mode(), Mode::Plain);

	f.config.cleanup().unwrap();
}

#[test]
fn cleanup_runs_newest_first_and_reports_first_failure() {
	let f = fixture();
	let order = Arc::new(Mutex::new(Vec::new()));
	for (i, fails) in [(1, true), (2, false), (3, true)] {
		let order = order.clone();
		f.config.add_cleanup(move || {
			order.lock().push(i);
			if fails {
				Err(DiagnosticsError::MalformedExplanation(format!("cleanup {i}")))
			} else {
				Ok(())
			}
		});
	}

	let err = f.config.cleanup().unwrap_err();
	assert_eq!(*order.lock(), vec![3, 2, 1]);
	assert_eq!(err.to_string(), "malformed explanation: cleanup 3");
}
