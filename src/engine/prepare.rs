//! The check, provision, negotiate loop.
//!
//! Each pass checks every requirement. If they all hold, their
//! contributions are merged into the environment and the run succeeds.
//! Otherwise unsatisfied requirements are split into those whose provider
//! has every blocking option (ready) and those still waiting on the user.
//! Ready requirements with a configuration they have not yet been tried
//! with are provisioned and the loop checks again. When nothing new can
//! be provisioned, an interactive channel is asked for more options;
//! without one the run fails.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use serde_yaml::Value;

use crate::engine::result::{PrepareOptions, PrepareResult};
use crate::error::Result;
use crate::project::Project;
use crate::providers::{ProvideContext, ProvideMode, Provider};
use crate::requirements::{
    Environ, PluginRegistry, Requirement, RequirementStatus, StatusReport, PROJECT_DIR_VAR,
};
use crate::state::{LocalStateFile, UserConfigOverrides};
use crate::ui::{OptionState, OutstandingItem, OutstandingSchema, UiChannel, UiEvent};

/// Where the loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Initial,
    Checking,
    NeedsAction,
    Provisioning,
    AwaitingInput,
    Satisfied,
    Failed,
    Stopped,
}

/// Prepare a project: satisfy every requirement and build its environment.
///
/// `environ` is the caller's environment; it is never modified. Provider
/// choices made along the way are saved to the project's local state when
/// the run succeeds; provider bookkeeping is saved whatever the outcome.
///
/// # Errors
///
/// Only infrastructure failures are errors (the local state cannot be
/// saved). Unsatisfied requirements are a [`PrepareResult::Failure`].
pub fn prepare(
    project: &mut Project,
    registry: &PluginRegistry,
    environ: &Environ,
    ui: &mut dyn UiChannel,
    options: &PrepareOptions,
) -> Result<PrepareResult> {
    if !project.problems().is_empty() {
        tracing::info!(
            "Project {} has {} problem(s); not preparing",
            project.name(),
            project.problems().len()
        );
        let result = PrepareResult::failed(project.problems().to_vec());
        ui.finished(&result);
        return Ok(result);
    }

    let mut run = Reconciler::new(project, registry, environ, options);
    let result = run.run(ui);
    let local_state = run.into_local_state(&result);

    project.local_state = local_state;
    project.local_state.save()?;

    ui.finished(&result);
    Ok(result)
}

/// Check every requirement of a project without touching anything.
pub fn check_statuses(project: &Project, environ: &Environ) -> Vec<StatusReport> {
    let environ = with_project_dir(project, environ);
    let overrides = UserConfigOverrides::new();
    project
        .requirements()
        .iter()
        .map(|requirement| StatusReport {
            requirement: requirement.env_var().to_string(),
            provider: requirement.provider_class_name().to_string(),
            status: requirement.check_status(
                &environ,
                project.local_state(),
                ProvideMode::Check,
                &overrides,
            ),
        })
        .collect()
}

fn with_project_dir(project: &Project, environ: &Environ) -> Environ {
    let mut environ = environ.clone();
    environ.insert(
        PROJECT_DIR_VAR.to_string(),
        project.directory().to_string_lossy().into_owned(),
    );
    environ
}

/// One unsatisfied requirement as seen by a pass.
struct Pending {
    requirement: Arc<dyn Requirement>,
    status: RequirementStatus,
    provider: Option<Arc<dyn Provider>>,
}

/// What a pass found.
struct PassReport {
    satisfied: BTreeSet<String>,
    pending: Vec<Pending>,
    ready_new: Vec<usize>,
    awaiting: Vec<usize>,
}

struct Reconciler<'a> {
    project_dir: std::path::PathBuf,
    registry: &'a PluginRegistry,
    requirements: Vec<Arc<dyn Requirement>>,
    options: &'a PrepareOptions,
    state: LoopState,
    environ: Environ,
    local_state: LocalStateFile,
    overrides: UserConfigOverrides,
    /// Configuration each requirement was last provisioned with since the
    /// last submission.
    attempted: HashMap<String, BTreeMap<String, Value>>,
    provision_errors: HashMap<String, String>,
    confirmed: bool,
    provisioned_last: bool,
    previous_satisfied: BTreeSet<String>,
}

impl<'a> Reconciler<'a> {
    fn new(
        project: &Project,
        registry: &'a PluginRegistry,
        environ: &Environ,
        options: &'a PrepareOptions,
    ) -> Self {
        Self {
            project_dir: project.directory().to_path_buf(),
            registry,
            requirements: project.requirements().to_vec(),
            options,
            state: LoopState::Initial,
            environ: with_project_dir(project, environ),
            local_state: project.local_state().clone(),
            overrides: UserConfigOverrides::new(),
            attempted: HashMap::new(),
            provision_errors: HashMap::new(),
            confirmed: false,
            provisioned_last: false,
            previous_satisfied: BTreeSet::new(),
        }
    }

    fn transition(&mut self, next: LoopState) {
        tracing::debug!("prepare: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn run(&mut self, ui: &mut dyn UiChannel) -> PrepareResult {
        let interactive = ui.is_interactive() && self.options.mode.provisions();
        let mut pass = 0;

        loop {
            pass += 1;
            self.transition(LoopState::Checking);
            let report = self.check_pass();

            if report.pending.is_empty() {
                self.transition(LoopState::Satisfied);
                return self.succeed();
            }

            self.transition(LoopState::NeedsAction);
            let progressed = report.satisfied.is_superset(&self.previous_satisfied)
                && report.satisfied.len() > self.previous_satisfied.len();
            let stuck = self.provisioned_last && !progressed;
            if stuck {
                tracing::debug!("Pass {} made no progress", pass);
            }

            let next = if !self.options.mode.provisions() || pass >= self.options.max_passes {
                LoopState::Failed
            } else if interactive && !self.confirmed {
                LoopState::AwaitingInput
            } else if !stuck && !report.ready_new.is_empty() {
                LoopState::Provisioning
            } else if interactive
                && (!report.awaiting.is_empty() || self.options.keep_going_until_success)
            {
                LoopState::AwaitingInput
            } else {
                LoopState::Failed
            };

            self.previous_satisfied = report.satisfied.clone();
            self.transition(next);

            match next {
                LoopState::Provisioning => self.provision(&report),
                LoopState::AwaitingInput => {
                    let schema = self.outstanding_schema(pass, &report);
                    match ui.present(&schema) {
                        UiEvent::OverridesSubmitted(submitted) => {
                            self.overrides.merge(submitted);
                            // A submission retries every unsatisfied provider.
                            self.attempted.clear();
                            self.confirmed = true;
                            self.provisioned_last = false;
                        }
                        UiEvent::Stopped => {
                            self.transition(LoopState::Stopped);
                            return PrepareResult::stopped();
                        }
                    }
                }
                _ => return self.fail(&report),
            }
        }
    }

    fn check_pass(&self) -> PassReport {
        let mut report = PassReport {
            satisfied: BTreeSet::new(),
            pending: Vec::new(),
            ready_new: Vec::new(),
            awaiting: Vec::new(),
        };

        for requirement in &self.requirements {
            let status = requirement.check_status(
                &self.environ,
                &self.local_state,
                self.options.mode,
                &self.overrides,
            );
            tracing::debug!("{}: {}", requirement.env_var(), status.description());
            if status.is_satisfied() {
                report.satisfied.insert(requirement.env_var().to_string());
                continue;
            }

            let provider = self
                .registry
                .find_provider_by_class_name(requirement.provider_class_name());
            let index = report.pending.len();
            if let Some(provider) = &provider {
                let config = provider.read_config(
                    requirement.as_ref(),
                    &self.environ,
                    &self.local_state,
                    &self.overrides,
                );
                if !provider.blocking_options(&config).is_empty() {
                    report.awaiting.push(index);
                } else if self.attempted.get(requirement.env_var()) != Some(config.values()) {
                    report.ready_new.push(index);
                }
            }
            report.pending.push(Pending {
                requirement: requirement.clone(),
                status,
                provider,
            });
        }

        report
    }

    fn provision(&mut self, report: &PassReport) {
        for &index in &report.ready_new {
            let pending = &report.pending[index];
            let Some(provider) = &pending.provider else {
                continue;
            };
            let requirement = pending.requirement.as_ref();
            let var = requirement.env_var().to_string();
            let config = provider.read_config(
                requirement,
                &self.environ,
                &self.local_state,
                &self.overrides,
            );
            self.attempted.insert(var.clone(), config.values().clone());

            tracing::info!("Setting up {} with {}", var, provider.class_name());
            let mut ctx = ProvideContext {
                environ: &mut self.environ,
                local_state: &mut self.local_state,
                project_dir: &self.project_dir,
                mode: self.options.mode,
            };
            match provider.provide(requirement, &mut ctx, &config) {
                Ok(()) => {
                    self.provision_errors.remove(&var);
                }
                Err(e) => {
                    tracing::warn!("Failed to set up {}: {}", var, e);
                    self.provision_errors.insert(var, e.to_string());
                }
            }
        }
        self.provisioned_last = true;
    }

    fn outstanding_schema(&self, pass: usize, report: &PassReport) -> OutstandingSchema {
        let items = report
            .pending
            .iter()
            .map(|pending| {
                let requirement = pending.requirement.as_ref();
                let options = match &pending.provider {
                    Some(provider) => {
                        let config = provider.read_config(
                            requirement,
                            &self.environ,
                            &self.local_state,
                            &self.overrides,
                        );
                        provider
                            .option_schema(requirement, &self.environ)
                            .into_iter()
                            .map(|option| OptionState {
                                value: config.get(&option.name).cloned(),
                                missing: config.is_missing(&option.name),
                                name: option.name,
                                label: option.label,
                                default: option.default,
                                choices: option.choices,
                            })
                            .collect()
                    }
                    None => Vec::new(),
                };
                OutstandingItem {
                    requirement: requirement.env_var().to_string(),
                    title: requirement.title().to_string(),
                    provider: requirement.provider_class_name().to_string(),
                    status_description: self.describe(pending),
                    options,
                }
            })
            .collect();

        OutstandingSchema { pass, items }
    }

    fn describe(&self, pending: &Pending) -> String {
        let var = pending.requirement.env_var();
        if pending.provider.is_none() {
            return format!(
                "No provider {} is available for {}.",
                pending.requirement.provider_class_name(),
                var
            );
        }
        self.provision_errors
            .get(var)
            .cloned()
            .unwrap_or_else(|| pending.status.description().to_string())
    }

    fn succeed(&mut self) -> PrepareResult {
        let mut environ = self.environ.clone();
        for requirement in &self.requirements {
            requirement.contribute(&mut environ);
        }
        PrepareResult::Success { environ }
    }

    fn fail(&self, report: &PassReport) -> PrepareResult {
        let errors = report.pending.iter().map(|p| self.describe(p)).collect();
        PrepareResult::failed(errors)
    }

    /// The local state to keep after the run.
    ///
    /// Provider bookkeeping is always kept. Submitted options are recorded
    /// only when they led to success.
    fn into_local_state(mut self, result: &PrepareResult) -> LocalStateFile {
        if result.is_success() {
            for (var, values) in self.overrides.iter() {
                let Some(requirement) = self.requirements.iter().find(|r| r.env_var() == var)
                else {
                    continue;
                };
                for (option, value) in values {
                    self.local_state.set_provider_option(
                        var,
                        requirement.provider_class_name(),
                        option,
                        value.clone(),
                    );
                }
            }
        }
        self.local_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::PROJECT_FILENAME;
    use crate::tools::fake::fake_tools;
    use crate::ui::{HeadlessUi, ScriptedUi};
    use std::fs;
    use tempfile::TempDir;

    fn project(yaml: &str) -> (TempDir, Project, PluginRegistry) {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(PROJECT_FILENAME), yaml).unwrap();
        let registry = PluginRegistry::with_tools(fake_tools());
        let project = Project::load(temp.path(), &registry).unwrap();
        (temp, project, registry)
    }

    #[test]
    fn empty_project_succeeds_with_project_dir() {
        let (temp, mut project, registry) = project("");
        let result = prepare(
            &mut project,
            &registry,
            &Environ::new(),
            &mut HeadlessUi::new(),
            &PrepareOptions::default(),
        )
        .unwrap();
        assert!(result.is_success());
        assert_eq!(
            result.environ().unwrap()[PROJECT_DIR_VAR],
            temp.path().to_string_lossy()
        );
    }

    #[test]
    fn problems_fail_without_running() {
        let (_temp, mut project, registry) = project("downloads:\n  FOO: {}\n");
        let result = prepare(
            &mut project,
            &registry,
            &Environ::new(),
            &mut HeadlessUi::new(),
            &PrepareOptions::default(),
        )
        .unwrap();
        assert_eq!(
            result.errors(),
            ["Download item FOO doesn't contain a 'url' field."]
        );
    }

    #[test]
    fn headless_runtime_variable_default_is_applied() {
        let (_temp, mut project, registry) = project("runtime:\n  FOO: bar\n");
        let result = prepare(
            &mut project,
            &registry,
            &Environ::new(),
            &mut HeadlessUi::new(),
            &PrepareOptions::default(),
        )
        .unwrap();
        assert_eq!(result.environ().unwrap()["FOO"], "bar");
    }

    #[test]
    fn headless_missing_runtime_variable_fails() {
        let (_temp, mut project, registry) = project("runtime: [FOO, BAR]\n");
        let result = prepare(
            &mut project,
            &registry,
            &Environ::new(),
            &mut HeadlessUi::new(),
            &PrepareOptions::default(),
        )
        .unwrap();
        assert!(!result.was_stopped());
        assert_eq!(
            result.errors(),
            [
                "Environment variable FOO is not set.",
                "Environment variable BAR is not set."
            ]
        );
    }

    #[test]
    fn caller_environment_satisfies_runtime_variable() {
        let (_temp, mut project, registry) = project("runtime: [FOO]\n");
        let mut environ = Environ::new();
        environ.insert("FOO".into(), "from-shell".into());
        let result = prepare(
            &mut project,
            &registry,
            &environ,
            &mut HeadlessUi::new(),
            &PrepareOptions::default(),
        )
        .unwrap();
        assert_eq!(result.environ().unwrap()["FOO"], "from-shell");
    }

    #[test]
    fn interactive_runs_confirm_before_provisioning() {
        let (_temp, mut project, registry) = project("runtime:\n  FOO: bar\n");
        let mut ui = ScriptedUi::new().then_accept();
        let result = prepare(
            &mut project,
            &registry,
            &Environ::new(),
            &mut ui,
            &PrepareOptions::default(),
        )
        .unwrap();
        assert!(result.is_success());
        assert_eq!(ui.presented().len(), 1);
        assert_eq!(ui.presented()[0].pass, 1);
        assert_eq!(ui.result(), Some(&result));
    }

    #[test]
    fn interactive_stop_is_a_single_error() {
        let (_temp, mut project, registry) = project("runtime: [FOO, BAR]\n");
        let mut ui = ScriptedUi::new().then_stop();
        let result = prepare(
            &mut project,
            &registry,
            &Environ::new(),
            &mut ui,
            &PrepareOptions::default(),
        )
        .unwrap();
        assert!(result.was_stopped());
        assert_eq!(result.errors(), ["Browser UI main loop was stopped."]);
    }

    #[test]
    fn check_mode_never_negotiates() {
        let (_temp, mut project, registry) = project("runtime:\n  FOO: bar\n");
        let mut ui = ScriptedUi::new().then_accept();
        let result = prepare(
            &mut project,
            &registry,
            &Environ::new(),
            &mut ui,
            &PrepareOptions::check(),
        )
        .unwrap();
        assert_eq!(result.errors(), ["Environment variable FOO is not set."]);
        assert!(ui.presented().is_empty());
    }

    #[test]
    fn max_passes_bounds_negotiation() {
        let (_temp, mut project, registry) = project("runtime: [FOO]\n");
        let mut ui = ScriptedUi::new();
        for _ in 0..10 {
            ui = ui.then_accept();
        }
        let options = PrepareOptions {
            max_passes: 3,
            ..PrepareOptions::default()
        };
        let result = prepare(&mut project, &registry, &Environ::new(), &mut ui, &options).unwrap();
        assert!(!result.was_stopped());
        assert_eq!(ui.presented().len(), 2);
    }

    #[test]
    fn unresolved_options_are_flagged_without_blocking() {
        let (_temp, mut project, registry) = project("downloads:\n  DATA: http://x/d.csv\n");
        let mut ui = ScriptedUi::new().then_stop();
        prepare(
            &mut project,
            &registry,
            &Environ::new(),
            &mut ui,
            &PrepareOptions::default(),
        )
        .unwrap();

        let item = ui.presented()[0].find("DATA").unwrap();
        let source = item.options.iter().find(|o| o.name == "source").unwrap();
        let value = item.options.iter().find(|o| o.name == "value").unwrap();
        assert_eq!(source.value, Some(Value::from("download")));
        assert!(!source.missing);
        assert!(value.missing);

        // The same configuration is still ready to provision headless.
        let result = prepare(
            &mut project,
            &registry,
            &Environ::new(),
            &mut HeadlessUi::new(),
            &PrepareOptions::default(),
        )
        .unwrap();
        assert_eq!(result.errors(), ["Failed to download http://x/d.csv: HTTP 404 Not Found"]);
    }

    #[test]
    fn check_statuses_reports_every_requirement() {
        let (_temp, project, _registry) = project("runtime: [FOO]\ndownloads:\n  DATA: http://x/d.csv\n");
        let mut environ = Environ::new();
        environ.insert("FOO".into(), "1".into());
        let reports = check_statuses(&project, &environ);
        assert_eq!(reports.len(), 2);
        assert!(reports[0].status.is_satisfied());
        assert_eq!(reports[1].provider, "DownloadProvider");
        assert!(!reports[1].status.is_satisfied());
    }
}
