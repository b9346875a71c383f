//! Template-based answer drafts.
//!
//! A template is keyed by task type and attack plan and names the variables it
//! uses. Variables are resolved from the jump targets and the project context;
//! anything that cannot be resolved renders as [`UNKNOWN_MARKER`].

use context_indexer::ProjectContext;
use context_protocol::JumpTarget;
use context_search::{AttackPlan, TaskType};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeSet;

pub const UNKNOWN_MARKER: &str = "[unknown]";

const MAX_LISTED: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct AnswerTemplate {
    pub task: TaskType,
    pub plan: AttackPlan,
    pub pattern: &'static str,
    pub variables: &'static [&'static str],
}

const fn template(
    task: TaskType,
    plan: AttackPlan,
    pattern: &'static str,
    variables: &'static [&'static str],
) -> AnswerTemplate {
    AnswerTemplate {
        task,
        plan,
        pattern,
        variables,
    }
}

pub const TEMPLATES: &[AnswerTemplate] = &[
    template(
        TaskType::Understand,
        AttackPlan::InitReadWrite,
        "The project stores data with {engine}. The connection is set up by {initializer}. \
         Writes go through {writes}; reads go through {reads}. Configuration comes from {envKeys}. \
         Initialization is triggered by {triggers}. Related tests: {tests}.",
        &["engine", "initializer", "writes", "reads", "envKeys", "triggers", "tests"],
    ),
    template(
        TaskType::Understand,
        AttackPlan::ApiRoute,
        "The {framework} API exposes {routeCount} routes declared in {routeFiles}. \
         Requests are handled by {handlers}, behind {middleware}. Start reading at {topTarget}.",
        &["framework", "routeCount", "routeFiles", "handlers", "middleware", "topTarget"],
    ),
    template(
        TaskType::Understand,
        AttackPlan::Auth,
        "Authentication uses {authProvider}. The entry point is {authEntry}; session state \
         lives in {sessionSymbols}, guarded by {middleware}. Relevant configuration: {envKeys}.",
        &["authProvider", "authEntry", "sessionSymbols", "middleware", "envKeys"],
    ),
    template(
        TaskType::Understand,
        AttackPlan::ErrorDriven,
        "Errors surface at {errorSites}. Error types defined here: {errorTypes}. \
         They are reported through {reporters}. Start with {topTarget}.",
        &["errorSites", "errorTypes", "reporters", "topTarget"],
    ),
    template(
        TaskType::Debug,
        AttackPlan::InitReadWrite,
        "To debug storage on {engine}, check {initializer} first, then the write path \
         ({writes}) and the read path ({reads}). Verify {envKeys} are set. \
         Initialization is triggered by {triggers}.",
        &["engine", "initializer", "writes", "reads", "envKeys", "triggers"],
    ),
    template(
        TaskType::Debug,
        AttackPlan::ApiRoute,
        "To debug a {framework} route, start at {topTarget}, then check handlers {handlers} \
         and middleware {middleware}. Routes are declared in {routeFiles}.",
        &["framework", "topTarget", "handlers", "middleware", "routeFiles"],
    ),
    template(
        TaskType::Debug,
        AttackPlan::Auth,
        "To debug authentication ({authProvider}), step through {authEntry}, inspect \
         {sessionSymbols} and check {envKeys}.",
        &["authProvider", "authEntry", "sessionSymbols", "envKeys"],
    ),
    template(
        TaskType::Debug,
        AttackPlan::ErrorDriven,
        "Start at {topTarget}. Errors are raised at {errorSites} ({errorTypes}) and reported \
         through {reporters}. Reproduce with {tests}.",
        &["topTarget", "errorSites", "errorTypes", "reporters", "tests"],
    ),
    template(
        TaskType::Implement,
        AttackPlan::InitReadWrite,
        "New persistence code should reuse the {engine} connection from {initializer} and \
         follow {writes} for writes and {reads} for reads. Add tests next to {tests}.",
        &["engine", "initializer", "writes", "reads", "tests"],
    ),
    template(
        TaskType::Implement,
        AttackPlan::ApiRoute,
        "Add the endpoint next to {routeFiles} ({routeCount} existing routes on {framework}). \
         Model the handler on {handlers} and register {middleware} where needed.",
        &["routeFiles", "routeCount", "framework", "handlers", "middleware"],
    ),
    template(
        TaskType::Implement,
        AttackPlan::Auth,
        "Build on {authProvider}: hook into {authEntry}, reuse {sessionSymbols} and protect \
         routes with {middleware}. Required configuration: {envKeys}.",
        &["authProvider", "authEntry", "sessionSymbols", "middleware", "envKeys"],
    ),
    template(
        TaskType::Review,
        AttackPlan::Auth,
        "Review {authEntry} and {middleware} for missing checks, confirm {sessionSymbols} are \
         validated, and keep {envKeys} out of client code.",
        &["authEntry", "middleware", "sessionSymbols", "envKeys"],
    ),
    template(
        TaskType::Review,
        AttackPlan::ErrorDriven,
        "Review error handling at {errorSites}: {errorTypes} should be caught and reported \
         through {reporters}. Covered by {tests}.",
        &["errorSites", "errorTypes", "reporters", "tests"],
    ),
];

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(\w+)\}").expect("placeholder regex"));
static AUTH_WORDING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(auth|login|signin|sign_in|session)").expect("auth regex"));
static SESSION_WORDING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(session|token|jwt|cookie|user)").expect("session regex"));
static ERROR_WORDING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(error|exception|catch|throw|fail|panic)").expect("error regex"));
static ERROR_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]\w*(Error|Exception|Fault)$").expect("error type regex"));
static REPORTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(logger|log(error|exception)|report|sentry|capture|notify|track)")
        .expect("reporter regex")
});
static TEST_FILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)((^|/)(tests?|__tests__)/|[._](test|spec)\.|(^|/)test_[^/]+\.py$)")
        .expect("test file regex")
});

#[must_use]
pub fn find_template(task: TaskType, plan: AttackPlan) -> Option<&'static AnswerTemplate> {
    TEMPLATES
        .iter()
        .find(|template| template.task == task && template.plan == plan)
}

/// What a draft can draw on.
pub struct AnswerInputs<'a> {
    pub targets: &'a [JumpTarget],
    pub context: &'a ProjectContext,
}

impl AnswerInputs<'_> {
    /// Value for one template variable, `None` when nothing backs it.
    pub fn resolve(&self, variable: &str) -> Option<String> {
        match variable {
            "engine" => self.context.systems.database.clone(),
            "framework" => self.context.systems.framework.clone(),
            "authProvider" => self.context.systems.auth.clone(),
            "initializer" => self.with_role("initialization").next().map(locate),
            "writes" => list(self.with_role("write operation").map(|t| t.symbol.clone())),
            "reads" => list(self.with_role("read operation").map(|t| t.symbol.clone())),
            "handlers" => list(self.with_role("request handler").map(|t| t.symbol.clone())),
            "middleware" => list(
                self.with_role("middleware")
                    .map(|t| t.symbol.clone())
                    .chain(self.export_names(|name| name.to_lowercase().contains("middleware"))),
            ),
            "envKeys" => list(self.context.env_keys()),
            "triggers" => self.triggers(),
            "tests" => self.tests(),
            "routeFiles" => list(self.context.routes.iter().map(|route| route.file.clone())),
            "routeCount" => Some(self.context.routes.len().to_string()),
            "authEntry" => self
                .targets
                .iter()
                .find(|t| AUTH_WORDING.is_match(&t.symbol) || AUTH_WORDING.is_match(&t.file))
                .map(locate),
            "sessionSymbols" => list(
                self.targets
                    .iter()
                    .filter(|t| SESSION_WORDING.is_match(&t.symbol))
                    .map(|t| t.symbol.clone())
                    .chain(self.export_names(|name| SESSION_WORDING.is_match(name))),
            ),
            "errorSites" => list(
                self.targets
                    .iter()
                    .filter(|t| ERROR_WORDING.is_match(&t.symbol) || ERROR_WORDING.is_match(&t.file))
                    .map(|t| match t.start {
                        Some(line) => format!("{}:{line}", t.file),
                        None => t.file.clone(),
                    }),
            ),
            "errorTypes" => list(self.export_names(|name| ERROR_TYPE.is_match(name))),
            "reporters" => list(
                self.targets
                    .iter()
                    .filter(|t| REPORTER.is_match(&t.symbol))
                    .map(|t| t.symbol.clone())
                    .chain(self.export_names(|name| REPORTER.is_match(name))),
            ),
            "topTarget" => self.targets.first().map(locate),
            _ => None,
        }
    }

    fn with_role<'b>(&'b self, role: &'b str) -> impl Iterator<Item = &'b JumpTarget> + 'b {
        self.targets.iter().filter(move |t| t.role == role)
    }

    fn export_names<'b>(
        &'b self,
        pred: impl Fn(&str) -> bool + 'b,
    ) -> impl Iterator<Item = String> + 'b {
        self.context
            .exports
            .iter()
            .filter(move |export| pred(&export.name))
            .map(|export| export.name.clone())
    }

    /// Callers of the initializer when a call graph exists, otherwise request handlers.
    fn triggers(&self) -> Option<String> {
        let initializer = self.with_role("initialization").next()?;
        let from_graph = self
            .context
            .call_graph
            .as_ref()
            .map(|graph| graph.callers(&initializer.symbol))
            .unwrap_or_default()
            .into_iter()
            .map(str::to_string);
        list(from_graph).or_else(|| {
            list(self.with_role("request handler").map(|t| t.symbol.clone()))
        })
    }

    /// Test files named after a target file's stem.
    fn tests(&self) -> Option<String> {
        let stems: BTreeSet<String> = self
            .targets
            .iter()
            .filter_map(|t| file_stem(&t.file))
            .filter(|stem| stem.len() > 2)
            .collect();
        list(
            self.context
                .files
                .iter()
                .filter(|file| TEST_FILE.is_match(file))
                .filter(|file| {
                    let lowered = file.to_lowercase();
                    stems.iter().any(|stem| lowered.contains(stem.as_str()))
                })
                .cloned(),
        )
    }
}

fn file_stem(file: &str) -> Option<String> {
    let name = file.rsplit('/').next()?;
    let stem = name.split('.').next()?;
    Some(stem.to_lowercase())
}

fn locate(target: &JumpTarget) -> String {
    match target.start {
        Some(line) => format!("{} ({}:{line})", target.symbol, target.file),
        None => format!("{} ({})", target.symbol, target.file),
    }
}

/// First few distinct values joined with commas, `None` when empty.
fn list(values: impl IntoIterator<Item = String>) -> Option<String> {
    let mut seen = BTreeSet::new();
    let picked: Vec<String> = values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .take(MAX_LISTED)
        .collect();
    if picked.is_empty() {
        None
    } else {
        Some(picked.join(", "))
    }
}

/// Fill `template`; placeholders it does not declare or that do not resolve
/// become [`UNKNOWN_MARKER`].
#[must_use]
pub fn render_template(template: &AnswerTemplate, inputs: &AnswerInputs<'_>) -> String {
    PLACEHOLDER
        .replace_all(template.pattern, |caps: &Captures<'_>| {
            let name = &caps[1];
            template
                .variables
                .contains(&name)
                .then(|| inputs.resolve(name))
                .flatten()
                .unwrap_or_else(|| UNKNOWN_MARKER.to_string())
        })
        .into_owned()
}

/// Draft for `(task, plan)`, or a fixed fallback naming both when no template exists.
#[must_use]
pub fn draft_answer(task: TaskType, plan: AttackPlan, inputs: &AnswerInputs<'_>) -> String {
    if let Some(template) = find_template(task, plan) {
        return render_template(template, inputs);
    }
    log::debug!("No answer template for {task}/{plan}");
    let next = match inputs.targets.first() {
        Some(target) => format!("Start with {}.", locate(target)),
        None => "No jump targets were found; refine the query.".to_string(),
    };
    format!("No answer template for task '{task}' and plan '{plan}'. {next}")
}
