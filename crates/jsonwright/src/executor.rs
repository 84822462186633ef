//! Action interpreter.
//!
//! Every operation key of an action is an independent step; steps run in a
//! fixed order and several may share one action:
//!
//! route, run, exist, forEach, getText, typeSlow/type, click, hover, press,
//! check, uncheck, select, upload, expectText, expectVisible, expectValue,
//! expectUrl, waitRequest, waitResponse, wait, scrollTo, screenshot.
//!
//! `run` executes on the raw template so its result can feed interpolation
//! of the same action. An `exist` miss ends the action without failing it.

use crate::context::{ContextView, LocatorContext};
use crate::driver::{BrowserDriver, ClickOptions, PageScroll, ScrollBehavior, SelectOption};
use crate::dynamic::DynamicResolver;
use crate::expect::{Expect, ExpectOptions};
use crate::functions::FunctionBag;
use crate::interpolate::{interpolate_value, VariableBag};
use crate::locator::{self, count_matches, make_locator, Locator};
use crate::network::{MockResponse, ResponseMatcher, RouteAction, RouteRule};
use crate::result::{JsonwrightError, JsonwrightResult, Stage};
use crate::schema::{
    Action, CaseContext, CheckTarget, ForEachSpec, OneOrMany, RouteSpec, ScreenshotSpec,
    ScrollSpec, SelectSpec, TextExpectation, UploadSpec, VisibleExpectation, WaitRequestSpec, WaitResponseSpec,
};
use futures::future::BoxFuture;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default `waitRequest` timeout
pub const DEFAULT_WAIT_REQUEST_TIMEOUT_MS: u64 = 50_000;

/// Default `waitResponse` timeout
pub const DEFAULT_WAIT_RESPONSE_TIMEOUT_MS: u64 = 30_000;

/// Default delay between characters for `typeSlow`
pub const DEFAULT_SLOW_TYPE_DELAY_MS: u64 = 300;

/// Bag key holding the latest `run` result
pub const RESULT_FUNC_KEY: &str = "resultFunc";

/// Bag key holding the latest typed text
pub const LAST_TYPED_TEXT_KEY: &str = "lastTypedText";

/// Bag key holding the latest captured text
pub const LAST_GET_TEXT_KEY: &str = "lastGetText";

/// Per-case record of typed and captured text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Memo {
    /// Text written by the latest `type`/`typeSlow`
    pub last_typed_text: Option<String>,
    /// Text read by the latest `getText`
    pub last_get_text: Option<String>,
}

/// Executor tuning
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    /// Delay between characters for `typeSlow`
    pub slow_type_delay: Duration,
    /// Defaults for `expect*`
    pub expect: ExpectOptions,
    /// `waitRequest` timeout when none is given
    pub wait_request_timeout_ms: u64,
    /// `waitResponse` timeout when none is given
    pub wait_response_timeout_ms: u64,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            slow_type_delay: Duration::from_millis(DEFAULT_SLOW_TYPE_DELAY_MS),
            expect: ExpectOptions::default(),
            wait_request_timeout_ms: DEFAULT_WAIT_REQUEST_TIMEOUT_MS,
            wait_response_timeout_ms: DEFAULT_WAIT_RESPONSE_TIMEOUT_MS,
        }
    }
}

/// Split `"<prefix> {type}"`; `None` when the placeholder is absent.
fn typed_placeholder(click: &str) -> Option<&str> {
    click.strip_suffix("{type}").map(str::trim)
}

/// Interpolate an action, leaving nested `forEach` actions for their own turn.
fn interpolate_action(raw: &Value, bag: &VariableBag) -> Value {
    let mut out = interpolate_value(raw, bag);
    if let (Some(nested), Some(for_each)) = (
        raw.pointer("/forEach/actions"),
        out.get_mut("forEach").and_then(Value::as_object_mut),
    ) {
        for_each.insert("actions".to_string(), nested.clone());
    }
    out
}

fn non_empty(s: &str) -> Option<&str> {
    let t = s.trim();
    (!t.is_empty()).then_some(t)
}

/// Runs actions for one case against one driver
pub struct Executor<'a> {
    driver: &'a dyn BrowserDriver,
    dynamic: &'a DynamicResolver,
    settings: &'a ExecutorSettings,
    functions: Option<&'a dyn FunctionBag>,
    case_context: Option<&'a CaseContext>,
    base_dir: PathBuf,
}

impl std::fmt::Debug for Executor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("settings", self.settings)
            .field("has_functions", &self.functions.is_some())
            .field("base_dir", &self.base_dir)
            .finish_non_exhaustive()
    }
}

impl<'a> Executor<'a> {
    /// Create an executor
    #[must_use]
    pub fn new(
        driver: &'a dyn BrowserDriver,
        dynamic: &'a DynamicResolver,
        settings: &'a ExecutorSettings,
    ) -> Self {
        Self {
            driver,
            dynamic,
            settings,
            functions: None,
            case_context: None,
            base_dir: PathBuf::from("."),
        }
    }

    /// Attach a function bag for `run`
    #[must_use]
    pub fn with_functions(mut self, functions: Option<&'a dyn FunctionBag>) -> Self {
        self.functions = functions;
        self
    }

    /// Case-level context defaults
    #[must_use]
    pub fn with_case_context(mut self, context: Option<&'a CaseContext>) -> Self {
        self.case_context = context;
        self
    }

    /// Directory relative upload paths are resolved against
    #[must_use]
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    fn case_locator(&self) -> Option<&'a LocatorContext> {
        self.case_context.map(|c| &c.locator)
    }

    fn expect(&self, timeout_ms: Option<u64>) -> Expect<'a> {
        Expect::new(self.driver, self.settings.expect.with_timeout_opt(timeout_ms))
    }

    /// Execute one action template.
    ///
    /// `base` scopes every target to a `forEach` item.
    pub fn execute<'b>(
        &'b self,
        raw: &'b Value,
        bag: &'b mut VariableBag,
        memo: &'b mut Memo,
        base: Option<&'b Locator>,
    ) -> BoxFuture<'b, JsonwrightResult<()>> {
        Box::pin(self.execute_action(raw, bag, memo, base))
    }

    async fn execute_action(
        &self,
        raw: &Value,
        bag: &mut VariableBag,
        memo: &mut Memo,
        base: Option<&Locator>,
    ) -> JsonwrightResult<()> {
        let Some(obj) = raw.as_object() else {
            return Err(JsonwrightError::config(format!(
                "action must be an object, got {raw}"
            )));
        };
        if !Action::has_operation(obj) {
            debug!(keys = ?obj.keys().collect::<Vec<_>>(), "action has no operation, skipping");
            return Ok(());
        }

        if let Some(route) = obj.get("route") {
            let spec: RouteSpec = serde_json::from_value(interpolate_value(route, bag))
                .map_err(|e| JsonwrightError::config(format!("invalid route: {e}")))?;
            self.route(spec).await?;
        }

        if let Some(run) = obj.get("run") {
            self.run_function(run, obj.get("as"), bag).await?;
            if obj.keys().all(|k| k == "run" || k == "as") {
                return Ok(());
            }
        }

        let action = Action::from_value(interpolate_action(raw, bag))?;
        let view = ContextView::new(&action.context, self.case_locator());
        view.index_strategy()?;
        let scope = crate::scope::build_scope(self.driver, &view, base).await?;

        if let Some(target) = &action.exist {
            let probe = make_locator(&scope, target.trim(), &view, true)?;
            if count_matches(self.driver, &probe).await == 0 {
                info!(target = target.trim(), "exist gate: no match, skipping rest of action");
                return Ok(());
            }
        }

        if let Some(for_each) = &action.for_each {
            self.for_each(for_each, &scope, &view, bag, memo).await?;
        }
        if let Some(target) = &action.get_text {
            self.get_text(target, &scope, &view, bag, memo).await?;
        }
        self.type_text(&action, &scope, &view, bag, memo).await?;
        if let Some(click) = &action.click {
            self.click(click, &scope, &view, memo).await?;
        }
        if let Some(target) = &action.hover {
            debug!(step = "hover", target = %target, "executing");
            let loc = self.locate(&scope, target.trim(), &view).await?;
            self.driver.hover(&loc).await?;
        }
        if let Some(key) = &action.press {
            self.press(key, &action, &scope, &view).await?;
        }
        if let Some(check) = &action.check {
            self.set_checked(check, true, &action, &scope, &view).await?;
        }
        if let Some(uncheck) = &action.uncheck {
            self.set_checked(uncheck, false, &action, &scope, &view).await?;
        }
        if let Some(select) = &action.select {
            self.select(select, &action, &scope, &view).await?;
        }
        if let Some(upload) = &action.upload {
            self.upload(upload, &action, &scope, &view).await?;
        }
        if let Some(et) = &action.expect_text {
            self.expect_text(et, &action, &scope, &view).await?;
        }
        if let Some(ev) = &action.expect_visible {
            self.expect_visible(ev, &action, &scope, &view).await?;
        }
        if let Some(ev) = &action.expect_value {
            let target = ev.loc.as_deref().and_then(non_empty).ok_or_else(|| {
                JsonwrightError::missing_target("expectValue", "needs { loc, equals|contains }")
            })?;
            if ev.equals.is_none() && ev.contains.is_none() {
                return Err(JsonwrightError::config(
                    "expectValue requires either 'equals' or 'contains'",
                ));
            }
            let loc = self.locate(&scope, target, &view).await?;
            let expect = self.expect(ev.timeout);
            match (&ev.equals, &ev.contains) {
                (Some(equals), _) => expect.to_have_value(&loc, equals).await?,
                (None, Some(contains)) => expect.to_contain_value(&loc, contains).await?,
                (None, None) => {}
            }
        }
        if let Some(eu) = &action.expect_url {
            let expect = self.expect(eu.timeout);
            match (&eu.equals, &eu.contains) {
                (Some(equals), _) => expect.url_to_be(equals).await?,
                (None, Some(contains)) => expect.url_to_contain(contains).await?,
                (None, None) => {
                    return Err(JsonwrightError::config(
                        "expectUrl needs one of: { equals | contains }",
                    ))
                }
            }
        }
        if let Some(wr) = &action.wait_request {
            self.wait_request(wr).await?;
        }
        if let Some(wr) = &action.wait_response {
            self.wait_response(wr).await?;
        }
        if let Some(ms) = action.wait.filter(|ms| *ms > 0) {
            debug!(step = "wait", ms, "executing");
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        if let Some(scroll) = &action.scroll_to {
            self.scroll_to(scroll, &scope, &view).await?;
        }
        if let Some(shot) = &action.screenshot {
            self.screenshot(shot, &action, &scope, &view).await?;
        }
        Ok(())
    }

    async fn locate(
        &self,
        scope: &Locator,
        raw: &str,
        view: &ContextView<'_>,
    ) -> JsonwrightResult<Locator> {
        locator::locate(self.driver, scope, raw, view).await
    }

    async fn route(&self, spec: RouteSpec) -> JsonwrightResult<()> {
        let mut applied = false;
        if let Some(patterns) = &spec.unroute {
            for pattern in patterns.to_vec() {
                self.driver.unroute(&pattern).await?;
            }
            applied = true;
        }
        if let Some(patterns) = &spec.abort {
            let reason = spec.reason.unwrap_or_default();
            for pattern in patterns.to_vec() {
                debug!(step = "route", pattern = %pattern, reason = reason.message(), "blocking");
                self.driver
                    .route(RouteRule::new(&pattern, RouteAction::Abort(reason))?)
                    .await?;
            }
            applied = true;
        }
        if let Some(url) = &spec.url {
            let mut response = match (&spec.json, &spec.body) {
                (Some(json), _) => MockResponse::json(json)?,
                (None, Some(body)) => MockResponse::text(body),
                (None, None) => MockResponse::new(),
            };
            if let Some(status) = spec.status {
                response = response.with_status(status);
            }
            if let Some(content_type) = &spec.content_type {
                response = response.with_content_type(content_type);
            }
            for (key, value) in &spec.headers {
                response = response.with_header(key, value);
            }
            debug!(step = "route", pattern = %url, status = response.status, "fulfilling");
            self.driver
                .route(RouteRule::new(url, RouteAction::Fulfill(response))?)
                .await?;
            applied = true;
        }
        if applied {
            Ok(())
        } else {
            Err(JsonwrightError::config(
                "route needs one of: unroute, abort, url",
            ))
        }
    }

    async fn run_function(
        &self,
        run: &Value,
        alias: Option<&Value>,
        bag: &mut VariableBag,
    ) -> JsonwrightResult<()> {
        let functions = self.functions.ok_or_else(|| JsonwrightError::FunctionBag {
            message: "this action uses \"run\" but no function bag was loaded; \
                      create help/plugin-func.yaml or pass a functions path"
                .to_string(),
        })?;
        let name = run
            .as_str()
            .and_then(non_empty)
            .ok_or_else(|| JsonwrightError::config(format!("run needs a function name, got {run}")))?;
        if !functions.has(name) {
            return Err(JsonwrightError::UnknownFunction {
                name: name.to_string(),
            });
        }
        let result = functions.call(name).await?;
        let key = alias
            .and_then(Value::as_str)
            .and_then(non_empty)
            .unwrap_or(RESULT_FUNC_KEY);
        debug!(step = "run", function = name, key, "stored function result");
        if key != RESULT_FUNC_KEY {
            bag.set(RESULT_FUNC_KEY, result.clone());
        }
        bag.set(key, result);
        Ok(())
    }

    async fn for_each(
        &self,
        spec: &ForEachSpec,
        scope: &Locator,
        view: &ContextView<'_>,
        bag: &mut VariableBag,
        memo: &Memo,
    ) -> JsonwrightResult<()> {
        let items = spec
            .items
            .as_deref()
            .and_then(non_empty)
            .ok_or_else(|| JsonwrightError::missing_target("forEach", "needs \"items\" selector or text"))?;
        let all = locator::locate_all(self.driver, scope, items, view, Stage::Items).await?;
        let count = self.driver.count(&all).await?;
        info!(items, count, "forEach");
        for i in 0..count {
            let item = all.clone().nth(i64::try_from(i).unwrap_or(i64::MAX));
            if let Err(err) = self.driver.scroll_into_view(&item).await {
                warn!(item = i, error = %err, "forEach: scroll into view failed");
            }
            let mut item_memo = memo.clone();
            for sub in &spec.actions {
                self.execute(sub, bag, &mut item_memo, Some(&item)).await?;
            }
        }
        Ok(())
    }

    async fn get_text(
        &self,
        target: &str,
        scope: &Locator,
        view: &ContextView<'_>,
        bag: &mut VariableBag,
        memo: &mut Memo,
    ) -> JsonwrightResult<()> {
        let loc = self.locate(scope, target.trim(), view).await?;
        let text = self.driver.text_content(&loc).await?;
        debug!(step = "getText", target = target.trim(), text = ?text, "captured");
        bag.set(LAST_GET_TEXT_KEY, text.clone().map_or(Value::Null, Value::String));
        memo.last_get_text = text;
        Ok(())
    }

    async fn type_text(
        &self,
        action: &Action,
        scope: &Locator,
        view: &ContextView<'_>,
        bag: &mut VariableBag,
        memo: &mut Memo,
    ) -> JsonwrightResult<()> {
        let (raw, slow) = match (&action.type_slow, &action.type_text) {
            (Some(text), _) => (text, true),
            (None, Some(text)) => (text, false),
            (None, None) => return Ok(()),
        };
        let operation = if slow { "typeSlow" } else { "type" };
        let text = self.dynamic.resolve(raw).await?;
        let target = action.explicit_target().ok_or_else(|| {
            JsonwrightError::missing_target(operation, "use \"loc\" or a selector in \"click\"")
        })?;
        let loc = self.locate(scope, target, view).await?;
        debug!(step = operation, target, "executing");
        if slow {
            self.driver.fill(&loc, "").await?;
            self.driver
                .type_text(&loc, &text, self.settings.slow_type_delay)
                .await?;
        } else {
            self.driver.fill(&loc, &text).await?;
        }
        bag.set(LAST_TYPED_TEXT_KEY, text.clone());
        memo.last_typed_text = Some(text);
        Ok(())
    }

    async fn click(
        &self,
        raw: &str,
        scope: &Locator,
        view: &ContextView<'_>,
        memo: &Memo,
    ) -> JsonwrightResult<()> {
        let click = raw.trim();
        let loc = match typed_placeholder(click) {
            Some(prefix) => {
                let typed = memo
                    .last_typed_text
                    .as_deref()
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| {
                        JsonwrightError::missing_target(
                            "click",
                            format!("\"{click}\" used but no prior typed text"),
                        )
                    })?;
                if prefix.is_empty() {
                    self.locate(scope, typed, view).await?
                } else {
                    let container = make_locator(scope, prefix, view, true)?;
                    let loc = container.text(typed).indexed(view.index_strategy()?);
                    locator::ensure_found(
                        self.driver,
                        &loc,
                        Stage::Target,
                        &format!("{prefix} {typed}"),
                        &view.describe(),
                    )
                    .await?;
                    loc
                }
            }
            None => self.locate(scope, click, view).await?,
        };
        debug!(step = "click", locator = %loc, "executing");
        if let Err(err) = self.driver.click(&loc, ClickOptions::default()).await {
            warn!(locator = %loc, error = %err, "click failed, retrying with force");
            self.driver.click(&loc, ClickOptions::forced()).await?;
        }
        Ok(())
    }

    async fn press(
        &self,
        key: &str,
        action: &Action,
        scope: &Locator,
        view: &ContextView<'_>,
    ) -> JsonwrightResult<()> {
        debug!(step = "press", key, "executing");
        match action.explicit_target() {
            Some(target) => {
                let loc = self.locate(scope, target, view).await?;
                self.driver.press(Some(&loc), key).await
            }
            None => self.driver.press(None, key).await,
        }
    }

    async fn set_checked(
        &self,
        spec: &CheckTarget,
        checked: bool,
        action: &Action,
        scope: &Locator,
        view: &ContextView<'_>,
    ) -> JsonwrightResult<()> {
        let operation = if checked { "check" } else { "uncheck" };
        let target = spec
            .target()
            .or_else(|| action.explicit_target())
            .or_else(|| self.case_context.and_then(CaseContext::legacy_target))
            .ok_or_else(|| {
                JsonwrightError::missing_target(operation, "use loc or a selector in click")
            })?;
        let loc = self.locate(scope, target, view).await?;
        debug!(step = operation, target, "executing");
        self.driver.set_checked(&loc, checked).await
    }

    async fn select(
        &self,
        spec: &SelectSpec,
        action: &Action,
        scope: &Locator,
        view: &ContextView<'_>,
    ) -> JsonwrightResult<()> {
        let target = spec
            .loc
            .as_deref()
            .or_else(|| action.explicit_target())
            .ok_or_else(|| {
                JsonwrightError::missing_target("select", "use \"loc\" or a selector in \"click\"")
            })?;
        let option = if let Some(values) = &spec.value {
            SelectOption::Values(values.to_vec())
        } else if let Some(labels) = &spec.label {
            SelectOption::Labels(labels.to_vec())
        } else if let Some(indexes) = &spec.index {
            SelectOption::Indexes(indexes.to_vec())
        } else {
            return Err(JsonwrightError::config(
                "select needs one of: value, label, index",
            ));
        };
        let loc = self.locate(scope, target, view).await?;
        let selected = self.driver.select_option(&loc, &option).await?;
        debug!(step = "select", target, selected = ?selected, "executing");
        Ok(())
    }

    async fn upload(
        &self,
        spec: &UploadSpec,
        action: &Action,
        scope: &Locator,
        view: &ContextView<'_>,
    ) -> JsonwrightResult<()> {
        let target = spec
            .loc()
            .or_else(|| action.explicit_target())
            .ok_or_else(|| {
                JsonwrightError::missing_target(
                    "upload",
                    "use \"upload.loc\", \"loc\" or a selector in \"click\"",
                )
            })?;
        let input = self.locate(scope, target, view).await?;

        let tag = self.driver.tag_name(&input).await?;
        let kind = self
            .driver
            .get_attribute(&input, "type")
            .await?
            .map(|t| t.to_lowercase());
        if !tag.eq_ignore_ascii_case("input") || kind.as_deref() != Some("file") {
            return Err(JsonwrightError::UploadTarget {
                target: target.to_string(),
            });
        }

        let files: Vec<PathBuf> = spec
            .files()
            .iter()
            .map(|f| {
                let path = Path::new(f);
                if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    self.base_dir.join(path)
                }
            })
            .collect();
        if let Some(missing) = files.iter().find(|f| !f.exists()) {
            return Err(JsonwrightError::UploadFileMissing {
                path: missing.clone(),
            });
        }

        self.driver.set_input_files(&input, &files).await?;
        let actual = self.driver.file_count(&input).await?;
        if actual != files.len() {
            return Err(JsonwrightError::UploadMismatch {
                target: target.to_string(),
                expected: files.len(),
                actual,
            });
        }
        debug!(step = "upload", target, files = files.len(), "executing");
        Ok(())
    }

    async fn expect_text(
        &self,
        spec: &TextExpectation,
        action: &Action,
        scope: &Locator,
        view: &ContextView<'_>,
    ) -> JsonwrightResult<()> {
        if spec.equals.is_none() && spec.contains.is_none() {
            return Err(JsonwrightError::config(
                "expectText needs one of: { equals | contains }",
            ));
        }
        let expect = self.expect(spec.timeout);
        if let Some(target) = action.explicit_target() {
            let loc = self.locate(scope, target, view).await?;
            return match (&spec.equals, &spec.contains) {
                (Some(equals), _) => expect.to_have_text(&loc, equals).await,
                (None, Some(contains)) => expect.to_contain_text(&loc, contains).await,
                (None, None) => Ok(()),
            };
        }
        match (&spec.equals, &spec.contains) {
            (Some(equals), _) => expect.text_to_be_visible(equals).await,
            (None, Some(contains)) => expect.body_to_contain(contains).await,
            (None, None) => Ok(()),
        }
    }

    async fn expect_visible(
        &self,
        spec: &VisibleExpectation,
        action: &Action,
        scope: &Locator,
        view: &ContextView<'_>,
    ) -> JsonwrightResult<()> {
        let (target, timeout) = match spec {
            VisibleExpectation::Target(t) => (non_empty(t), action.timeout),
            VisibleExpectation::Options { timeout } => {
                (action.explicit_target(), timeout.or(action.timeout))
            }
        };
        let target = target.ok_or_else(|| {
            JsonwrightError::missing_target(
                "expectVisible",
                "use a string or the object form with loc/click",
            )
        })?;
        let loc = self.locate(scope, target, view).await?;
        self.expect(timeout).to_be_visible(&loc).await
    }

    async fn wait_request(&self, spec: &WaitRequestSpec) -> JsonwrightResult<()> {
        let raw = spec
            .url_includes
            .as_ref()
            .map(OneOrMany::to_vec)
            .unwrap_or_default();
        let parts: Vec<String> = raw
            .iter()
            .filter_map(|s| non_empty(s).map(str::to_string))
            .collect();
        if parts.is_empty() || parts.len() != raw.len() {
            return Err(JsonwrightError::config(
                "waitRequest.urlIncludes must be a non-empty string or list of non-empty strings",
            ));
        }
        let statuses = spec.status.as_ref().map(OneOrMany::to_vec).unwrap_or_default();
        let matcher = ResponseMatcher::url_includes(&parts).with_statuses(statuses);
        let timeout = spec.timeout.unwrap_or(self.settings.wait_request_timeout_ms);
        debug!(step = "waitRequest", matcher = %matcher, timeout, "waiting");
        let response = self
            .driver
            .wait_for_response(&matcher, Duration::from_millis(timeout))
            .await?;
        info!(url = %response.url, status = response.status, "waitRequest matched");
        Ok(())
    }

    async fn wait_response(&self, spec: &WaitResponseSpec) -> JsonwrightResult<()> {
        let glob = spec.url.as_deref().and_then(non_empty).ok_or_else(|| {
            JsonwrightError::config("waitResponse needs a \"url\" glob")
        })?;
        let matcher = ResponseMatcher::glob(glob)?
            .with_statuses(spec.status.into_iter().collect())
            .with_body_contains(spec.body_contains.clone());
        let timeout = spec.timeout.unwrap_or(self.settings.wait_response_timeout_ms);
        debug!(step = "waitResponse", matcher = %matcher, timeout, "waiting");
        let response = self
            .driver
            .wait_for_response(&matcher, Duration::from_millis(timeout))
            .await?;
        if let Some(needle) = &spec.body_contains {
            let body = response.body.as_deref().unwrap_or_default();
            if !body.contains(needle.as_str()) {
                return Err(JsonwrightError::assertion(format!(
                    "waitResponse matched {} but body didn't contain {needle:?}",
                    response.url
                )));
            }
        }
        info!(url = %response.url, status = response.status, "waitResponse matched");
        Ok(())
    }

    async fn scroll_to(
        &self,
        spec: &ScrollSpec,
        scope: &Locator,
        view: &ContextView<'_>,
    ) -> JsonwrightResult<()> {
        let scroll = match spec {
            ScrollSpec::Named(name) => match name.trim().to_lowercase().as_str() {
                "top" => PageScroll::Top,
                "bottom" => PageScroll::Bottom,
                other => {
                    return Err(JsonwrightError::config(format!(
                        "scrollTo string must be \"top\" or \"bottom\" (got {other:?})"
                    )))
                }
            },
            ScrollSpec::Object { x, y, behavior, .. } if x.is_some() || y.is_some() => {
                let behavior = behavior
                    .as_deref()
                    .map(str::parse::<ScrollBehavior>)
                    .transpose()?
                    .unwrap_or_default();
                PageScroll::To {
                    x: *x,
                    y: *y,
                    behavior,
                }
            }
            ScrollSpec::Object { to: Some(to), .. } => {
                let loc = self.locate(scope, to.trim(), view).await?;
                debug!(step = "scrollTo", locator = %loc, "executing");
                return self.driver.scroll_into_view(&loc).await;
            }
            ScrollSpec::Object { .. } => {
                return Err(JsonwrightError::config(
                    "scrollTo object requires either { to } or { x|y }",
                ))
            }
        };
        debug!(step = "scrollTo", scroll = %scroll, "executing");
        self.driver.scroll_page(&scroll).await
    }

    async fn screenshot(
        &self,
        spec: &ScreenshotSpec,
        action: &Action,
        scope: &Locator,
        view: &ContextView<'_>,
    ) -> JsonwrightResult<()> {
        let target = spec.loc.as_deref().or_else(|| action.explicit_target());
        let bytes = match target {
            Some(t) => {
                let loc = self.locate(scope, t, view).await?;
                self.driver.screenshot(Some(&loc), false).await?
            }
            None => self.driver.screenshot(None, spec.full_page).await?,
        };
        match spec.path.as_deref().and_then(non_empty) {
            Some(path) => {
                let path = PathBuf::from(path);
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&path, &bytes).await?;
                info!(path = %path.display(), bytes = bytes.len(), "screenshot saved");
            }
            None => debug!(bytes = bytes.len(), "screenshot captured without a path"),
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::mock::{MockDom, MockDriver, MockElement};
    use crate::dynamic::DynamicOptions;
    use crate::functions::FunctionRegistry;
    use crate::network::NetworkResponse;
    use serde_json::json;

    struct Harness {
        driver: MockDriver,
        dynamic: DynamicResolver,
        settings: ExecutorSettings,
        functions: FunctionRegistry,
    }

    impl Harness {
        fn new(dom: MockDom) -> Self {
            let mut settings = ExecutorSettings::default();
            settings.expect = ExpectOptions::new().with_timeout(50).with_poll_interval(10);
            settings.slow_type_delay = Duration::ZERO;
            Self {
                driver: MockDriver::new(dom),
                dynamic: DynamicResolver::new(DynamicOptions::new().with_seed(7)),
                settings,
                functions: FunctionRegistry::new()
                    .with_value("user", json!({"email": "a@b.com"}))
                    .with_value("token", "t-1"),
            }
        }

        fn executor(&self) -> Executor<'_> {
            Executor::new(&self.driver, &self.dynamic, &self.settings)
                .with_functions(Some(&self.functions))
        }

        async fn run(&self, actions: Value) -> JsonwrightResult<VariableBag> {
            let exec = self.executor();
            let mut bag = VariableBag::new();
            let mut memo = Memo::default();
            for action in actions.as_array().unwrap() {
                exec.execute(action, &mut bag, &mut memo, None).await?;
            }
            Ok(bag)
        }
    }

    fn form() -> MockDom {
        MockDom::new().child(
            MockElement::new("form")
                .id("login")
                .child(MockElement::new("input").id("email"))
                .child(MockElement::new("input").id("agree").attr("type", "checkbox"))
                .child(
                    MockElement::new("select")
                        .id("role")
                        .child(MockElement::new("option").attr("value", "a").text("Admin"))
                        .child(MockElement::new("option").attr("value", "u").text("User")),
                )
                .child(MockElement::new("button").id("submit").text("Sign in")),
        )
    }

    mod dispatch_tests {
        use super::*;

        #[tokio::test]
        async fn test_non_operation_action_is_noop() {
            let h = Harness::new(form());
            h.run(json!([{"nth": 1, "within": "#nowhere"}])).await.unwrap();
            assert!(h.driver.history().is_empty());
        }

        #[tokio::test]
        async fn test_steps_run_in_fixed_order() {
            let h = Harness::new(form());
            h.run(json!([{"click": "#submit", "type": "ada", "loc": "#email"}]))
                .await
                .unwrap();
            let history = h.driver.history();
            let fill = history.iter().position(|c| c.starts_with("fill:")).unwrap();
            let click = history.iter().position(|c| c.starts_with("click:")).unwrap();
            assert!(fill < click);
        }

        #[test]
        fn test_typed_placeholder() {
            assert_eq!(typed_placeholder("{type}"), Some(""));
            assert_eq!(typed_placeholder("#list li {type}"), Some("#list li"));
            assert_eq!(typed_placeholder("#submit"), None);
        }

        #[test]
        fn test_nested_actions_keep_tokens() {
            let mut bag = VariableBag::new();
            bag.set("x", "1");
            let out = interpolate_action(
                &json!({"loc": "{x}", "forEach": {"items": "{x}", "actions": [{"click": "{x}"}]}}),
                &bag,
            );
            assert_eq!(out["loc"], "1");
            assert_eq!(out["forEach"]["items"], "1");
            assert_eq!(out["forEach"]["actions"][0]["click"], "{x}");
        }
    }

    mod run_tests {
        use super::*;

        #[tokio::test]
        async fn test_run_feeds_interpolation() {
            let h = Harness::new(form());
            let bag = h
                .run(json!([{"run": "user", "as": "u", "type": "{u.email}", "loc": "#email"}]))
                .await
                .unwrap();
            assert!(h.driver.was_called("fill:"));
            assert!(h.driver.history().iter().any(|c| c.ends_with("=a@b.com")));
            assert_eq!(bag.get("resultFunc"), bag.get("u"));
        }

        #[tokio::test]
        async fn test_run_only_short_circuits() {
            let h = Harness::new(form());
            let bag = h.run(json!([{"run": "token"}])).await.unwrap();
            assert_eq!(bag.get("resultFunc"), Some(&json!("t-1")));
            assert!(h.driver.history().is_empty());
        }

        #[tokio::test]
        async fn test_run_errors() {
            let h = Harness::new(form());
            let err = h.run(json!([{"run": "missing"}])).await.unwrap_err();
            assert!(matches!(err, JsonwrightError::UnknownFunction { .. }));

            let exec = Executor::new(&h.driver, &h.dynamic, &h.settings);
            let mut bag = VariableBag::new();
            let err = exec
                .execute(&json!({"run": "user"}), &mut bag, &mut Memo::default(), None)
                .await
                .unwrap_err();
            assert!(matches!(err, JsonwrightError::FunctionBag { .. }));
        }
    }

    mod gate_tests {
        use super::*;

        #[tokio::test]
        async fn test_exist_miss_skips_rest_of_action_only() {
            let h = Harness::new(form());
            h.run(json!([
                {"exist": "#cookie-banner", "click": "#submit"},
                {"click": "Sign in"}
            ]))
            .await
            .unwrap();
            assert_eq!(h.driver.call_count("click:"), 1);
        }

        #[tokio::test]
        async fn test_exist_hit_continues() {
            let h = Harness::new(form());
            h.run(json!([{"exist": "#submit", "click": "#submit"}]))
                .await
                .unwrap();
            assert_eq!(h.driver.call_count("click:"), 1);
        }
    }

    mod index_tests {
        use super::*;

        #[tokio::test]
        async fn test_nth_with_first_fails_before_any_browser_call() {
            for action in [
                json!({"exist": "#missing", "click": "#submit", "nth": 1, "first": true}),
                json!({"scrollTo": "top", "nth": 1, "first": true}),
                json!({"expectUrl": {"contains": "/"}, "nth": 0, "first": true}),
                json!({"forEach": {"items": "option", "actions": []}, "nth": 2, "first": true}),
            ] {
                let h = Harness::new(form());
                let err = h.run(json!([action])).await.unwrap_err();
                assert!(matches!(err, JsonwrightError::InvalidIndex), "{action}: {err}");
                assert!(h.driver.history().is_empty(), "{action}: {:?}", h.driver.history());
            }
        }
    }

    mod for_each_tests {
        use super::*;

        fn rows() -> MockDom {
            MockDom::new().child(
                MockElement::new("ul")
                    .id("rows")
                    .child(MockElement::new("li").child(MockElement::new("span").class("label").text("one")))
                    .child(MockElement::new("li").child(MockElement::new("span").class("label").text("two")))
                    .child(MockElement::new("li").child(MockElement::new("span").class("label").text("three"))),
            )
        }

        #[tokio::test]
        async fn test_sub_actions_run_once_per_item_in_document_order() {
            let h = Harness::new(rows());
            h.run(json!([{"forEach": {"items": "#rows li", "actions": [
                {"getText": ".label"},
                {"click": ".label"},
                {"expectText": {"loc": ".label", "equals": "{lastGetText}"}}
            ]}}]))
            .await
            .unwrap();

            let clicks: Vec<String> = h
                .driver
                .history()
                .into_iter()
                .filter(|c| c.starts_with("click:"))
                .collect();
            assert_eq!(clicks.len(), 3, "{clicks:?}");
            for (i, click) in clicks.iter().enumerate() {
                assert!(click.contains(&format!("nth={i}")), "{click}");
            }
        }

        #[tokio::test]
        async fn test_typed_text_does_not_leak_between_items() {
            let dom = MockDom::new().child(
                MockElement::new("ul")
                    .id("rows")
                    .child(MockElement::new("li").child(MockElement::new("input").class("field")))
                    .child(MockElement::new("li").child(MockElement::new("button").class("go").text("typed"))),
            );
            let h = Harness::new(dom);
            let err = h
                .run(json!([{"forEach": {"items": "#rows li", "actions": [
                    {"exist": ".field", "type": "typed", "loc": ".field"},
                    {"exist": ".go", "click": "{type}"}
                ]}}]))
                .await
                .unwrap_err();
            assert!(err.to_string().contains("no prior typed text"), "{err}");
            assert!(h.driver.was_called("fill:"));
            assert!(!h.driver.was_called("click:"));
        }

        #[tokio::test]
        async fn test_outer_memo_survives_the_loop() {
            let dom = MockDom::new().child(
                MockElement::new("ul")
                    .id("rows")
                    .child(MockElement::new("li").child(MockElement::new("input").class("field")))
                    .child(MockElement::new("li").child(MockElement::new("input").class("field"))),
            );
            let h = Harness::new(dom);
            let exec = h.executor();
            let mut bag = VariableBag::new();
            let mut memo = Memo {
                last_typed_text: Some("outer".to_string()),
                last_get_text: None,
            };
            exec.execute(
                &json!({"forEach": {"items": "#rows li", "actions": [{"type": "inner", "loc": ".field"}]}}),
                &mut bag,
                &mut memo,
                None,
            )
            .await
            .unwrap();

            assert_eq!(memo.last_typed_text.as_deref(), Some("outer"));
            assert_eq!(bag.get("lastTypedText"), Some(&json!("inner")));
            assert_eq!(h.driver.call_count("fill:"), 2);
        }
    }

    mod typing_tests {
        use super::*;

        #[tokio::test]
        async fn test_type_requires_selector_target() {
            let h = Harness::new(form());
            let err = h.run(json!([{"type": "x", "click": "Sign in"}])).await.unwrap_err();
            assert!(matches!(err, JsonwrightError::MissingTarget { .. }));
        }

        #[tokio::test]
        async fn test_type_slow_clears_then_types() {
            let h = Harness::new(form());
            let bag = h.run(json!([{"typeSlow": "hello", "loc": "#email"}])).await.unwrap();
            let history = h.driver.history();
            assert!(history.iter().any(|c| c.starts_with("fill:") && c.ends_with('=')));
            assert!(history.iter().any(|c| c.starts_with("type:") && c.ends_with("=hello")));
            assert_eq!(bag.get("lastTypedText"), Some(&json!("hello")));
        }

        #[tokio::test]
        async fn test_dynamic_values_resolved() {
            let h = Harness::new(form());
            let bag = h
                .run(json!([{"type": "date(2025-10-05, \"dd/MM/yyyy\")", "loc": "#email"}]))
                .await
                .unwrap();
            assert_eq!(bag.get("lastTypedText"), Some(&json!("05/10/2025")));
        }

        #[tokio::test]
        async fn test_click_typed_placeholder() {
            let dom = MockDom::new()
                .child(MockElement::new("input").id("q"))
                .child(
                    MockElement::new("ul")
                        .id("results")
                        .child(MockElement::new("li").text("Lisbon"))
                        .child(MockElement::new("li").text("London")),
                );
            let h = Harness::new(dom);
            h.run(json!([
                {"type": "London", "loc": "#q"},
                {"click": "#results {type}"}
            ]))
            .await
            .unwrap();
            assert!(h.driver.history().iter().any(|c| c.starts_with("click:") && c.contains("London")));
        }

        #[tokio::test]
        async fn test_click_placeholder_without_typed_text() {
            let h = Harness::new(form());
            let err = h.run(json!([{"click": "{type}"}])).await.unwrap_err();
            assert!(err.to_string().contains("no prior typed text"));
        }
    }

    mod control_tests {
        use super::*;

        #[tokio::test]
        async fn test_check_select_press() {
            let h = Harness::new(form());
            h.run(json!([
                {"check": "#agree"},
                {"select": {"value": "u"}, "loc": "#role"},
                {"press": "Enter", "loc": "#email"},
                {"press": "Escape"}
            ]))
            .await
            .unwrap();
            let history = h.driver.history();
            assert!(history.iter().any(|c| c.starts_with("check:")));
            assert!(history.iter().any(|c| c.starts_with("select:")));
            assert!(history.iter().any(|c| c == "press:page=Escape"));
        }

        #[tokio::test]
        async fn test_check_needs_target() {
            let h = Harness::new(form());
            let err = h.run(json!([{"check": true}])).await.unwrap_err();
            assert!(err.to_string().contains("check requires a target"));
        }

        #[tokio::test]
        async fn test_select_needs_choice() {
            let h = Harness::new(form());
            let err = h.run(json!([{"select": {"loc": "#role"}}])).await.unwrap_err();
            assert!(err.is_config());
        }

        #[tokio::test]
        async fn test_forced_click_fallback() {
            let dom = MockDom::new().child(MockElement::new("button").id("b").blocks_click());
            let h = Harness::new(dom);
            h.run(json!([{"click": "#b"}])).await.unwrap();
            assert_eq!(h.driver.call_count("click(force):"), 1);
        }
    }

    mod expectation_tests {
        use super::*;

        #[tokio::test]
        async fn test_expect_text_with_and_without_target() {
            let h = Harness::new(form());
            h.run(json!([
                {"expectText": {"equals": "Sign in"}, "loc": "#submit"},
                {"expectText": {"contains": "Sign"}},
                {"expectText": {"equals": "Sign in"}}
            ]))
            .await
            .unwrap();
        }

        #[tokio::test]
        async fn test_expect_text_needs_condition() {
            let h = Harness::new(form());
            assert!(h.run(json!([{"expectText": {}}])).await.unwrap_err().is_config());
        }

        #[tokio::test]
        async fn test_expect_url_times_out() {
            let h = Harness::new(form());
            h.driver.set_url("https://app.test/login");
            let err = h
                .run(json!([{"expectUrl": {"contains": "#/ok", "timeout": 20}}]))
                .await
                .unwrap_err();
            assert!(matches!(err, JsonwrightError::AssertionFailed { .. }));
        }

        #[tokio::test]
        async fn test_expect_visible_forms() {
            let h = Harness::new(form());
            h.run(json!([
                {"expectVisible": "#submit"},
                {"expectVisible": {"timeout": 20}, "loc": "#email"}
            ]))
            .await
            .unwrap();
            let err = h.run(json!([{"expectVisible": {}}])).await.unwrap_err();
            assert!(matches!(err, JsonwrightError::MissingTarget { .. }));
        }
    }

    mod network_tests {
        use super::*;

        #[tokio::test]
        async fn test_wait_response_body_check() {
            let h = Harness::new(form());
            h.driver
                .push_response(NetworkResponse::new("https://api.test/users/1", 200).with_body("{\"ok\":true}"));
            h.run(json!([{"waitResponse": {"url": "**/users/*", "status": 200, "bodyContains": "ok"}}]))
                .await
                .unwrap();

            h.driver
                .push_response(NetworkResponse::new("https://api.test/users/2", 200).with_body("{}"));
            let err = h
                .run(json!([{"waitResponse": {"url": "**/users/*", "bodyContains": "ok"}}]))
                .await
                .unwrap_err();
            assert!(err.to_string().contains("body didn't contain"));
        }

        #[tokio::test]
        async fn test_wait_request_validates_includes() {
            let h = Harness::new(form());
            let err = h
                .run(json!([{"waitRequest": {"urlIncludes": ["  "]}}]))
                .await
                .unwrap_err();
            assert!(err.is_config());

            h.driver.push_response(NetworkResponse::new("https://api.test/login", 201));
            h.run(json!([{"waitRequest": {"urlIncludes": "/login", "status": [200, 201]}}]))
                .await
                .unwrap();
        }

        #[tokio::test]
        async fn test_route_forms() {
            let h = Harness::new(form());
            h.run(json!([
                {"route": {"url": "**/api/me", "status": 201, "json": {"id": 1}}},
                {"route": {"abort": ["**/ads/**"], "reason": "blockedByClient"}}
            ]))
            .await
            .unwrap();
            assert_eq!(h.driver.route_count(), 2);
            match h.driver.intercept("https://x.test/api/me") {
                Some(RouteAction::Fulfill(resp)) => assert_eq!(resp.status, 201),
                other => panic!("unexpected {other:?}"),
            }
            h.run(json!([{"route": {"unroute": "**/api/me"}}])).await.unwrap();
            assert_eq!(h.driver.route_count(), 1);
            assert!(h.run(json!([{"route": {}}])).await.unwrap_err().is_config());
        }
    }

    mod scroll_tests {
        use super::*;

        #[tokio::test]
        async fn test_scroll_forms() {
            let h = Harness::new(form());
            h.run(json!([
                {"scrollTo": "bottom"},
                {"scrollTo": {"y": 200, "behavior": "smooth"}},
                {"scrollTo": {"to": "#submit"}}
            ]))
            .await
            .unwrap();
            assert_eq!(h.driver.call_count("scroll:"), 2);
            assert_eq!(h.driver.call_count("scrollIntoView:"), 1);
            assert!(h.run(json!([{"scrollTo": "middle"}])).await.unwrap_err().is_config());
            assert!(h.run(json!([{"scrollTo": {}}])).await.unwrap_err().is_config());
        }

        #[tokio::test]
        async fn test_screenshot_creates_parent_dirs() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("shots/nested/page.png");
            let h = Harness::new(form());
            h.run(json!([{"screenshot": {"path": path.to_str().unwrap(), "fullPage": true}}]))
                .await
                .unwrap();
            assert!(path.exists());
            assert!(h.driver.was_called("screenshot:page fullPage=true"));
        }
    }
}
