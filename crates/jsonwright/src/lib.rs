//! Jsonwright: JSON-described browser tests.
//!
//! Test cases are written as JSON documents; each case is an ordered list of
//! actions that this crate interprets against a browser session.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                      JSONWRIGHT Architecture                      │
//! ├───────────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌────────────────┐  │
//! │  │ Loader   │──►│ Runner   │──►│ Executor │──►│ BrowserDriver  │  │
//! │  │ (JSON)   │   │ (suite)  │   │ (action) │   │ (CDP / mock)   │  │
//! │  └──────────┘   └──────────┘   └────┬─────┘   └────────────────┘  │
//! │                                     │                             │
//! │        interpolate ─ dynamic ─ scope ─ locator ─ expect           │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use jsonwright::{MockDom, MockElement, MockFactory, MockDriver, Runner, RunnerConfig};
//! use std::sync::Arc;
//!
//! # async fn demo() -> jsonwright::JsonwrightResult<()> {
//! let dom = MockDom::new().child(MockElement::new("button").id("go").text("Go"));
//! let factory = Arc::new(MockFactory::new(MockDriver::new(dom)));
//! let runner = Runner::new(RunnerConfig::new().with_base_url("http://localhost:8080"), factory);
//! let report = runner.run_dir(std::path::Path::new("fixtures")).await?;
//! assert!(report.is_success());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

/// Target classification: selector, text or `tag > text`
pub mod classify;

/// Locator hints and their precedence
pub mod context;

/// Browser capability interface and its implementations
#[allow(clippy::missing_errors_doc, clippy::doc_markdown)]
pub mod driver;

/// `date(...)` and `faker.*(...)` directives
pub mod dynamic;

/// Action interpreter
pub mod executor;

/// Polling expectations
pub mod expect;

/// Function bag for `run`
pub mod functions;

/// `{token}` interpolation
pub mod interpolate;

/// Document loading and `before` chains
pub mod loader;

/// Locator chains and target resolution
pub mod locator;

/// URL patterns, routes and response matching
pub mod network;

mod result;

/// Suite orchestration and reports
pub mod runner;

/// Typed document model
pub mod schema;

/// Scope composition
pub mod scope;

pub use classify::{classify, is_selector, TargetKind};
pub use context::{ContextView, IndexStrategy, LocatorContext};
#[cfg(feature = "browser")]
pub use driver::chromium::{ChromiumDriver, ChromiumFactory};
pub use driver::mock::{MockDom, MockDriver, MockElement, MockFactory};
pub use driver::{
    BrowserConfig, BrowserDriver, ClickOptions, DriverFactory, PageScroll, ScrollBehavior,
    SelectOption,
};
pub use dynamic::{DynamicOptions, DynamicResolver, Locale};
pub use executor::{Executor, ExecutorSettings, Memo};
pub use expect::{Expect, ExpectOptions};
pub use functions::{FunctionBag, FunctionRegistry};
pub use interpolate::{interpolate_str, interpolate_value, VariableBag};
pub use loader::{CaseEntry, SpecLoader, Suite};
pub use locator::{Locator, LocatorStep};
pub use network::{
    AbortReason, MockResponse, NetworkResponse, ResponseMatcher, RouteAction, RouteRule, UrlPattern,
};
pub use result::{JsonwrightError, JsonwrightResult, Stage};
pub use runner::{
    check_suite, resolve_case_url, CaseResult, CaseStatus, RunReport, Runner, RunnerConfig,
    SuiteReport,
};
pub use schema::{Action, Case, CaseContext, OneOrMany};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {
    pub use super::driver::{BrowserDriver, DriverFactory};
    pub use super::executor::{Executor, ExecutorSettings, Memo};
    pub use super::interpolate::VariableBag;
    pub use super::loader::SpecLoader;
    pub use super::result::{JsonwrightError, JsonwrightResult};
    pub use super::runner::{RunReport, Runner, RunnerConfig};
}
