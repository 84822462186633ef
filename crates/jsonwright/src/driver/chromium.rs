//! Chrome `DevTools` Protocol driver.
//!
//! Locator chains are resolved in the page by the script in
//! [`super::script`]; pointer and keyboard input goes through CDP so that
//! clicks and key presses are trusted events. Frames are entered through
//! `contentDocument`, so only same-origin frames are reachable.

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::significant_drop_tightening
)]

use super::script;
use super::{BrowserConfig, BrowserDriver, ClickOptions, DriverFactory, PageScroll, SelectOption};
use crate::locator::{BoundingBox, Locator, Point};
use crate::network::{AbortReason, MockResponse, NetworkResponse, ResponseMatcher, RouteAction, RouteRule, RouteTable};
use crate::result::{JsonwrightError, JsonwrightResult};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::fetch::{
    self, ContinueRequestParams, EventRequestPaused, FailRequestParams, FulfillRequestParams,
    HeaderEntry,
};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, InsertTextParams,
};
use chromiumoxide::cdp::browser_protocol::network::{
    self, ErrorReason, EventLoadingFinished, EventResponseReceived, GetResponseBodyParams,
    RequestId,
};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, Viewport};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::layout;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

fn cdp_err(e: impl std::fmt::Display) -> JsonwrightError {
    JsonwrightError::driver(e.to_string())
}

/// Bounding box in viewport coordinates, accounting for frame offsets
const RECT_JS: &str = r"
el.scrollIntoView({ block: 'center', inline: 'center' });
let r = el.getBoundingClientRect();
let x = r.x, y = r.y;
let win = el.ownerDocument.defaultView;
while (win && win.frameElement) {
  const fr = win.frameElement.getBoundingClientRect();
  x += fr.x + win.frameElement.clientLeft;
  y += fr.y + win.frameElement.clientTop;
  win = win.parent;
}
return { x, y, width: r.width, height: r.height };
";

/// Whether the element (or a descendant) receives a click at its center
const HIT_TEST_JS: &str = r"
const r = el.getBoundingClientRect();
const hit = el.ownerDocument.elementFromPoint(r.x + r.width / 2, r.y + r.height / 2);
return !!hit && (hit === el || el.contains(hit));
";

#[derive(Debug, Deserialize)]
struct Rect {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl From<Rect> for BoundingBox {
    fn from(r: Rect) -> Self {
        Self {
            x: r.x,
            y: r.y,
            width: r.width,
            height: r.height,
        }
    }
}

/// Driver backed by a real Chromium instance
#[derive(Debug)]
pub struct ChromiumDriver {
    browser: Mutex<Browser>,
    page: Page,
    config: BrowserConfig,
    routes: Arc<StdMutex<RouteTable>>,
    fetch_enabled: AtomicBool,
    handler: JoinHandle<()>,
    interceptor: StdMutex<Option<JoinHandle<()>>>,
}

impl ChromiumDriver {
    /// Launch a browser and open a blank page
    pub async fn launch(config: BrowserConfig) -> JsonwrightResult<Self> {
        let mut builder = CdpConfig::builder().window_size(config.viewport_width, config.viewport_height);
        if !config.headless {
            builder = builder.with_head();
        }
        if !config.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = config.chromium_path {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder.build().map_err(cdp_err)?;

        let (browser, mut handler) = Browser::launch(cdp_config).await.map_err(cdp_err)?;
        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await.map_err(cdp_err)?;
        page.execute(network::EnableParams::default())
            .await
            .map_err(cdp_err)?;
        debug!(headless = config.headless, "chromium session opened");

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            config,
            routes: Arc::new(StdMutex::new(RouteTable::default())),
            fetch_enabled: AtomicBool::new(false),
            handler,
            interceptor: StdMutex::new(None),
        })
    }

    async fn eval<T: DeserializeOwned>(&self, js: String) -> JsonwrightResult<T> {
        self.page
            .evaluate(js)
            .await
            .map_err(cdp_err)?
            .into_value()
            .map_err(cdp_err)
    }

    async fn run_on(&self, locator: &Locator, body: &str) -> JsonwrightResult<()> {
        let js = script::with_element(locator, &format!("{body}\nreturn true;"))?;
        let _: bool = self.eval(js).await?;
        Ok(())
    }

    async fn rect(&self, locator: &Locator) -> JsonwrightResult<BoundingBox> {
        let rect: Rect = self.eval(script::with_element(locator, RECT_JS)?).await?;
        Ok(rect.into())
    }

    async fn focus(&self, locator: &Locator) -> JsonwrightResult<()> {
        self.run_on(locator, "el.focus();").await
    }

    async fn key_event(&self, kind: DispatchKeyEventType, key: &KeyStroke) -> JsonwrightResult<()> {
        let mut builder = DispatchKeyEventParams::builder()
            .r#type(kind.clone())
            .key(key.key.clone())
            .code(key.code.clone())
            .modifiers(key.modifiers)
            .windows_virtual_key_code(key.key_code)
            .native_virtual_key_code(key.key_code);
        if kind == DispatchKeyEventType::KeyDown {
            if let Some(text) = &key.text {
                builder = builder.text(text.clone());
            }
        }
        let params = builder.build().map_err(cdp_err)?;
        self.page.execute(params).await.map_err(cdp_err)?;
        Ok(())
    }

    async fn response_body(&self, request_id: RequestId) -> Option<String> {
        for _ in 0..10 {
            match self
                .page
                .execute(GetResponseBodyParams::new(request_id.clone()))
                .await
            {
                Ok(resp) => {
                    if resp.result.base64_encoded {
                        let bytes = STANDARD.decode(&resp.result.body).ok()?;
                        return Some(String::from_utf8_lossy(&bytes).into_owned());
                    }
                    return Some(resp.result.body.clone());
                }
                Err(e) => {
                    debug!(error = %e, "response body not ready");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
        None
    }

    async fn ensure_interception(&self) -> JsonwrightResult<()> {
        if self.fetch_enabled.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut paused = self
            .page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(cdp_err)?;
        self.page
            .execute(fetch::EnableParams::default())
            .await
            .map_err(cdp_err)?;

        let page = self.page.clone();
        let routes = Arc::clone(&self.routes);
        let task = tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let action = routes
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .find(&event.request.url)
                    .map(|r| r.action.clone());
                let outcome = match action {
                    Some(RouteAction::Fulfill(response)) => fulfill(&page, &event, &response).await,
                    Some(RouteAction::Abort(reason)) => page
                        .execute(FailRequestParams::new(
                            event.request_id.clone(),
                            error_reason(reason),
                        ))
                        .await
                        .map(|_| ())
                        .map_err(|e| e.to_string()),
                    None => page
                        .execute(ContinueRequestParams::new(event.request_id.clone()))
                        .await
                        .map(|_| ())
                        .map_err(|e| e.to_string()),
                };
                if let Err(message) = outcome {
                    warn!(url = %event.request.url, error = %message, "request interception failed");
                }
            }
        });
        *self.interceptor.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
        Ok(())
    }
}

async fn fulfill(page: &Page, event: &EventRequestPaused, response: &MockResponse) -> Result<(), String> {
    let headers: Vec<HeaderEntry> = response
        .effective_headers()
        .into_iter()
        .map(|(k, v)| HeaderEntry::new(k, v))
        .collect();
    let params = FulfillRequestParams::builder()
        .request_id(event.request_id.clone())
        .response_code(i64::from(response.status))
        .response_headers(headers)
        .body(STANDARD.encode(&response.body))
        .build()?;
    page.execute(params).await.map(|_| ()).map_err(|e| e.to_string())
}

const fn error_reason(reason: AbortReason) -> ErrorReason {
    match reason {
        AbortReason::Failed => ErrorReason::Failed,
        AbortReason::Aborted => ErrorReason::Aborted,
        AbortReason::TimedOut => ErrorReason::TimedOut,
        AbortReason::AccessDenied => ErrorReason::AccessDenied,
        AbortReason::ConnectionRefused => ErrorReason::ConnectionRefused,
        AbortReason::NameNotResolved => ErrorReason::NameNotResolved,
        AbortReason::BlockedByClient => ErrorReason::BlockedByClient,
    }
}

/// One key of a chord like `Control+Shift+K`
#[derive(Debug, Clone, PartialEq, Eq)]
struct KeyStroke {
    key: String,
    code: String,
    text: Option<String>,
    key_code: i64,
    modifiers: i64,
}

fn parse_chord(chord: &str) -> JsonwrightResult<KeyStroke> {
    let parts: Vec<&str> = chord.split('+').collect();
    let (last, mods) = match parts.split_last() {
        Some((last, mods)) if !last.is_empty() => (*last, mods),
        // "+" itself, or "Shift++"
        _ if chord.ends_with('+') => ("+", &parts[..parts.len().saturating_sub(2)]),
        _ => return Err(JsonwrightError::config(format!("invalid key chord '{chord}'"))),
    };
    let mut modifiers = 0;
    for m in mods {
        modifiers |= match *m {
            "Alt" => 1,
            "Control" | "Ctrl" => 2,
            "Meta" | "Command" => 4,
            "Shift" => 8,
            other => {
                return Err(JsonwrightError::config(format!(
                    "unknown modifier '{other}' in '{chord}'"
                )))
            }
        };
    }
    let (code, key_code, text) = match last {
        "Enter" => ("Enter".to_string(), 13, Some("\r".to_string())),
        "Tab" => ("Tab".to_string(), 9, None),
        "Escape" => ("Escape".to_string(), 27, None),
        "Backspace" => ("Backspace".to_string(), 8, None),
        "Delete" => ("Delete".to_string(), 46, None),
        "Space" | " " => ("Space".to_string(), 32, Some(" ".to_string())),
        "ArrowLeft" => ("ArrowLeft".to_string(), 37, None),
        "ArrowUp" => ("ArrowUp".to_string(), 38, None),
        "ArrowRight" => ("ArrowRight".to_string(), 39, None),
        "ArrowDown" => ("ArrowDown".to_string(), 40, None),
        "Home" => ("Home".to_string(), 36, None),
        "End" => ("End".to_string(), 35, None),
        "PageUp" => ("PageUp".to_string(), 33, None),
        "PageDown" => ("PageDown".to_string(), 34, None),
        single if single.chars().count() == 1 => {
            let c = single.chars().next().unwrap_or(' ');
            let upper = c.to_ascii_uppercase();
            let code = if c.is_ascii_alphabetic() {
                format!("Key{upper}")
            } else if c.is_ascii_digit() {
                format!("Digit{c}")
            } else {
                String::new()
            };
            // modified chords do not insert text
            let text = (modifiers & !8 == 0).then(|| single.to_string());
            (code, i64::from(u32::from(upper)), text)
        }
        other => (other.to_string(), 0, None),
    };
    Ok(KeyStroke {
        key: if last == "Space" { " ".to_string() } else { last.to_string() },
        code,
        text,
        key_code,
        modifiers,
    })
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn navigate(&self, url: &str) -> JsonwrightResult<()> {
        let nav = self.page.goto(url);
        match tokio::time::timeout(self.config.navigation_timeout, nav).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(JsonwrightError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(JsonwrightError::Navigation {
                url: url.to_string(),
                message: format!("timed out after {:?}", self.config.navigation_timeout),
            }),
        }
    }

    async fn current_url(&self) -> JsonwrightResult<String> {
        Ok(self.page.url().await.map_err(cdp_err)?.unwrap_or_default())
    }

    async fn count(&self, locator: &Locator) -> JsonwrightResult<usize> {
        self.eval(script::count(locator)?).await
    }

    async fn click(&self, locator: &Locator, options: ClickOptions) -> JsonwrightResult<()> {
        if options.force {
            return self.run_on(locator, "el.click();").await;
        }
        let bounds = self.rect(locator).await?;
        if !bounds.has_area() {
            return Err(JsonwrightError::driver(format!("{locator} is not visible")));
        }
        let receives: bool = self.eval(script::with_element(locator, HIT_TEST_JS)?).await?;
        if !receives {
            return Err(JsonwrightError::driver(format!(
                "another element would receive the click on {locator}"
            )));
        }
        let Point { x, y } = bounds.center();
        self.page
            .click(layout::Point::new(x, y))
            .await
            .map_err(cdp_err)?;
        Ok(())
    }

    async fn hover(&self, locator: &Locator) -> JsonwrightResult<()> {
        let Point { x, y } = self.rect(locator).await?.center();
        self.page
            .move_mouse(layout::Point::new(x, y))
            .await
            .map_err(cdp_err)?;
        Ok(())
    }

    async fn fill(&self, locator: &Locator, text: &str) -> JsonwrightResult<()> {
        let value = script::literal(text)?;
        self.run_on(
            locator,
            &format!(
                "if (el.isContentEditable) {{ el.focus(); el.textContent = {value}; }} else {{
                  const proto = Object.getPrototypeOf(el);
                  const setter = Object.getOwnPropertyDescriptor(proto, 'value');
                  if (!setter || !setter.set) throw new Error('element is not fillable');
                  el.focus();
                  setter.set.call(el, {value});
                }}
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));"
            ),
        )
        .await
    }

    async fn type_text(
        &self,
        locator: &Locator,
        text: &str,
        delay: Duration,
    ) -> JsonwrightResult<()> {
        self.focus(locator).await?;
        for (i, c) in text.chars().enumerate() {
            if i > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            self.page
                .execute(InsertTextParams::new(c.to_string()))
                .await
                .map_err(cdp_err)?;
        }
        Ok(())
    }

    async fn press(&self, locator: Option<&Locator>, key: &str) -> JsonwrightResult<()> {
        if let Some(loc) = locator {
            self.focus(loc).await?;
        }
        let stroke = parse_chord(key)?;
        self.key_event(DispatchKeyEventType::KeyDown, &stroke).await?;
        self.key_event(DispatchKeyEventType::KeyUp, &stroke).await
    }

    async fn set_checked(&self, locator: &Locator, checked: bool) -> JsonwrightResult<()> {
        self.run_on(
            locator,
            &format!(
                "if (!('checked' in el)) throw new Error('element is not a checkbox or radio');
                if (el.checked !== {checked}) el.click();
                if (el.checked !== {checked}) throw new Error('checked state did not change');"
            ),
        )
        .await
    }

    async fn select_option(
        &self,
        locator: &Locator,
        option: &SelectOption,
    ) -> JsonwrightResult<Vec<String>> {
        let spec = script::literal(option)?;
        let js = script::with_element(
            locator,
            &format!(
                "if (el.nodeName.toLowerCase() !== 'select') throw new Error('element is not a <select>');
                const spec = {spec};
                const kind = Object.keys(spec)[0];
                const wanted = spec[kind];
                const opts = Array.from(el.options);
                const picked = wanted.map((w) => opts.find((o, i) =>
                  kind === 'values' ? o.value === w : kind === 'labels' ? o.label === w || o.textContent.trim() === w : i === w));
                if (picked.some((o) => !o)) throw new Error('option not found');
                for (const o of opts) o.selected = picked.includes(o);
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return picked.map((o) => o.value);"
            ),
        )?;
        self.eval(js).await
    }

    async fn set_input_files(&self, locator: &Locator, files: &[PathBuf]) -> JsonwrightResult<()> {
        let js = script::with_element(locator, "return el;")?;
        let params = EvaluateParams::builder()
            .expression(js)
            .return_by_value(false)
            .build()
            .map_err(cdp_err)?;
        let evaluated = self.page.execute(params).await.map_err(cdp_err)?;
        if let Some(details) = &evaluated.result.exception_details {
            return Err(JsonwrightError::driver(details.text.clone()));
        }
        let object_id = evaluated
            .result
            .result
            .object_id
            .clone()
            .ok_or_else(|| JsonwrightError::driver(format!("no element matches {locator}")))?;
        let paths: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();
        let params = SetFileInputFilesParams::builder()
            .files(paths)
            .object_id(object_id)
            .build()
            .map_err(cdp_err)?;
        self.page.execute(params).await.map_err(cdp_err)?;
        Ok(())
    }

    async fn text_content(&self, locator: &Locator) -> JsonwrightResult<Option<String>> {
        self.eval(script::with_element(locator, "return el.textContent;")?)
            .await
    }

    async fn input_value(&self, locator: &Locator) -> JsonwrightResult<String> {
        self.eval(script::with_element(
            locator,
            "if (!('value' in el)) throw new Error('element is not an input'); return String(el.value);",
        )?)
        .await
    }

    async fn get_attribute(
        &self,
        locator: &Locator,
        name: &str,
    ) -> JsonwrightResult<Option<String>> {
        let name = script::literal(name)?;
        self.eval(script::with_element(
            locator,
            &format!("return el.getAttribute({name});"),
        )?)
        .await
    }

    async fn tag_name(&self, locator: &Locator) -> JsonwrightResult<String> {
        self.eval(script::with_element(
            locator,
            "return el.nodeName.toLowerCase();",
        )?)
        .await
    }

    async fn file_count(&self, locator: &Locator) -> JsonwrightResult<usize> {
        self.eval(script::with_element(
            locator,
            "return el.files ? el.files.length : 0;",
        )?)
        .await
    }

    async fn is_visible(&self, locator: &Locator) -> JsonwrightResult<bool> {
        self.eval(script::with_elements(
            locator,
            "if (!el) return false;
            const style = el.ownerDocument.defaultView.getComputedStyle(el);
            const r = el.getBoundingClientRect();
            return style.visibility !== 'hidden' && r.width > 0 && r.height > 0;",
        )?)
        .await
    }

    async fn scroll_into_view(&self, locator: &Locator) -> JsonwrightResult<()> {
        self.run_on(
            locator,
            "el.scrollIntoView({ block: 'center', inline: 'center' });",
        )
        .await
    }

    async fn scroll_page(&self, scroll: &PageScroll) -> JsonwrightResult<()> {
        let js = match scroll {
            PageScroll::Top => "window.scrollTo({ top: 0, behavior: 'auto' }); true".to_string(),
            PageScroll::Bottom => {
                "window.scrollTo({ top: document.body.scrollHeight, behavior: 'auto' }); true"
                    .to_string()
            }
            PageScroll::To { x, y, behavior } => format!(
                "window.scrollTo({{ left: {} ?? window.scrollX, top: {} ?? window.scrollY, behavior: {} }}); true",
                script::literal(x)?,
                script::literal(y)?,
                script::literal(behavior.as_str())?
            ),
        };
        let _: bool = self.eval(js).await?;
        Ok(())
    }

    async fn screenshot(
        &self,
        locator: Option<&Locator>,
        full_page: bool,
    ) -> JsonwrightResult<Vec<u8>> {
        let mut params = ScreenshotParams::builder().format(CaptureScreenshotFormat::Png);
        if let Some(loc) = locator {
            let b = self.rect(loc).await?;
            let (sx, sy): (f64, f64) = self
                .eval("[window.scrollX, window.scrollY]".to_string())
                .await?;
            params = params.clip(Viewport {
                x: b.x + sx,
                y: b.y + sy,
                width: b.width,
                height: b.height,
                scale: 1.0,
            });
        } else {
            params = params.full_page(full_page);
        }
        self.page.screenshot(params.build()).await.map_err(cdp_err)
    }

    async fn body_text(&self) -> JsonwrightResult<String> {
        self.eval("document.body ? document.body.innerText : ''".to_string())
            .await
    }

    async fn wait_for_response(
        &self,
        matcher: &ResponseMatcher,
        timeout: Duration,
    ) -> JsonwrightResult<NetworkResponse> {
        let mut events = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(cdp_err)?;
        // subscribed up front so a fast loadingFinished is not missed
        let mut finished = self
            .page
            .event_listener::<EventLoadingFinished>()
            .await
            .map_err(cdp_err)?;
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let event = match tokio::time::timeout_at(deadline, events.next()).await {
                Ok(Some(event)) => event,
                Ok(None) => return Err(JsonwrightError::driver("response event stream closed")),
                Err(_) => {
                    return Err(JsonwrightError::Timeout {
                        ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                        what: matcher.to_string(),
                    })
                }
            };
            let status = u16::try_from(event.response.status).unwrap_or_default();
            if !matcher.matches_head(&event.response.url, status) {
                continue;
            }
            let mut response = NetworkResponse::new(event.response.url.clone(), status);
            if matcher.needs_body() {
                let mut ids = std::pin::pin!((&mut finished).map(|e| e.request_id.clone()));
                if !loading_finished(&mut ids, &event.request_id, deadline).await {
                    debug!(url = %event.response.url, "loadingFinished not seen before deadline");
                }
                response.body = self.response_body(event.request_id.clone()).await;
            }
            return Ok(response);
        }
    }

    async fn route(&self, rule: RouteRule) -> JsonwrightResult<()> {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add(rule);
        self.ensure_interception().await
    }

    async fn unroute(&self, pattern: &str) -> JsonwrightResult<()> {
        let removed = self
            .routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(pattern);
        debug!(pattern, removed, "unroute");
        Ok(())
    }

    async fn close(&self) -> JsonwrightResult<()> {
        if let Some(task) = self
            .interceptor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
        self.page.clone().close().await.map_err(cdp_err)?;
        let mut browser = self.browser.lock().await;
        browser.close().await.map_err(cdp_err)?;
        self.handler.abort();
        Ok(())
    }
}

/// Launches a fresh Chromium per suite
#[derive(Debug, Clone, Default)]
pub struct ChromiumFactory {
    config: BrowserConfig,
}

impl ChromiumFactory {
    /// Create a factory
    #[must_use]
    pub const fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DriverFactory for ChromiumFactory {
    async fn open(&self) -> JsonwrightResult<Arc<dyn BrowserDriver>> {
        Ok(Arc::new(ChromiumDriver::launch(self.config.clone()).await?))
    }
}

/// Wait until `id` shows up in a stream of finished request ids.
///
/// The body of a response is only complete after `Network.loadingFinished`.
async fn loading_finished<S>(ids: &mut S, id: &RequestId, deadline: tokio::time::Instant) -> bool
where
    S: Stream<Item = RequestId> + Unpin,
{
    loop {
        match tokio::time::timeout_at(deadline, ids.next()).await {
            Ok(Some(done)) if done == *id => return true,
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => return false,
        }
    }
}
