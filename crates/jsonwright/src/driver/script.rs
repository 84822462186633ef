//! In-page resolution of locator chains.
//!
//! The CDP driver evaluates these expressions in the page. Steps are embedded
//! as serialized JSON, never spliced into source text.

use crate::locator::Locator;
use crate::result::JsonwrightResult;

/// Resolver prelude: defines `__jwResolve(steps)` returning matched elements
/// in document order.
const RESOLVE_FN: &str = r#"
const __jwNorm = (s) => (s || "").replace(/\s+/g, " ").trim();
const __jwOrder = (els) => {
  const uniq = Array.from(new Set(els));
  uniq.sort((a, b) => {
    if (a === b) return 0;
    const pos = a.compareDocumentPosition(b);
    return pos & Node.DOCUMENT_POSITION_FOLLOWING ? -1 : 1;
  });
  return uniq;
};
const __jwAll = (root) => Array.from(root.querySelectorAll("*"));
const __jwResolve = (steps) => {
  let roots = [document];
  let els = null;
  const scopes = () => (els === null ? roots : els);
  for (const step of steps) {
    const kind = typeof step === "string" ? step : Object.keys(step)[0];
    const arg = typeof step === "string" ? null : step[kind];
    switch (kind) {
      case "Frame": {
        const docs = [];
        for (const s of scopes()) {
          for (const f of s.querySelectorAll(arg)) {
            if (f.contentDocument) docs.push(f.contentDocument);
          }
        }
        roots = docs;
        els = null;
        break;
      }
      case "Css": {
        const out = [];
        for (const s of scopes()) out.push(...s.querySelectorAll(arg));
        els = __jwOrder(out);
        break;
      }
      case "Text": {
        const out = [];
        for (const s of scopes()) {
          const hits = __jwAll(s).filter((e) => __jwNorm(e.textContent) === arg);
          out.push(...hits.filter((e) => !hits.some((o) => o !== e && e.contains(o))));
        }
        els = __jwOrder(out);
        break;
      }
      case "TagText": {
        const needle = arg.text.toLowerCase();
        const out = [];
        for (const s of scopes()) {
          for (const e of s.querySelectorAll(arg.tag)) {
            if (__jwNorm(e.textContent).toLowerCase().includes(needle)) out.push(e);
          }
        }
        els = __jwOrder(out);
        break;
      }
      case "Parent":
        els = __jwOrder(scopes().map((e) => e.parentElement).filter(Boolean));
        break;
      case "First":
        els = scopes().slice(0, 1);
        break;
      case "Last":
        els = scopes().slice(-1);
        break;
      case "Nth": {
        const list = scopes();
        const i = arg < 0 ? list.length + arg : arg;
        els = i >= 0 && i < list.length ? [list[i]] : [];
        break;
      }
    }
  }
  return els === null ? roots.map((r) => r.documentElement || r) : els;
};
"#;

/// Expression evaluating `body` with `els` bound to the resolved elements
/// and `el` to the first of them (or `null`).
pub fn with_elements(locator: &Locator, body: &str) -> JsonwrightResult<String> {
    let steps = serde_json::to_string(locator.steps())?;
    Ok(format!(
        "(() => {{ {RESOLVE_FN}\nconst els = __jwResolve({steps});\nconst el = els[0] || null;\n{body}\n}})()"
    ))
}

/// Expression returning the match count.
pub fn count(locator: &Locator) -> JsonwrightResult<String> {
    with_elements(locator, "return els.length;")
}

/// Expression that fails when nothing matched, then runs `body`.
pub fn with_element(locator: &Locator, body: &str) -> JsonwrightResult<String> {
    with_elements(
        locator,
        &format!("if (!el) throw new Error(\"no element matches locator\");\n{body}"),
    )
}

/// Serialize a value for embedding in a script.
pub fn literal<T: serde::Serialize + ?Sized>(value: &T) -> JsonwrightResult<String> {
    Ok(serde_json::to_string(value)?)
}
