//! In-memory driver for unit and integration testing.
//!
//! [`MockDom`] is a small element tree built with a fluent API; the driver
//! flattens it into an arena and resolves [`Locator`] chains against it with
//! the same rules the in-page resolver uses. Every capability call is
//! recorded in a call history.
//!
//! Supported selectors: type, `*`, `#id`, `.class`, `[attr]`, `[attr=value]`,
//! descendant and `>` combinators, and comma lists.

use super::{BrowserDriver, ClickOptions, DriverFactory, PageScroll, SelectOption};
use crate::locator::{Locator, LocatorStep};
use crate::network::{NetworkResponse, ResponseMatcher, RouteAction, RouteRule, RouteTable};
use crate::result::{JsonwrightError, JsonwrightResult};
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// PNG signature returned by mock screenshots
pub const MOCK_PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// A mock element
#[derive(Debug, Clone, Default)]
pub struct MockElement {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attrs: BTreeMap<String, String>,
    text: String,
    value: String,
    checked: bool,
    hidden: bool,
    blocks_click: bool,
    navigates_to: Option<String>,
    frame: Option<MockDom>,
    children: Vec<MockElement>,
}

impl MockElement {
    /// Create an element with the given tag
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Self::default()
        }
    }

    /// Set the id
    #[must_use]
    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Add a class
    #[must_use]
    pub fn class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    /// Set own text (rendered before children)
    #[must_use]
    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    /// Set the input value
    #[must_use]
    pub fn value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    /// Start checked
    #[must_use]
    pub const fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    /// Not rendered
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Plain clicks fail as if another element intercepted them
    #[must_use]
    pub const fn blocks_click(mut self) -> Self {
        self.blocks_click = true;
        self
    }

    /// Clicking changes the page location
    #[must_use]
    pub fn navigates_to(mut self, url: &str) -> Self {
        self.navigates_to = Some(url.to_string());
        self
    }

    /// Embed a document (for `iframe`/`frame` elements)
    #[must_use]
    pub fn frame(mut self, doc: MockDom) -> Self {
        self.frame = Some(doc);
        self
    }

    /// Append a child
    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }
}

/// A mock document
#[derive(Debug, Clone, Default)]
pub struct MockDom {
    children: Vec<MockElement>,
}

impl MockDom {
    /// Empty document
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a top-level element
    #[must_use]
    pub fn child(mut self, child: MockElement) -> Self {
        self.children.push(child);
        self
    }
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attrs: BTreeMap<String, String>,
    text: String,
    value: String,
    checked: bool,
    hidden: bool,
    blocks_click: bool,
    navigates_to: Option<String>,
    files: usize,
    parent: Option<usize>,
    children: Vec<usize>,
    content_doc: Option<usize>,
}

#[derive(Debug, Default)]
struct Arena {
    nodes: Vec<Node>,
    docs: Vec<Vec<usize>>,
}

impl Arena {
    fn build(dom: &MockDom) -> Self {
        let mut arena = Self::default();
        arena.add_doc(dom);
        arena
    }

    fn add_doc(&mut self, dom: &MockDom) -> usize {
        let doc = self.docs.len();
        self.docs.push(Vec::new());
        let top: Vec<usize> = dom
            .children
            .iter()
            .map(|el| self.add_node(el, None))
            .collect();
        self.docs[doc] = top;
        doc
    }

    fn add_node(&mut self, el: &MockElement, parent: Option<usize>) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(Node {
            tag: el.tag.clone(),
            id: el.id.clone(),
            classes: el.classes.clone(),
            attrs: el.attrs.clone(),
            text: el.text.clone(),
            value: el.value.clone(),
            checked: el.checked,
            hidden: el.hidden,
            blocks_click: el.blocks_click,
            navigates_to: el.navigates_to.clone(),
            files: 0,
            parent,
            children: Vec::new(),
            content_doc: None,
        });
        let children: Vec<usize> = el
            .children
            .iter()
            .map(|c| self.add_node(c, Some(idx)))
            .collect();
        self.nodes[idx].children = children;
        if let Some(doc) = &el.frame {
            let doc_idx = self.add_doc(doc);
            self.nodes[idx].content_doc = Some(doc_idx);
        }
        idx
    }

    fn descendants(&self, idx: usize, out: &mut Vec<usize>) {
        for &c in &self.nodes[idx].children {
            out.push(c);
            self.descendants(c, out);
        }
    }

    fn doc_elements(&self, doc: usize) -> Vec<usize> {
        let mut out = Vec::new();
        for &top in &self.docs[doc] {
            out.push(top);
            self.descendants(top, &mut out);
        }
        out
    }

    fn text_content(&self, idx: usize) -> String {
        let node = &self.nodes[idx];
        let mut out = node.text.clone();
        for &c in &node.children {
            out.push_str(&self.text_content(c));
        }
        out
    }

    fn is_visible(&self, idx: usize) -> bool {
        let mut cur = Some(idx);
        while let Some(i) = cur {
            if self.nodes[i].hidden {
                return false;
            }
            cur = self.nodes[i].parent;
        }
        true
    }

    fn contains(&self, ancestor: usize, node: usize) -> bool {
        let mut cur = self.nodes[node].parent;
        while let Some(i) = cur {
            if i == ancestor {
                return true;
            }
            cur = self.nodes[i].parent;
        }
        false
    }
}

fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Selector subset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq)]
struct Complex {
    parts: Vec<Compound>,
    combinators: Vec<Combinator>,
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn split_groups(selector: &str) -> Vec<String> {
    let mut groups = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for c in selector.chars() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[' | '(') => depth += 1,
            (None, ']' | ')') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                groups.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    groups.push(current);
    groups
}

fn parse_selector(selector: &str) -> Result<Vec<Complex>, String> {
    let groups = split_groups(selector);
    let mut out = Vec::with_capacity(groups.len());
    for group in groups {
        let group = group.trim();
        if group.is_empty() {
            return Err("empty selector group".to_string());
        }
        out.push(parse_complex(group)?);
    }
    Ok(out)
}

fn parse_complex(input: &str) -> Result<Complex, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut parts = Vec::new();
    let mut combinators = Vec::new();
    let mut pending: Option<Combinator> = None;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            if !parts.is_empty() && pending.is_none() {
                pending = Some(Combinator::Descendant);
            }
            i += 1;
            continue;
        }
        if c == '>' {
            if parts.is_empty() {
                return Err("selector starts with a combinator".to_string());
            }
            pending = Some(Combinator::Child);
            i += 1;
            continue;
        }
        if c == '+' || c == '~' {
            return Err(format!("combinator '{c}' is not supported"));
        }
        let (compound, next) = parse_compound(&chars, i)?;
        if !parts.is_empty() {
            combinators.push(pending.take().unwrap_or(Combinator::Descendant));
        }
        pending = None;
        parts.push(compound);
        i = next;
    }
    if parts.is_empty() || pending == Some(Combinator::Child) {
        return Err("incomplete selector".to_string());
    }
    Ok(Complex { parts, combinators })
}

fn read_ident(chars: &[char], mut i: usize) -> (String, usize) {
    let start = i;
    while i < chars.len() && is_ident_char(chars[i]) {
        i += 1;
    }
    (chars[start..i].iter().collect(), i)
}

fn parse_compound(chars: &[char], mut i: usize) -> Result<(Compound, usize), String> {
    let mut compound = Compound::default();
    if chars[i] == '*' {
        i += 1;
    } else if is_ident_char(chars[i]) {
        let (tag, next) = read_ident(chars, i);
        compound.tag = Some(tag.to_ascii_lowercase());
        i = next;
    }
    while i < chars.len() {
        match chars[i] {
            '#' => {
                let (id, next) = read_ident(chars, i + 1);
                if id.is_empty() {
                    return Err("empty id".to_string());
                }
                compound.id = Some(id);
                i = next;
            }
            '.' => {
                let (class, next) = read_ident(chars, i + 1);
                if class.is_empty() {
                    return Err("empty class".to_string());
                }
                compound.classes.push(class);
                i = next;
            }
            '[' => {
                let close = chars[i..]
                    .iter()
                    .position(|&c| c == ']')
                    .ok_or_else(|| "unterminated attribute selector".to_string())?;
                let body: String = chars[i + 1..i + close].iter().collect();
                compound.attrs.push(parse_attr(&body)?);
                i += close + 1;
            }
            ':' => return Err("pseudo-classes are not supported".to_string()),
            c if c.is_whitespace() || c == '>' || c == '+' || c == '~' => break,
            c => return Err(format!("unexpected character '{c}'")),
        }
    }
    Ok((compound, i))
}

fn parse_attr(body: &str) -> Result<(String, Option<String>), String> {
    let Some((name, value)) = body.split_once('=') else {
        let name = body.trim();
        if name.is_empty() {
            return Err("empty attribute selector".to_string());
        }
        return Ok((name.to_string(), None));
    };
    let value = value.trim();
    let unquoted = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);
    Ok((name.trim().to_string(), Some(unquoted.to_string())))
}

fn attr_of(node: &Node, name: &str) -> Option<String> {
    match name {
        "id" => node.id.clone(),
        "class" if !node.classes.is_empty() => Some(node.classes.join(" ")),
        _ => node.attrs.get(name).cloned(),
    }
}

fn matches_compound(node: &Node, c: &Compound) -> bool {
    c.tag.as_ref().map_or(true, |t| &node.tag == t)
        && c.id.as_ref().map_or(true, |id| node.id.as_ref() == Some(id))
        && c.classes.iter().all(|cl| node.classes.contains(cl))
        && c.attrs.iter().all(|(name, value)| match (attr_of(node, name), value) {
            (Some(actual), Some(expected)) => &actual == expected,
            (Some(_), None) => true,
            (None, _) => false,
        })
}

fn matches_from(arena: &Arena, idx: usize, sel: &Complex, part: usize) -> bool {
    if !matches_compound(&arena.nodes[idx], &sel.parts[part]) {
        return false;
    }
    if part == 0 {
        return true;
    }
    match sel.combinators[part - 1] {
        Combinator::Child => arena.nodes[idx]
            .parent
            .is_some_and(|p| matches_from(arena, p, sel, part - 1)),
        Combinator::Descendant => {
            let mut cur = arena.nodes[idx].parent;
            while let Some(p) = cur {
                if matches_from(arena, p, sel, part - 1) {
                    return true;
                }
                cur = arena.nodes[p].parent;
            }
            false
        }
    }
}

fn matches_selector(arena: &Arena, idx: usize, groups: &[Complex]) -> bool {
    groups
        .iter()
        .any(|g| matches_from(arena, idx, g, g.parts.len() - 1))
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

enum Scope {
    Docs(Vec<usize>),
    Elements(Vec<usize>),
}

impl Arena {
    fn candidates(&self, scope: &Scope) -> Vec<Vec<usize>> {
        match scope {
            Scope::Docs(docs) => docs.iter().map(|&d| self.doc_elements(d)).collect(),
            Scope::Elements(els) => els
                .iter()
                .map(|&e| {
                    let mut out = Vec::new();
                    self.descendants(e, &mut out);
                    out
                })
                .collect(),
        }
    }

    fn scope_list(&self, scope: &Scope) -> Vec<usize> {
        match scope {
            Scope::Docs(docs) => docs
                .iter()
                .filter_map(|&d| self.docs[d].first().copied())
                .collect(),
            Scope::Elements(els) => els.clone(),
        }
    }

    fn select(&self, scope: &Scope, selector: &str) -> JsonwrightResult<Vec<usize>> {
        let groups = parse_selector(selector)
            .map_err(|e| JsonwrightError::driver(format!("invalid selector '{selector}': {e}")))?;
        let mut out: Vec<usize> = self
            .candidates(scope)
            .into_iter()
            .flatten()
            .filter(|&i| matches_selector(self, i, &groups))
            .collect();
        out.sort_unstable();
        out.dedup();
        Ok(out)
    }

    fn resolve(&self, locator: &Locator) -> JsonwrightResult<Vec<usize>> {
        let mut scope = Scope::Docs(vec![0]);
        for step in locator.steps() {
            scope = match step {
                LocatorStep::Frame(sel) => {
                    let docs = self
                        .select(&scope, sel)?
                        .into_iter()
                        .filter_map(|i| self.nodes[i].content_doc)
                        .collect();
                    Scope::Docs(docs)
                }
                LocatorStep::Css(sel) => Scope::Elements(self.select(&scope, sel)?),
                LocatorStep::Text(text) => {
                    let mut out = Vec::new();
                    for group in self.candidates(&scope) {
                        let hits: Vec<usize> = group
                            .into_iter()
                            .filter(|&i| normalize(&self.text_content(i)) == *text)
                            .collect();
                        out.extend(
                            hits.iter()
                                .copied()
                                .filter(|&e| !hits.iter().any(|&o| o != e && self.contains(e, o))),
                        );
                    }
                    out.sort_unstable();
                    out.dedup();
                    Scope::Elements(out)
                }
                LocatorStep::TagText { tag, text } => {
                    let needle = text.to_lowercase();
                    let out = self
                        .select(&scope, tag)?
                        .into_iter()
                        .filter(|&i| normalize(&self.text_content(i)).to_lowercase().contains(&needle))
                        .collect();
                    Scope::Elements(out)
                }
                LocatorStep::Parent => {
                    let mut out: Vec<usize> = self
                        .scope_list(&scope)
                        .into_iter()
                        .filter_map(|i| self.nodes[i].parent)
                        .collect();
                    out.sort_unstable();
                    out.dedup();
                    Scope::Elements(out)
                }
                LocatorStep::First => {
                    Scope::Elements(self.scope_list(&scope).into_iter().take(1).collect())
                }
                LocatorStep::Last => {
                    Scope::Elements(self.scope_list(&scope).into_iter().last().into_iter().collect())
                }
                LocatorStep::Nth(n) => {
                    let list = self.scope_list(&scope);
                    let len = i64::try_from(list.len()).unwrap_or(i64::MAX);
                    let idx = if *n < 0 { len + n } else { *n };
                    let picked = usize::try_from(idx)
                        .ok()
                        .and_then(|i| list.get(i).copied());
                    Scope::Elements(picked.into_iter().collect())
                }
            };
        }
        Ok(self.scope_list(&scope))
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MockState {
    arena: Arena,
    url: String,
    history: Vec<String>,
    responses: VecDeque<NetworkResponse>,
    routes: RouteTable,
}

/// Mock driver for unit testing
#[derive(Debug)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl MockDriver {
    /// Create a driver over a document
    #[must_use]
    pub fn new(dom: MockDom) -> Self {
        Self {
            state: Mutex::new(MockState {
                arena: Arena::build(&dom),
                url: "about:blank".to_string(),
                ..MockState::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_node<T>(
        &self,
        locator: &Locator,
        record: Option<String>,
        f: impl FnOnce(&mut MockState, usize) -> JsonwrightResult<T>,
    ) -> JsonwrightResult<T> {
        let mut state = self.state();
        if let Some(entry) = record {
            state.history.push(entry);
        }
        let idx = state
            .arena
            .resolve(locator)?
            .first()
            .copied()
            .ok_or_else(|| JsonwrightError::driver(format!("no element matches {locator}")))?;
        f(&mut state, idx)
    }

    /// Queue a response for `wait_for_response`
    pub fn push_response(&self, response: NetworkResponse) {
        self.state().responses.push_back(response);
    }

    /// Override the current location
    pub fn set_url(&self, url: &str) {
        self.state().url = url.to_string();
    }

    /// Route outcome for a request to `url`, if any rule applies
    #[must_use]
    pub fn intercept(&self, url: &str) -> Option<RouteAction> {
        self.state().routes.find(url).map(|r| r.action.clone())
    }

    /// Number of registered routes
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.state().routes.len()
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state().history.clone()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.state().history.iter().any(|c| c.starts_with(method))
    }

    /// Number of calls starting with `method`
    #[must_use]
    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .history
            .iter()
            .filter(|c| c.starts_with(method))
            .count()
    }
}

fn is_toggle(node: &Node) -> bool {
    node.tag == "input"
        && matches!(
            node.attrs.get("type").map(String::as_str),
            Some("checkbox" | "radio")
        )
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn navigate(&self, url: &str) -> JsonwrightResult<()> {
        let mut state = self.state();
        state.history.push(format!("navigate:{url}"));
        state.url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> JsonwrightResult<String> {
        Ok(self.state().url.clone())
    }

    async fn count(&self, locator: &Locator) -> JsonwrightResult<usize> {
        Ok(self.state().arena.resolve(locator)?.len())
    }

    async fn click(&self, locator: &Locator, options: ClickOptions) -> JsonwrightResult<()> {
        let label = if options.force { "click(force)" } else { "click" };
        self.with_node(locator, Some(format!("{label}:{locator}")), |state, idx| {
            let visible = state.arena.is_visible(idx);
            let node = &mut state.arena.nodes[idx];
            if !options.force && (node.blocks_click || !visible) {
                return Err(JsonwrightError::driver(format!(
                    "element {locator} did not receive the click"
                )));
            }
            if is_toggle(node) {
                node.checked = !node.checked;
            }
            if let Some(url) = node.navigates_to.clone() {
                state.url = url;
            }
            Ok(())
        })
    }

    async fn hover(&self, locator: &Locator) -> JsonwrightResult<()> {
        self.with_node(locator, Some(format!("hover:{locator}")), |_, _| Ok(()))
    }

    async fn fill(&self, locator: &Locator, text: &str) -> JsonwrightResult<()> {
        self.with_node(locator, Some(format!("fill:{locator}={text}")), |state, idx| {
            state.arena.nodes[idx].value = text.to_string();
            Ok(())
        })
    }

    async fn type_text(
        &self,
        locator: &Locator,
        text: &str,
        _delay: Duration,
    ) -> JsonwrightResult<()> {
        self.with_node(locator, Some(format!("type:{locator}={text}")), |state, idx| {
            state.arena.nodes[idx].value.push_str(text);
            Ok(())
        })
    }

    async fn press(&self, locator: Option<&Locator>, key: &str) -> JsonwrightResult<()> {
        match locator {
            Some(loc) => self.with_node(loc, Some(format!("press:{loc}={key}")), |_, _| Ok(())),
            None => {
                self.state().history.push(format!("press:page={key}"));
                Ok(())
            }
        }
    }

    async fn set_checked(&self, locator: &Locator, checked: bool) -> JsonwrightResult<()> {
        let label = if checked { "check" } else { "uncheck" };
        self.with_node(locator, Some(format!("{label}:{locator}")), |state, idx| {
            let node = &mut state.arena.nodes[idx];
            if !is_toggle(node) {
                return Err(JsonwrightError::driver(format!(
                    "{locator} is not a checkbox or radio input"
                )));
            }
            node.checked = checked;
            Ok(())
        })
    }

    async fn select_option(
        &self,
        locator: &Locator,
        option: &SelectOption,
    ) -> JsonwrightResult<Vec<String>> {
        self.with_node(locator, Some(format!("select:{locator}={option:?}")), |state, idx| {
            let arena = &state.arena;
            if arena.nodes[idx].tag != "select" {
                return Err(JsonwrightError::driver(format!("{locator} is not a <select>")));
            }
            let options: Vec<(String, String)> = arena.nodes[idx]
                .children
                .iter()
                .filter(|&&c| arena.nodes[c].tag == "option")
                .map(|&c| {
                    let label = normalize(&arena.text_content(c));
                    let value = arena.nodes[c].attrs.get("value").cloned().unwrap_or_else(|| label.clone());
                    (value, label)
                })
                .collect();
            let picked: Vec<Option<String>> = match option {
                SelectOption::Values(values) => values
                    .iter()
                    .map(|v| options.iter().find(|(val, _)| val == v).map(|(val, _)| val.clone()))
                    .collect(),
                SelectOption::Labels(labels) => labels
                    .iter()
                    .map(|l| options.iter().find(|(_, lab)| lab == l).map(|(val, _)| val.clone()))
                    .collect(),
                SelectOption::Indexes(indexes) => indexes
                    .iter()
                    .map(|&i| options.get(i).map(|(val, _)| val.clone()))
                    .collect(),
            };
            let selected: Vec<String> = picked
                .into_iter()
                .collect::<Option<_>>()
                .ok_or_else(|| JsonwrightError::driver(format!("option not found in {locator}")))?;
            if let Some(first) = selected.first() {
                state.arena.nodes[idx].value = first.clone();
            }
            Ok(selected)
        })
    }

    async fn set_input_files(&self, locator: &Locator, files: &[PathBuf]) -> JsonwrightResult<()> {
        self.with_node(locator, Some(format!("upload:{locator}={}", files.len())), |state, idx| {
            let node = &mut state.arena.nodes[idx];
            node.files = if node.attrs.contains_key("multiple") {
                files.len()
            } else {
                files.len().min(1)
            };
            Ok(())
        })
    }

    async fn text_content(&self, locator: &Locator) -> JsonwrightResult<Option<String>> {
        self.with_node(locator, None, |state, idx| {
            Ok(Some(state.arena.text_content(idx)))
        })
    }

    async fn input_value(&self, locator: &Locator) -> JsonwrightResult<String> {
        self.with_node(locator, None, |state, idx| {
            Ok(state.arena.nodes[idx].value.clone())
        })
    }

    async fn get_attribute(
        &self,
        locator: &Locator,
        name: &str,
    ) -> JsonwrightResult<Option<String>> {
        self.with_node(locator, None, |state, idx| {
            Ok(attr_of(&state.arena.nodes[idx], name))
        })
    }

    async fn tag_name(&self, locator: &Locator) -> JsonwrightResult<String> {
        self.with_node(locator, None, |state, idx| {
            Ok(state.arena.nodes[idx].tag.clone())
        })
    }

    async fn file_count(&self, locator: &Locator) -> JsonwrightResult<usize> {
        self.with_node(locator, None, |state, idx| Ok(state.arena.nodes[idx].files))
    }

    async fn is_visible(&self, locator: &Locator) -> JsonwrightResult<bool> {
        let state = self.state();
        Ok(state
            .arena
            .resolve(locator)?
            .first()
            .is_some_and(|&i| state.arena.is_visible(i)))
    }

    async fn scroll_into_view(&self, locator: &Locator) -> JsonwrightResult<()> {
        self.with_node(locator, Some(format!("scrollIntoView:{locator}")), |_, _| Ok(()))
    }

    async fn scroll_page(&self, scroll: &PageScroll) -> JsonwrightResult<()> {
        self.state().history.push(format!("scroll:{scroll}"));
        Ok(())
    }

    async fn screenshot(
        &self,
        locator: Option<&Locator>,
        full_page: bool,
    ) -> JsonwrightResult<Vec<u8>> {
        match locator {
            Some(loc) => self.with_node(loc, Some(format!("screenshot:{loc}")), |_, _| Ok(MOCK_PNG.to_vec())),
            None => {
                self.state()
                    .history
                    .push(format!("screenshot:page fullPage={full_page}"));
                Ok(MOCK_PNG.to_vec())
            }
        }
    }

    async fn body_text(&self) -> JsonwrightResult<String> {
        let state = self.state();
        let text: String = state.arena.docs[0]
            .iter()
            .map(|&i| state.arena.text_content(i))
            .collect::<Vec<_>>()
            .join(" ");
        Ok(normalize(&text))
    }

    async fn wait_for_response(
        &self,
        matcher: &ResponseMatcher,
        timeout: Duration,
    ) -> JsonwrightResult<NetworkResponse> {
        let mut state = self.state();
        state.history.push(format!("waitForResponse:{matcher}"));
        while let Some(response) = state.responses.pop_front() {
            if matcher.matches_head(&response.url, response.status) {
                return Ok(response);
            }
        }
        Err(JsonwrightError::Timeout {
            ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            what: matcher.to_string(),
        })
    }

    async fn route(&self, rule: RouteRule) -> JsonwrightResult<()> {
        let mut state = self.state();
        state.history.push(format!("route:{}", rule.source));
        state.routes.add(rule);
        Ok(())
    }

    async fn unroute(&self, pattern: &str) -> JsonwrightResult<()> {
        let mut state = self.state();
        state.history.push(format!("unroute:{pattern}"));
        state.routes.remove(pattern);
        Ok(())
    }

    async fn close(&self) -> JsonwrightResult<()> {
        self.state().history.push("close".to_string());
        Ok(())
    }
}

/// Factory handing out one shared [`MockDriver`]
#[derive(Debug, Clone)]
pub struct MockFactory {
    driver: Arc<MockDriver>,
}

impl MockFactory {
    /// Wrap a driver
    #[must_use]
    pub fn new(driver: MockDriver) -> Self {
        Self {
            driver: Arc::new(driver),
        }
    }

    /// The shared driver
    #[must_use]
    pub const fn driver(&self) -> &Arc<MockDriver> {
        &self.driver
    }
}

#[async_trait]
impl DriverFactory for MockFactory {
    async fn open(&self) -> JsonwrightResult<Arc<dyn BrowserDriver>> {
        self.driver.state().history.push("open".to_string());
        Ok(self.driver.clone())
    }
}
