//! Selectors, fallback chains and per-page selector sets.
//!
//! A logical element ("loginButton") maps to a [`SelectorChain`] of
//! candidates, usually a `data-testid` first and a semantic CSS class
//! second. The first candidate with at least one match wins, and waits
//! re-check every candidate on each poll so a fallback that renders late is
//! still found. When nothing matches, the primary candidate is used so
//! errors name it.

use crate::driver::PageDriver;
use crate::result::{SondeoError, SondeoResult};
use crate::wait::{poll_until, ElementState, WaitOptions};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Duration;

/// Quote a value as a CSS string literal
#[must_use]
pub fn css_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(c);
            }
            c if c.is_control() => {
                let _ = write!(quoted, "\\{:x} ", u32::from(c));
            }
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// One locator candidate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// CSS selector (e.g., "button.primary")
    Css(String),
    /// Test ID selector (data-testid attribute)
    TestId(String),
    /// XPath selector
    XPath(String),
    /// Visible text selector
    Text(String),
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create a test ID selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    /// Create a text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Parse a driver locator string (`xpath=`, `text=` prefixes, else CSS)
    #[must_use]
    pub fn parse(locator: &str) -> Self {
        if let Some(expr) = locator.strip_prefix("xpath=") {
            Self::XPath(expr.to_string())
        } else if let Some(text) = locator.strip_prefix("text=") {
            Self::Text(text.to_string())
        } else {
            Self::Css(locator.to_string())
        }
    }

    /// Render as a driver locator string
    #[must_use]
    pub fn to_locator(&self) -> String {
        match self {
            Self::Css(s) => s.clone(),
            Self::TestId(id) => format!("[data-testid={}]", css_string(id)),
            Self::XPath(expr) => format!("xpath={expr}"),
            Self::Text(text) => format!("text={text}"),
        }
    }

    /// Whether the selector is expressible in CSS
    #[must_use]
    pub const fn is_css(&self) -> bool {
        matches!(self, Self::Css(_) | Self::TestId(_))
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_locator())
    }
}

impl From<&str> for Selector {
    fn from(locator: &str) -> Self {
        Self::parse(locator)
    }
}

/// Ordered, non-empty list of candidates for one logical element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorChain {
    candidates: Vec<Selector>,
}

impl SelectorChain {
    /// Chain with a single primary candidate
    #[must_use]
    pub fn new(primary: impl Into<Selector>) -> Self {
        Self {
            candidates: vec![primary.into()],
        }
    }

    /// Append a fallback candidate
    #[must_use]
    pub fn or(mut self, fallback: impl Into<Selector>) -> Self {
        self.candidates.push(fallback.into());
        self
    }

    /// The first candidate
    #[must_use]
    pub fn primary(&self) -> &Selector {
        &self.candidates[0]
    }

    /// All candidates in priority order
    #[must_use]
    pub fn candidates(&self) -> &[Selector] {
        &self.candidates
    }

    /// Comma-joined CSS union, when every candidate is CSS-expressible
    #[must_use]
    pub fn css_union(&self) -> Option<String> {
        self.candidates
            .iter()
            .all(Selector::is_css)
            .then(|| {
                self.candidates
                    .iter()
                    .map(Selector::to_locator)
                    .collect::<Vec<_>>()
                    .join(", ")
            })
    }

    /// Locator of the first candidate matching at least one element,
    /// or the primary candidate when none match.
    pub async fn resolve(&self, driver: &dyn PageDriver) -> SondeoResult<String> {
        for candidate in &self.candidates {
            let locator = candidate.to_locator();
            if driver.count(&locator).await? > 0 {
                return Ok(locator);
            }
        }
        Ok(self.primary().to_locator())
    }

    /// Wait until the chain reaches `state`, returning the locator to act on.
    ///
    /// For `Visible` and `Attached` that is the first candidate in priority
    /// order satisfying the state, re-checked on every poll. `Hidden` and
    /// `Detached` need every candidate to satisfy the state and yield the
    /// primary.
    pub async fn wait_for(
        &self,
        driver: &dyn PageDriver,
        state: ElementState,
        timeout: Duration,
    ) -> SondeoResult<String> {
        if let [only] = self.candidates.as_slice() {
            let locator = only.to_locator();
            driver.wait_for_selector(&locator, state, timeout).await?;
            return Ok(locator);
        }
        let any = matches!(state, ElementState::Visible | ElementState::Attached);
        let options =
            WaitOptions::new().with_timeout(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        poll_until(&options, &format!("'{self}' to be {state}"), || async move {
            for candidate in &self.candidates {
                let locator = candidate.to_locator();
                let attached = driver.count(&locator).await? > 0;
                let visible = attached && driver.is_visible(&locator).await?;
                let satisfied = state.is_satisfied(attached, visible);
                if any && satisfied {
                    return Ok(Some(locator));
                }
                if !any && !satisfied {
                    return Ok(None);
                }
            }
            Ok((!any).then(|| self.primary().to_locator()))
        })
        .await
    }
}

impl From<Selector> for SelectorChain {
    fn from(selector: Selector) -> Self {
        Self::new(selector)
    }
}

impl From<&str> for SelectorChain {
    fn from(locator: &str) -> Self {
        Self::new(Selector::parse(locator))
    }
}

impl std::fmt::Display for SelectorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self.candidates.iter().map(Selector::to_locator).collect();
        f.write_str(&rendered.join(" | "))
    }
}

/// Immutable map of logical element name to selector chain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorSet {
    page: String,
    chains: BTreeMap<String, SelectorChain>,
}

impl SelectorSet {
    /// Start building a set for the named page
    #[must_use]
    pub fn builder(page: impl Into<String>) -> SelectorSetBuilder {
        SelectorSetBuilder {
            set: Self {
                page: page.into(),
                chains: BTreeMap::new(),
            },
        }
    }

    /// Chain for a logical element
    pub fn get(&self, name: &str) -> SondeoResult<&SelectorChain> {
        self.chains.get(name).ok_or_else(|| {
            SondeoError::config(format!(
                "page '{}' has no element named '{name}'",
                self.page
            ))
        })
    }

    /// Whether a logical element is defined
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.chains.contains_key(name)
    }

    /// Logical element names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.chains.keys().map(String::as_str)
    }

    /// Number of logical elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

/// Builder for [`SelectorSet`]
#[derive(Debug)]
pub struct SelectorSetBuilder {
    set: SelectorSet,
}

impl SelectorSetBuilder {
    /// Define a logical element
    #[must_use]
    pub fn element(mut self, name: impl Into<String>, chain: impl Into<SelectorChain>) -> Self {
        self.set.chains.insert(name.into(), chain.into());
        self
    }

    /// Finish the set
    #[must_use]
    pub fn build(self) -> SelectorSet {
        self.set
    }
}
