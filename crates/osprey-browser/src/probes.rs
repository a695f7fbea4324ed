//! JavaScript probe sources evaluated in page context.
//!
//! Probes are observation-only: each returns a JSON-serializable value and
//! all decision logic stays on the Rust side. Dynamic values are spliced in
//! via placeholder tokens rather than string formatting, so the sources read
//! as plain JS.

/// Escapes a value for embedding inside a single-quoted JS string literal.
pub fn escape_js_string(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

/// Readiness sample probe.
///
/// Reports document readiness, the count of in-flight resource loads, and a
/// cheap structural fingerprint (element count + serialized size) of the
/// scoped container, or of the whole document when no scope is given.
pub fn readiness_probe(scope: Option<&str>) -> String {
    let root_expr = match scope {
        Some(selector) => format!(
            "document.querySelector('{}') || document.documentElement",
            escape_js_string(selector)
        ),
        None => "document.documentElement".to_string(),
    };
    READINESS_PROBE.replace("__ROOT__", &root_expr)
}

const READINESS_PROBE: &str = r#"(() => {
  const root = __ROOT__;
  let inflight = 0;
  for (const entry of performance.getEntriesByType('resource')) {
    if (!entry.responseEnd) inflight += 1;
  }
  return {
    documentReady: document.readyState === 'complete',
    inflightRequests: inflight,
    nodeCount: root.querySelectorAll('*').length,
    serializedSize: root.outerHTML.length,
  };
})()"#;

/// Presence probe for explicit selector waits.
pub fn selector_probe(selector: &str) -> String {
    format!(
        "document.querySelector('{}') !== null",
        escape_js_string(selector)
    )
}

/// Synthetic click against a resolved selector.
pub fn click_probe(selector: &str) -> String {
    CLICK_PROBE.replace("__SELECTOR__", &escape_js_string(selector))
}

const CLICK_PROBE: &str = r#"(() => {
  const el = document.querySelector('__SELECTOR__');
  if (!el) return false;
  el.click();
  return true;
})()"#;

/// Sets a field value and fires the input/change events frameworks listen to.
pub fn input_probe(selector: &str, value: &str) -> String {
    INPUT_PROBE
        .replace("__SELECTOR__", &escape_js_string(selector))
        .replace("__VALUE__", &escape_js_string(value))
}

const INPUT_PROBE: &str = r#"(() => {
  const el = document.querySelector('__SELECTOR__');
  if (!el) return false;
  el.focus();
  el.value = '__VALUE__';
  el.dispatchEvent(new Event('input', { bubbles: true }));
  el.dispatchEvent(new Event('change', { bubbles: true }));
  return true;
})()"#;

/// Page-mode facts probe.
///
/// Visibility checking is mandatory here: many sites hide rather than remove
/// modal markup, and DOM presence alone misclassifies those pages.
pub const MODE_PROBE: &str = r#"(() => {
  const visible = (el) => {
    const style = window.getComputedStyle(el);
    if (style.display === 'none' || style.visibility === 'hidden') return false;
    const rect = el.getBoundingClientRect();
    return rect.width > 0 && rect.height > 0;
  };

  let dialogVisible = false;
  for (const el of document.querySelectorAll('dialog, [role="dialog"], [role="alertdialog"]')) {
    if (visible(el)) { dialogVisible = true; break; }
  }

  let dropdownOpen = false;
  for (const el of document.querySelectorAll('[role="combobox"][aria-expanded="true"], [aria-haspopup][aria-expanded="true"], [role="listbox"]')) {
    if (visible(el)) { dropdownOpen = true; break; }
  }

  let overlayCoverage = 0;
  const viewport = window.innerWidth * window.innerHeight;
  if (viewport > 0) {
    for (const el of document.querySelectorAll('body *')) {
      const style = window.getComputedStyle(el);
      if (style.position !== 'fixed' && style.position !== 'absolute') continue;
      if (!visible(el)) continue;
      const rect = el.getBoundingClientRect();
      const coverage = (rect.width * rect.height) / viewport;
      if (coverage > overlayCoverage) overlayCoverage = coverage;
      if (overlayCoverage >= 1) break;
    }
  }

  return { dialogVisible, dropdownOpen, overlayCoverage };
})()"#;

/// Resolver probe: runs every matcher strategy and returns per-strategy
/// candidate arrays. Strategy composition happens on the Rust side.
pub fn resolver_probe(
    reference: &str,
    scope: Option<&str>,
    use_test_id: bool,
    use_css: bool,
) -> String {
    let scope_expr = match scope {
        Some(selector) => format!(
            "document.querySelector('{}') || document",
            escape_js_string(selector)
        ),
        None => "document".to_string(),
    };
    RESOLVER_PROBE
        .replace("__REFERENCE__", &escape_js_string(reference))
        .replace("__SCOPE__", &scope_expr)
        .replace("__USE_TESTID__", if use_test_id { "true" } else { "false" })
        .replace("__USE_CSS__", if use_css { "true" } else { "false" })
}

const RESOLVER_PROBE: &str = r#"(() => {
  const reference = '__REFERENCE__';
  const scope = __SCOPE__;
  const useTestId = __USE_TESTID__;
  const useCss = __USE_CSS__;

  const visible = (el) => {
    const style = window.getComputedStyle(el);
    if (style.display === 'none' || style.visibility === 'hidden') return false;
    const rect = el.getBoundingClientRect();
    return rect.width > 0 && rect.height > 0;
  };
  const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();

  const cssPath = (el) => {
    const parts = [];
    let node = el;
    while (node && node.nodeType === 1 && parts.length < 6) {
      if (node.id) {
        parts.unshift('#' + CSS.escape(node.id));
        break;
      }
      let part = node.tagName.toLowerCase();
      const parent = node.parentElement;
      if (parent) {
        const siblings = Array.from(parent.children).filter(c => c.tagName === node.tagName);
        if (siblings.length > 1) part += ':nth-of-type(' + (siblings.indexOf(node) + 1) + ')';
      }
      parts.unshift(part);
      node = parent;
    }
    return parts.join(' > ');
  };

  const LANDMARKS = ['main', 'nav', 'form', 'header', 'footer', 'aside', 'section', 'table'];
  const containerOf = (el) => {
    let node = el.parentElement;
    while (node && node !== document.body) {
      if (node.id || node.getAttribute('role') || LANDMARKS.includes(node.tagName.toLowerCase())) {
        return {
          selector: cssPath(node),
          childCount: node.querySelectorAll('*').length,
          serializedSize: node.outerHTML.length,
        };
      }
      node = node.parentElement;
    }
    return null;
  };

  const describe = (el) => ({
    selector: cssPath(el),
    role: el.getAttribute('role') || el.tagName.toLowerCase(),
    name: el.getAttribute('aria-label') || '',
    text: norm(el.innerText || el.value || '').slice(0, 80),
    container: containerOf(el),
  });

  const sets = { testId: [], ariaLabel: [], text: [], cssSelector: [] };

  if (useTestId) {
    const bare = reference.startsWith('#') ? reference.slice(1) : reference;
    try {
      for (const el of scope.querySelectorAll('[data-testid="' + bare + '"]')) {
        sets.testId.push(describe(el));
      }
    } catch (e) {}
    const byId = document.getElementById(bare);
    if (byId) sets.testId.push(describe(byId));
  }

  for (const el of scope.querySelectorAll('[aria-label]')) {
    if (el.getAttribute('aria-label') === reference && visible(el)) {
      sets.ariaLabel.push(describe(el));
    }
  }

  const clickable = scope.querySelectorAll(
    'a, button, [role="button"], input[type="submit"], input[type="button"], ' +
    'label, summary, [role="tab"], [role="menuitem"], [role="option"], [role="link"]'
  );
  for (const el of clickable) {
    if (!visible(el)) continue;
    if (norm(el.innerText || el.value) === reference) sets.text.push(describe(el));
  }
  if (sets.text.length === 0) {
    const wanted = norm(reference).toLowerCase();
    for (const el of clickable) {
      if (!visible(el)) continue;
      if (norm(el.innerText || el.value).toLowerCase() === wanted) sets.text.push(describe(el));
    }
  }

  if (useCss) {
    try {
      for (const el of scope.querySelectorAll(reference)) {
        sets.cssSelector.push(describe(el));
        if (sets.cssSelector.length > 9) break;
      }
    } catch (e) {}
  }

  return sets;
})()"#;

/// Canonicalization probe: renders the visible DOM as deterministic text,
/// one line per salient node, suitable for line diffing.
pub const SNAPSHOT_PROBE: &str = r#"(() => {
  const lines = [];
  const visible = (el) => {
    const style = window.getComputedStyle(el);
    if (style.display === 'none' || style.visibility === 'hidden') return false;
    const rect = el.getBoundingClientRect();
    return rect.width > 0 && rect.height > 0;
  };
  const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();

  const walk = (node) => {
    if (node.nodeType !== 1) return;
    const tag = node.tagName.toLowerCase();
    if (tag === 'script' || tag === 'style' || tag === 'noscript' || tag === 'template') return;
    if (!visible(node)) return;

    if (/^h[1-6]$/.test(tag)) {
      const text = norm(node.innerText);
      if (text) lines.push('heading ' + text);
      return;
    }
    if (tag === 'a') {
      const text = norm(node.innerText) || norm(node.getAttribute('aria-label'));
      lines.push('link ' + (text || '(unnamed)') + ' -> ' + (node.getAttribute('href') || ''));
      return;
    }
    if (tag === 'button' || node.getAttribute('role') === 'button') {
      const text = norm(node.innerText) || norm(node.getAttribute('aria-label'));
      lines.push('button ' + (text || '(unnamed)'));
      return;
    }
    if (tag === 'input') {
      const kind = node.type || 'text';
      if (kind === 'hidden') return;
      const label = node.name || node.placeholder || node.getAttribute('aria-label') || '';
      lines.push('input[' + kind + '] ' + label + (node.value ? ' (filled)' : ''));
      return;
    }
    if (tag === 'textarea') {
      const label = node.name || node.placeholder || '';
      lines.push('textarea ' + label + (node.value ? ' (filled)' : ''));
      return;
    }
    if (tag === 'select') {
      const selected = node.selectedOptions[0];
      lines.push('select ' + (node.name || '') + ' = ' + (selected ? norm(selected.innerText) : ''));
      return;
    }
    if (tag === 'img') {
      const alt = norm(node.getAttribute('alt'));
      if (alt) lines.push('image ' + alt);
      return;
    }

    let ownText = '';
    for (const child of node.childNodes) {
      if (child.nodeType === 3) ownText += child.textContent + ' ';
    }
    ownText = norm(ownText);
    if (ownText) lines.push('text ' + ownText);

    for (const child of node.children) walk(child);
  };

  if (document.body) walk(document.body);
  return lines.join('\n');
})()"#;
