//! Page scripts evaluated by [`super::BrowserPage`].
//!
//! Every script is a self-invoking expression returning `JSON.stringify(..)`
//! of its result, so replies always parse as JSON.

use crate::platforms::ElementHandle;

/// Attribute used to re-locate elements between evaluations
pub const HANDLE_ATTR: &str = "data-chat-exporter-id";
/// Page-global holding the clipboard hook state
const HOOK_GLOBAL: &str = "__chatExporterClipboard";
const OVERLAY_ID: &str = "chat-exporter-status";

/// Quote `s` as a JavaScript string literal
fn js_str(s: &str) -> String {
    // JSON strings are valid JS string literals
    serde_json::Value::String(s.to_string()).to_string()
}

fn by_handle(handle: &ElementHandle) -> String {
    js_str(&format!(r#"[{HANDLE_ATTR}="{}"]"#, handle.id()))
}

/// Shared tagging helper, inlined into scripts that hand out handles
fn tag_fn() -> String {
    format!(
        r#"const tag = (node) => {{
    if (!node.hasAttribute({attr})) {{
      window.__chatExporterSeq = (window.__chatExporterSeq || 0) + 1;
      node.setAttribute({attr}, String(window.__chatExporterSeq));
    }}
    return Number(node.getAttribute({attr}));
  }};"#,
        attr = js_str(HANDLE_ATTR)
    )
}

/// Tag every match of `selector` and return the ids in document order
pub fn tag_all(selector: &str) -> String {
    format!(
        r#"(() => {{
  {tag}
  const nodes = Array.from(document.querySelectorAll({sel}));
  return JSON.stringify(nodes.map(tag));
}})()"#,
        tag = tag_fn(),
        sel = js_str(selector)
    )
}

/// Dispatch a bubbling mouse event (`mouseenter` / `mouseleave`)
pub fn dispatch_pointer(handle: &ElementHandle, event: &str) -> String {
    format!(
        r#"(() => {{
  const node = document.querySelector({target});
  if (!node) return JSON.stringify(false);
  node.dispatchEvent(new MouseEvent({event}, {{ bubbles: true }}));
  return JSON.stringify(true);
}})()"#,
        target = by_handle(handle),
        event = js_str(event)
    )
}

/// Find the edit control within the message's enclosing group
pub fn find_edit_control(handle: &ElementHandle, group: &str, edit: &str) -> String {
    format!(
        r#"(() => {{
  {tag}
  const node = document.querySelector({target});
  const group = node ? node.closest({group}) : null;
  const control = group ? group.querySelector({edit}) : null;
  return JSON.stringify(control ? tag(control) : null);
}})()"#,
        tag = tag_fn(),
        target = by_handle(handle),
        group = js_str(group),
        edit = js_str(edit)
    )
}

pub fn click(handle: &ElementHandle) -> String {
    format!(
        r#"(() => {{
  const node = document.querySelector({target});
  if (!node) throw new Error('element {id} is detached');
  node.click();
  return JSON.stringify(true);
}})()"#,
        target = by_handle(handle),
        id = handle.id()
    )
}

pub fn read_textarea(selector: &str) -> String {
    format!(
        r#"(() => {{
  const area = document.querySelector({sel});
  return JSON.stringify(area ? area.value : null);
}})()"#,
        sel = js_str(selector)
    )
}

pub fn press_escape() -> String {
    r#"(() => {
  document.dispatchEvent(new KeyboardEvent('keydown', { key: 'Escape' }));
  return JSON.stringify(true);
})()"#
        .to_string()
}

pub fn is_rendered(handle: &ElementHandle) -> String {
    format!(
        r#"(() => {{
  const node = document.querySelector({target});
  return JSON.stringify(!!node && node.offsetParent !== null);
}})()"#,
        target = by_handle(handle)
    )
}

pub fn scroll_into_view(handle: &ElementHandle) -> String {
    format!(
        r#"(() => {{
  const node = document.querySelector({target});
  if (!node) throw new Error('element {id} is detached');
  node.scrollIntoView({{ behavior: 'instant', block: 'nearest' }});
  return JSON.stringify(true);
}})()"#,
        target = by_handle(handle),
        id = handle.id()
    )
}

pub fn read_title(selector: &str) -> String {
    format!(
        r#"(() => {{
  const node = document.querySelector({sel});
  const text = node && node.textContent ? node.textContent.trim() : '';
  return JSON.stringify(text || null);
}})()"#,
        sel = js_str(selector)
    )
}

/// Swap `navigator.clipboard.writeText` for a wrapper queueing every write
pub fn install_clipboard_hook(forward: bool) -> String {
    format!(
        r#"(() => {{
  const clip = navigator.clipboard;
  if (window[{hook}]) return JSON.stringify('already-installed');
  const state = {{ original: clip.writeText, writes: [] }};
  window[{hook}] = state;
  clip.writeText = function (text) {{
    state.writes.push(String(text ?? ''));
    if ({forward}) return state.original.call(clip, text);
    return Promise.resolve();
  }};
  return JSON.stringify('installed');
}})()"#,
        hook = js_str(HOOK_GLOBAL),
        forward = forward
    )
}

/// Take every queued write, oldest first
pub fn drain_clipboard() -> String {
    format!(
        r#"(() => {{
  const state = window[{hook}];
  return JSON.stringify(state ? state.writes.splice(0) : []);
}})()"#,
        hook = js_str(HOOK_GLOBAL)
    )
}

/// Put the original writer back; returns writes still queued
pub fn restore_clipboard() -> String {
    format!(
        r#"(() => {{
  const state = window[{hook}];
  if (!state) return JSON.stringify([]);
  navigator.clipboard.writeText = state.original;
  delete window[{hook}];
  return JSON.stringify(state.writes.splice(0));
}})()"#,
        hook = js_str(HOOK_GLOBAL)
    )
}

pub fn show_overlay(text: &str, background: &str) -> String {
    format!(
        r#"(() => {{
  let box = document.getElementById({id});
  if (!box) {{
    box = document.createElement('div');
    box.id = {id};
    box.style.cssText = 'position: fixed; top: 10px; right: 10px; z-index: 10000; color: white; padding: 10px 15px; border-radius: 5px; font-family: monospace; font-size: 12px; box-shadow: 0 2px 10px rgba(0,0,0,0.3); max-width: 300px;';
    document.body.appendChild(box);
  }}
  box.style.background = {bg};
  box.textContent = {text};
  return JSON.stringify(true);
}})()"#,
        id = js_str(OVERLAY_ID),
        bg = js_str(background),
        text = js_str(text)
    )
}

pub fn remove_overlay() -> String {
    format!(
        r#"(() => {{
  const box = document.getElementById({id});
  if (box) box.remove();
  return JSON.stringify(true);
}})()"#,
        id = js_str(OVERLAY_ID)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_are_quoted_as_js_literals() {
        let script = tag_all(r#"[data-testid="user-message"]"#);
        assert!(script.contains(r#"document.querySelectorAll("[data-testid=\"user-message\"]")"#));
    }

    #[test]
    fn handles_are_located_by_attribute() {
        let script = click(&ElementHandle::new(7));
        assert!(script.contains(r#""[data-chat-exporter-id=\"7\"]""#));
    }

    #[test]
    fn hook_forwarding_is_baked_into_the_wrapper() {
        assert!(install_clipboard_hook(true).contains("if (true)"));
        assert!(install_clipboard_hook(false).contains("if (false)"));
    }

    #[test]
    fn overlay_text_cannot_break_out_of_the_literal() {
        let script = show_overlay("Error: '); alert(1); ('", "#f44336");
        assert!(script.contains(r#"box.textContent = "Error: '); alert(1); ('";"#));
    }
}
