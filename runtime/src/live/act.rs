//! Form interaction steps on a live page.
//!
//! Each step works from an ordered list of candidate selectors because the
//! source reshuffles its markup. Values are only ever injected into JS
//! string literals after `sanitize_js_string`.

use crate::renderer::{sanitize_js_string, RenderContext};
use crate::stealth::Humanizer;
use anyhow::{bail, Context, Result};

/// First candidate selector that matches an element on the page.
pub async fn first_present<'a>(ctx: &dyn RenderContext, candidates: &[&'a str]) -> Option<&'a str> {
    for candidate in candidates {
        let probe = format!(
            "document.querySelector('{}') !== null",
            sanitize_js_string(candidate)
        );
        if let Ok(found) = ctx.execute_js(&probe).await {
            if found.as_bool() == Some(true) {
                return Some(*candidate);
            }
        }
    }
    None
}

/// Type `text` one character at a time with human-like gaps.
pub async fn type_humanly(
    ctx: &dyn RenderContext,
    selector: &str,
    text: &str,
    human: &Humanizer,
) -> Result<()> {
    // Clear any prefilled value first.
    let clear = format!(
        "(() => {{ const el = document.querySelector('{}'); if (el) {{ el.value = ''; }} return true; }})()",
        sanitize_js_string(selector)
    );
    ctx.execute_js(&clear).await?;

    for ch in text.chars() {
        ctx.type_text(selector, &ch.to_string())
            .await
            .with_context(|| format!("failed to type into {selector}"))?;
        tokio::time::sleep(human.keystroke_delay()).await;
    }
    Ok(())
}

/// Click the first suggestion whose text contains `needle`
/// (case-insensitive). Returns whether one was clicked.
pub async fn click_suggestion(ctx: &dyn RenderContext, item_selector: &str, needle: &str) -> Result<bool> {
    let script = format!(
        r#"(() => {{
            const needle = '{}'.toUpperCase();
            const items = Array.from(document.querySelectorAll('{}'));
            const hit = items.find(el => (el.innerText || el.textContent || '').toUpperCase().includes(needle));
            if (!hit) return false;
            (hit.querySelector('a, button') || hit).click();
            return true;
        }})()"#,
        sanitize_js_string(needle),
        sanitize_js_string(item_selector)
    );
    let clicked = ctx.execute_js(&script).await?;
    Ok(clicked.as_bool() == Some(true))
}

/// Submit the form: click a detected submit control, else press Enter in
/// the input.
pub async fn submit(ctx: &dyn RenderContext, input_selector: &str, submit_candidates: &[&str]) -> Result<()> {
    if let Some(button) = first_present(ctx, submit_candidates).await {
        match ctx.click(button).await {
            Ok(()) => return Ok(()),
            Err(e) => tracing::debug!("submit click on {button} failed: {e:#}, pressing Enter"),
        }
    }
    ctx.press_key(input_selector, "Enter").await
}

/// Current `innerText` of the page body.
pub async fn body_text(ctx: &dyn RenderContext) -> Result<String> {
    let value = ctx
        .execute_js("document.body ? document.body.innerText : ''")
        .await?;
    match value.as_str() {
        Some(text) => Ok(text.to_string()),
        None => bail!("page body text was not a string"),
    }
}

/// Short text runs that contain a percent sign, one per element.
pub async fn percent_fragments(ctx: &dyn RenderContext, max_len: usize) -> Result<Vec<String>> {
    let script = format!(
        r#"Array.from(document.querySelectorAll('li, td, th, div, span, p'))
            .map(el => (el.innerText || '').replace(/\s+/g, ' ').trim())
            .filter(t => t.length > 0 && t.length <= {max_len} && t.includes('%'))
            .slice(0, 500)"#
    );
    let value = ctx.execute_js(&script).await?;
    Ok(value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::NavigationResult;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every interaction; probes succeed for selectors in `present`.
    #[derive(Default)]
    struct ScriptedContext {
        present: Vec<&'static str>,
        typed: Mutex<String>,
        clicks: Mutex<Vec<String>>,
        keys: Mutex<Vec<String>>,
        fail_clicks: bool,
    }

    #[async_trait]
    impl RenderContext for ScriptedContext {
        async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<NavigationResult> {
            Ok(NavigationResult {
                final_url: url.to_string(),
                load_time_ms: 0,
            })
        }
        async fn execute_js(&self, script: &str) -> Result<serde_json::Value> {
            if script.starts_with("document.querySelector(") {
                let hit = self.present.iter().any(|p| script.contains(&sanitize_js_string(p)));
                return Ok(serde_json::Value::Bool(hit));
            }
            Ok(serde_json::Value::Bool(true))
        }
        async fn get_html(&self) -> Result<String> {
            Ok(String::new())
        }
        async fn get_url(&self) -> Result<String> {
            Ok(String::new())
        }
        async fn type_text(&self, _selector: &str, text: &str) -> Result<()> {
            self.typed.lock().unwrap().push_str(text);
            Ok(())
        }
        async fn click(&self, selector: &str) -> Result<()> {
            if self.fail_clicks {
                bail!("element not interactable");
            }
            self.clicks.lock().unwrap().push(selector.to_string());
            Ok(())
        }
        async fn press_key(&self, _selector: &str, key: &str) -> Result<()> {
            self.keys.lock().unwrap().push(key.to_string());
            Ok(())
        }
        async fn close(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_first_present_respects_order() {
        let ctx = ScriptedContext {
            present: vec!["input#b", "input#c"],
            ..Default::default()
        };
        let found = first_present(&ctx, &["input#a", "input#c", "input#b"]).await;
        assert_eq!(found, Some("input#c"));
        assert_eq!(first_present(&ctx, &["input#z"]).await, None);
    }

    #[tokio::test]
    async fn test_types_every_character() {
        let ctx = ScriptedContext::default();
        type_humanly(&ctx, "#q", "M&M", &Humanizer::new(false))
            .await
            .unwrap();
        assert_eq!(*ctx.typed.lock().unwrap(), "M&M");
    }

    #[tokio::test]
    async fn test_submit_prefers_button_then_enter() {
        let ctx = ScriptedContext {
            present: vec!["button#go"],
            ..Default::default()
        };
        submit(&ctx, "#q", &["button#go"]).await.unwrap();
        assert_eq!(*ctx.clicks.lock().unwrap(), vec!["button#go".to_string()]);
        assert!(ctx.keys.lock().unwrap().is_empty());

        let ctx = ScriptedContext {
            present: vec!["button#go"],
            fail_clicks: true,
            ..Default::default()
        };
        submit(&ctx, "#q", &["button#go"]).await.unwrap();
        assert_eq!(*ctx.keys.lock().unwrap(), vec!["Enter".to_string()]);
    }
}
