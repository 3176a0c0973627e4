//! Human-like pacing for the browser tier.
//!
//! Randomized pauses, keystroke timing and synthetic pointer/scroll
//! activity. With humanization disabled every pause collapses to its
//! minimum and no pointer events are sent.

use crate::renderer::RenderContext;
use rand::Rng;
use std::time::Duration;

/// Installed before any page script runs: hides the common automation
/// markers a page can probe.
pub const STEALTH_INIT_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'] });
Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
window.chrome = window.chrome || { runtime: {} };
"#;

/// Pacing policy for one browser job.
#[derive(Debug, Clone, Copy)]
pub struct Humanizer {
    enabled: bool,
}

impl Humanizer {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Sleep between `min_ms` and `max_ms` (exactly `min_ms` when disabled).
    pub async fn pause(&self, min_ms: u64, max_ms: u64) {
        tokio::time::sleep(self.pause_duration(min_ms, max_ms)).await;
    }

    pub fn pause_duration(&self, min_ms: u64, max_ms: u64) -> Duration {
        if !self.enabled || max_ms <= min_ms {
            return Duration::from_millis(min_ms);
        }
        Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
    }

    /// Delay between two typed characters.
    pub fn keystroke_delay(&self) -> Duration {
        self.pause_duration(60, 180)
    }

    /// Move the pointer along a short random path and scroll a little.
    /// Failures are ignored: this is pacing, not interaction.
    pub async fn wander(&self, ctx: &dyn RenderContext) {
        if !self.enabled {
            return;
        }
        let script = pointer_script(&random_path(5));
        if let Err(e) = ctx.execute_js(&script).await {
            tracing::debug!("pointer simulation failed: {e}");
        }
        self.pause(200, 600).await;
    }

    /// Scroll to the bottom to trigger lazy loading.
    pub async fn scroll_to_bottom(&self, ctx: &dyn RenderContext) {
        let script = "window.scrollTo({ top: document.body.scrollHeight, behavior: 'smooth' }); true";
        if let Err(e) = ctx.execute_js(script).await {
            tracing::debug!("scroll failed: {e}");
        }
    }
}

fn random_path(points: usize) -> Vec<(u32, u32)> {
    let mut rng = rand::thread_rng();
    (0..points)
        .map(|_| (rng.gen_range(80..1200), rng.gen_range(80..760)))
        .collect()
}

/// JS that dispatches mousemove events along `path` and scrolls by a small
/// amount.
fn pointer_script(path: &[(u32, u32)]) -> String {
    let points: Vec<String> = path.iter().map(|(x, y)| format!("[{x},{y}]")).collect();
    format!(
        r#"(() => {{
            for (const [x, y] of [{}]) {{
                document.dispatchEvent(new MouseEvent('mousemove', {{ clientX: x, clientY: y, bubbles: true }}));
            }}
            window.scrollBy(0, {});
            return true;
        }})()"#,
        points.join(","),
        path.len() * 60
    )
}
