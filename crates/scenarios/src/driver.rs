//! Page driver abstraction and the Playwright bridge
//!
//! Page objects talk to a `PageDriver`; in CI that is the in-memory ERP
//! simulation, against a real deployment it is `PlaywrightDriver`, which
//! keeps one long-lived `node` child running a small Playwright bridge
//! script and exchanges NDJSON commands with it over stdin/stdout.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use prodflow_harness::{HarnessError, HarnessResult, RowSnapshot};

/// Element state to await, mirroring the driver's selector states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    Visible,
    Hidden,
    Attached,
    Detached,
}

impl WaitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitState::Visible => "visible",
            WaitState::Hidden => "hidden",
            WaitState::Attached => "attached",
            WaitState::Detached => "detached",
        }
    }
}

/// Everything a page object may ask of the browser
///
/// `wait_for` reports whether the state was reached rather than erroring
/// on timeout: the caller decides whether a miss is a legitimate alternate
/// outcome or a structural failure.
#[async_trait]
pub trait PageDriver: Send {
    async fn goto(&mut self, path: &str) -> HarnessResult<()>;
    async fn fill(&mut self, selector: &str, value: &str) -> HarnessResult<()>;
    async fn press(&mut self, selector: &str, key: &str) -> HarnessResult<()>;
    async fn click(&mut self, selector: &str) -> HarnessResult<()>;
    async fn click_nth(&mut self, selector: &str, index: usize) -> HarnessResult<()>;
    async fn texts(&mut self, selector: &str) -> HarnessResult<Vec<String>>;
    async fn attr(&mut self, selector: &str, name: &str) -> HarnessResult<Option<String>>;
    async fn count(&mut self, selector: &str) -> HarnessResult<usize>;
    async fn table_rows(&mut self, row_selector: &str) -> HarnessResult<Vec<RowSnapshot>>;
    async fn wait_for(
        &mut self,
        selector: &str,
        state: WaitState,
        timeout: Duration,
    ) -> HarnessResult<bool>;
    async fn screenshot(&mut self, name: &str) -> HarnessResult<Option<PathBuf>>;

    /// Second tab/session sharing the same backend view, for scenarios
    /// that perform a side effect without losing the primary tab's
    /// navigation state.
    async fn open_secondary(&mut self) -> HarnessResult<Box<dyn PageDriver>>;
}

/// Wait for `selector` to be visible, falling back to `attached` once
/// before escalating. Rendering races make "attached but not yet painted"
/// a recoverable state, a selector in neither state is structural.
pub async fn wait_visible_or_attached(
    driver: &mut (impl PageDriver + ?Sized),
    selector: &str,
    timeout: Duration,
) -> HarnessResult<()> {
    if driver.wait_for(selector, WaitState::Visible, timeout).await? {
        return Ok(());
    }
    warn!(selector, "not visible in time, retrying as attached");
    if driver.wait_for(selector, WaitState::Attached, timeout).await? {
        return Ok(());
    }
    Err(HarnessError::StructuralAbsence(format!(
        "'{selector}' neither visible nor attached within {} ms",
        2 * timeout.as_millis()
    )))
}

/// One command to the bridge script
#[derive(Debug, Serialize)]
struct BridgeCommand<'a> {
    id: u64,
    page: u32,
    op: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    selector: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout_ms: Option<u64>,
}

impl<'a> BridgeCommand<'a> {
    fn new(op: &'a str) -> Self {
        Self {
            id: 0,
            page: 0,
            op,
            selector: None,
            value: None,
            index: None,
            timeout_ms: None,
        }
    }

    fn selector(mut self, selector: &'a str) -> Self {
        self.selector = Some(selector);
        self
    }

    fn value(mut self, value: &'a str) -> Self {
        self.value = Some(value);
        self
    }
}

/// One answer from the bridge script
#[derive(Debug, Deserialize)]
struct BridgeResponse {
    id: u64,
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    texts: Option<Vec<String>>,
    #[serde(default)]
    attr: Option<String>,
    #[serde(default)]
    count: Option<usize>,
    #[serde(default)]
    rows: Option<Vec<RowSnapshot>>,
    #[serde(default)]
    reached: Option<bool>,
}

/// The node child and its pipes, shared between primary and secondary
/// driver handles
struct Bridge {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    next_page: u32,
}

impl Bridge {
    async fn send(&mut self, mut cmd: BridgeCommand<'_>, page: u32) -> HarnessResult<BridgeResponse> {
        self.next_id += 1;
        cmd.id = self.next_id;
        cmd.page = page;

        let line = serde_json::to_string(&cmd)?;
        debug!(command = %line, "bridge send");
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;

        // The bridge answers strictly in order; commands with their own
        // element timeouts get headroom on top of it here.
        let budget = Duration::from_millis(cmd.timeout_ms.unwrap_or(0) + 30_000);
        let line = tokio::time::timeout(budget, self.stdout.next_line())
            .await
            .map_err(|_| HarnessError::Driver(format!("bridge unresponsive on op '{}'", cmd.op)))?
            .map_err(HarnessError::Io)?
            .ok_or_else(|| HarnessError::Driver("bridge closed its stdout".to_string()))?;

        let resp: BridgeResponse = serde_json::from_str(&line)?;
        if resp.id != cmd.id {
            return Err(HarnessError::Driver(format!(
                "bridge answered out of order: sent {}, got {}",
                cmd.id, resp.id
            )));
        }
        if !resp.ok {
            return Err(HarnessError::Driver(
                resp.error.unwrap_or_else(|| format!("op '{}' failed", cmd.op)),
            ));
        }
        Ok(resp)
    }
}

/// Playwright configuration
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub screenshot_dir: PathBuf,
    pub headless: bool,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            screenshot_dir: PathBuf::from("test-results/screenshots"),
            headless: true,
        }
    }
}

/// Driver handle over the shared bridge; `page` selects the tab
#[derive(Clone)]
pub struct PlaywrightDriver {
    bridge: Arc<Mutex<Bridge>>,
    page: u32,
    base_url: String,
    screenshot_dir: PathBuf,
}

impl PlaywrightDriver {
    /// Spawn the node bridge and open the primary page.
    pub async fn launch(config: PlaywrightConfig) -> HarnessResult<Self> {
        std::fs::create_dir_all(&config.screenshot_dir)?;

        let dir = std::env::temp_dir();
        let script_path = dir.join(format!("prodflow-bridge-{}.js", std::process::id()));
        std::fs::write(&script_path, bridge_script(config.headless))?;

        let mut child = Command::new("node")
            .arg(&script_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| HarnessError::Driver(format!("failed to spawn node bridge: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| HarnessError::Driver("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| HarnessError::Driver("bridge stdout unavailable".to_string()))?;

        let mut bridge = Bridge {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 0,
            next_page: 1,
        };

        // First exchange doubles as the launch handshake.
        bridge.send(BridgeCommand::new("ping"), 0).await?;

        Ok(Self {
            bridge: Arc::new(Mutex::new(bridge)),
            page: 0,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            screenshot_dir: config.screenshot_dir,
        })
    }

    /// Close the browser and the node child.
    pub async fn shutdown(&mut self) -> HarnessResult<()> {
        let mut bridge = self.bridge.lock().await;
        let _ = bridge.send(BridgeCommand::new("close"), self.page).await;
        let _ = bridge.child.kill().await;
        Ok(())
    }

    async fn send(&mut self, cmd: BridgeCommand<'_>) -> HarnessResult<BridgeResponse> {
        self.bridge.lock().await.send(cmd, self.page).await
    }
}

#[async_trait]
impl PageDriver for PlaywrightDriver {
    async fn goto(&mut self, path: &str) -> HarnessResult<()> {
        let url = format!("{}{}", self.base_url, path);
        self.send(BridgeCommand::new("goto").value(&url)).await?;
        Ok(())
    }

    async fn fill(&mut self, selector: &str, value: &str) -> HarnessResult<()> {
        self.send(BridgeCommand::new("fill").selector(selector).value(value))
            .await?;
        Ok(())
    }

    async fn press(&mut self, selector: &str, key: &str) -> HarnessResult<()> {
        self.send(BridgeCommand::new("press").selector(selector).value(key))
            .await?;
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> HarnessResult<()> {
        self.send(BridgeCommand::new("click").selector(selector)).await?;
        Ok(())
    }

    async fn click_nth(&mut self, selector: &str, index: usize) -> HarnessResult<()> {
        let mut cmd = BridgeCommand::new("click_nth").selector(selector);
        cmd.index = Some(index);
        self.send(cmd).await?;
        Ok(())
    }

    async fn texts(&mut self, selector: &str) -> HarnessResult<Vec<String>> {
        let resp = self.send(BridgeCommand::new("texts").selector(selector)).await?;
        Ok(resp.texts.unwrap_or_default())
    }

    async fn attr(&mut self, selector: &str, name: &str) -> HarnessResult<Option<String>> {
        let resp = self
            .send(BridgeCommand::new("attr").selector(selector).value(name))
            .await?;
        Ok(resp.attr)
    }

    async fn count(&mut self, selector: &str) -> HarnessResult<usize> {
        let resp = self.send(BridgeCommand::new("count").selector(selector)).await?;
        Ok(resp.count.unwrap_or(0))
    }

    async fn table_rows(&mut self, row_selector: &str) -> HarnessResult<Vec<RowSnapshot>> {
        let resp = self
            .send(BridgeCommand::new("rows").selector(row_selector))
            .await?;
        Ok(resp.rows.unwrap_or_default())
    }

    async fn wait_for(
        &mut self,
        selector: &str,
        state: WaitState,
        timeout: Duration,
    ) -> HarnessResult<bool> {
        let mut cmd = BridgeCommand::new("wait_for")
            .selector(selector)
            .value(state.as_str());
        cmd.timeout_ms = Some(timeout.as_millis() as u64);
        let resp = self.send(cmd).await?;
        Ok(resp.reached.unwrap_or(false))
    }

    async fn screenshot(&mut self, name: &str) -> HarnessResult<Option<PathBuf>> {
        let path = self.screenshot_dir.join(format!("{name}.png"));
        let path_str = path.to_string_lossy().to_string();
        self.send(BridgeCommand::new("screenshot").value(&path_str))
            .await?;
        Ok(Some(path))
    }

    async fn open_secondary(&mut self) -> HarnessResult<Box<dyn PageDriver>> {
        let page = {
            let mut bridge = self.bridge.lock().await;
            let page = bridge.next_page;
            bridge.next_page += 1;
            let mut cmd = BridgeCommand::new("new_page");
            cmd.index = Some(page as usize);
            bridge.send(cmd, self.page).await?;
            page
        };
        Ok(Box::new(PlaywrightDriver {
            bridge: self.bridge.clone(),
            page,
            base_url: self.base_url.clone(),
            screenshot_dir: self.screenshot_dir.clone(),
        }))
    }
}

/// The bridge script executed by node. Reads one JSON command per stdin
/// line, answers one JSON result per stdout line, strictly in order.
fn bridge_script(headless: bool) -> String {
    format!(
        r#"const readline = require('readline');
const {{ chromium }} = require('playwright');

(async () => {{
  const browser = await chromium.launch({{ headless: {headless} }});
  const context = await browser.newContext();
  const pages = new Map();
  pages.set(0, await context.newPage());

  const rl = readline.createInterface({{ input: process.stdin }});
  for await (const line of rl) {{
    const cmd = JSON.parse(line);
    const page = pages.get(cmd.page);
    let res = {{ id: cmd.id, ok: true }};
    try {{
      switch (cmd.op) {{
        case 'ping': break;
        case 'goto': await page.goto(cmd.value, {{ waitUntil: 'networkidle' }}); break;
        case 'fill': await page.fill(cmd.selector, cmd.value); break;
        case 'press': await page.press(cmd.selector, cmd.value); break;
        case 'click': await page.click(cmd.selector); break;
        case 'click_nth': await page.locator(cmd.selector).nth(cmd.index).click(); break;
        case 'texts': res.texts = await page.locator(cmd.selector).allInnerTexts(); break;
        case 'attr': res.attr = await page.locator(cmd.selector).first().getAttribute(cmd.value); break;
        case 'count': res.count = await page.locator(cmd.selector).count(); break;
        case 'rows':
          res.rows = await page.locator(cmd.selector).evaluateAll(rows => rows.map((tr, i) => ({{
            index: i,
            cells: Array.from(tr.cells).map(td => td.innerText.trim()),
            colspan: (tr.cells.length === 1 && tr.cells[0].colSpan > 1) ? tr.cells[0].colSpan : null
          }})));
          break;
        case 'wait_for':
          try {{
            await page.waitForSelector(cmd.selector, {{ state: cmd.value, timeout: cmd.timeout_ms }});
            res.reached = true;
          }} catch (e) {{
            res.reached = false;
          }}
          break;
        case 'screenshot': await page.screenshot({{ path: cmd.value, fullPage: true }}); break;
        case 'new_page': pages.set(cmd.index, await context.newPage()); break;
        case 'close': await browser.close(); process.exit(0);
      }}
    }} catch (e) {{
      res = {{ id: cmd.id, ok: false, error: String((e && e.message) || e) }};
    }}
    process.stdout.write(JSON.stringify(res) + '\n');
  }}
}})();
"#
    )
}
