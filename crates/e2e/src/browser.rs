//! Playwright page driver
//!
//! UI steps need one browser session carried across the whole scenario
//! (login state, installed routes), so instead of one-shot scripts the
//! driver is a long-lived Node subprocess: Rust writes one JSON command
//! per line on stdin and reads one JSON reply per line from stdout. The
//! driver script itself is assembled in Rust and handed to `node` via a
//! temp directory.

use std::process::Stdio;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tracing::{debug, warn};

use crate::error::{E2eError, E2eResult};

/// Browser session configuration
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Base URL of the UI under test
    pub base_url: String,

    /// Viewport dimensions
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Run headless
    pub headless: bool,

    /// Default timeout for waits and expectations, in milliseconds
    pub default_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5173".to_string(),
            viewport_width: 1280,
            viewport_height: 720,
            headless: true,
            default_timeout_ms: 5_000,
        }
    }
}

/// One UI action or expectation, serialized as a line of the driver protocol
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum PageCommand {
    /// Navigate to a URL relative to the base, waiting for network idle
    Goto { url: String },

    /// Wait until the page URL matches a glob pattern and network is idle
    WaitForUrl {
        pattern: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Click a navigation link by accessible name
    ClickLink { name: String },

    /// Click a button by accessible name
    ClickButton { name: String },

    /// Open a combobox widget by accessible name
    OpenCombobox { name: String },

    /// Click a listbox option whose name contains the given text
    ClickOption {
        name: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Fill a labeled form field; `regex` treats the label as a pattern
    FillLabel {
        label: String,
        value: String,
        #[serde(default)]
        regex: bool,
    },

    /// Fill a field addressed by its textbox role name (for fields whose
    /// label association is ambiguous)
    FillTextbox { name: String, value: String },

    /// Fill a field addressed by CSS selector
    FillSelector { selector: String, value: String },

    /// Fill a field addressed by its placeholder text
    FillPlaceholder { placeholder: String, value: String },

    /// Expect a heading to be visible
    ExpectHeading {
        name: String,
        #[serde(default)]
        regex: bool,
        #[serde(default)]
        exact: bool,
    },

    /// Expect the given text to be visible somewhere on the page
    ExpectText {
        text: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Expect a button to be visible
    ExpectButton { name: String },

    /// Expect a table row containing the given text
    ExpectRow {
        text: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Click a named button inside the row containing the given text
    ClickRowButton {
        row_text: String,
        button: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Expect a card element containing all given texts; optionally
    /// verify its content includes `contains`
    ExpectCard {
        texts: Vec<String>,
        #[serde(default)]
        contains: Option<String>,
    },

    /// Evaluate a JS expression in the page, returning its JSON value
    Evaluate { script: String },

    /// Install a route forcing page/limit defaults on GET requests
    /// matching a URL pattern
    NormalizeListQuery {
        pattern: String,
        limit: u32,
        page: u32,
    },

    /// Fixed wait (use sparingly)
    Sleep { ms: u64 },

    /// Close the browser and exit the driver
    Shutdown,
}

impl PageCommand {
    /// Short action name for diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            PageCommand::Goto { .. } => "goto",
            PageCommand::WaitForUrl { .. } => "wait_for_url",
            PageCommand::ClickLink { .. } => "click_link",
            PageCommand::ClickButton { .. } => "click_button",
            PageCommand::OpenCombobox { .. } => "open_combobox",
            PageCommand::ClickOption { .. } => "click_option",
            PageCommand::FillLabel { .. } => "fill_label",
            PageCommand::FillTextbox { .. } => "fill_textbox",
            PageCommand::FillSelector { .. } => "fill_selector",
            PageCommand::FillPlaceholder { .. } => "fill_placeholder",
            PageCommand::ExpectHeading { .. } => "expect_heading",
            PageCommand::ExpectText { .. } => "expect_text",
            PageCommand::ExpectButton { .. } => "expect_button",
            PageCommand::ExpectRow { .. } => "expect_row",
            PageCommand::ClickRowButton { .. } => "click_row_button",
            PageCommand::ExpectCard { .. } => "expect_card",
            PageCommand::Evaluate { .. } => "evaluate",
            PageCommand::NormalizeListQuery { .. } => "normalize_list_query",
            PageCommand::Sleep { .. } => "sleep",
            PageCommand::Shutdown => "shutdown",
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    id: u64,
    #[serde(flatten)]
    command: &'a PageCommand,
}

#[derive(Debug, Deserialize)]
struct DriverReply {
    #[serde(default)]
    id: u64,
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    value: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    fatal: bool,
}

/// Handle to the running driver subprocess
pub struct PageDriver {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    // Keeps the generated driver script alive for the child's lifetime
    _script_dir: tempfile::TempDir,
}

impl PageDriver {
    /// Spawn the Node driver and wait for its ready handshake
    pub async fn launch(config: &BrowserConfig) -> E2eResult<Self> {
        Self::check_playwright_installed()?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("driver.js");
        std::fs::write(&script_path, build_driver_script(config))?;

        debug!("Spawning page driver: {}", script_path.display());

        // cwd stays at the repo so node resolves the playwright module
        let mut child = TokioCommand::new("node")
            .arg(&script_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| E2eError::DriverStartup(format!("failed to spawn node: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::DriverStartup("driver stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::DriverStartup("driver stdout unavailable".to_string()))?;

        let mut driver = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 0,
            _script_dir: script_dir,
        };

        let handshake = driver.read_reply().await?;
        if !handshake.ready {
            return Err(E2eError::DriverStartup(
                handshake
                    .error
                    .unwrap_or_else(|| "driver did not report ready".to_string()),
            ));
        }

        Ok(driver)
    }

    /// Check if Playwright is installed
    fn check_playwright_installed() -> E2eResult<()> {
        let output = std::process::Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// Execute one command and return the driver's value (null for actions)
    pub async fn send(&mut self, command: &PageCommand) -> E2eResult<serde_json::Value> {
        self.next_id += 1;
        let id = self.next_id;
        let line = serde_json::to_string(&Envelope { id, command })?;

        debug!(action = command.name(), "page command");
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;

        loop {
            let reply = self.read_reply().await?;
            if reply.fatal {
                return Err(E2eError::Driver(
                    reply.error.unwrap_or_else(|| "driver crashed".to_string()),
                ));
            }
            if reply.id != id {
                warn!(got = reply.id, expected = id, "out-of-order driver reply");
                continue;
            }
            if !reply.ok {
                return Err(E2eError::Page {
                    action: command.name().to_string(),
                    reason: reply.error.unwrap_or_else(|| "unknown".to_string()),
                });
            }
            return Ok(reply.value.unwrap_or(serde_json::Value::Null));
        }
    }

    async fn read_reply(&mut self) -> E2eResult<DriverReply> {
        loop {
            let line = self
                .stdout
                .next_line()
                .await?
                .ok_or_else(|| E2eError::Driver("driver exited unexpectedly".to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<DriverReply>(&line) {
                Ok(reply) => return Ok(reply),
                Err(_) => {
                    // Stray output from the browser process
                    debug!(%line, "ignoring non-protocol driver output");
                }
            }
        }
    }

    /// Shut the driver down cleanly
    pub async fn close(mut self) -> E2eResult<()> {
        let _ = self.send(&PageCommand::Shutdown).await;
        let _ = self.child.wait().await;
        Ok(())
    }
}

/// Assemble the Node driver script for a given configuration
fn build_driver_script(config: &BrowserConfig) -> String {
    let mut script = format!(
        r#"const {{ chromium }} = require('playwright');
const readline = require('readline');

const BASE_URL = '{base_url}';
const HEADLESS = {headless};
const VIEWPORT = {{ width: {width}, height: {height} }};
const DEFAULT_TIMEOUT = {timeout};
"#,
        base_url = config.base_url,
        headless = config.headless,
        width = config.viewport_width,
        height = config.viewport_height,
        timeout = config.default_timeout_ms,
    );
    script.push_str(DRIVER_BODY);
    script
}

// The protocol loop is configuration-independent; only the constants
// above are interpolated.
const DRIVER_BODY: &str = r#"
(async () => {
  const browser = await chromium.launch({ headless: HEADLESS });
  const context = await browser.newContext({ viewport: VIEWPORT });
  const page = await context.newPage();

  const escapeRe = (s) => s.replace(/[.*+?^${}()|[\]\\]/g, '\\$&');

  async function handle(msg) {
    const t = msg.timeout_ms || DEFAULT_TIMEOUT;
    switch (msg.cmd) {
      case 'goto':
        await page.goto(BASE_URL + msg.url, { waitUntil: 'networkidle' });
        return null;
      case 'wait_for_url':
        await page.waitForURL(msg.pattern, { waitUntil: 'networkidle', timeout: t });
        return null;
      case 'click_link':
        await page.getByRole('link', { name: msg.name }).click({ timeout: t });
        return null;
      case 'click_button':
        await page.getByRole('button', { name: msg.name }).click({ timeout: t });
        return null;
      case 'open_combobox':
        await page.getByRole('combobox', { name: msg.name }).click({ timeout: t });
        return null;
      case 'click_option': {
        const option = page.getByRole('option', { name: new RegExp(escapeRe(msg.name)) });
        await option.waitFor({ state: 'visible', timeout: t });
        await option.click();
        return null;
      }
      case 'fill_label': {
        const label = msg.regex ? new RegExp(msg.label) : msg.label;
        await page.getByLabel(label).fill(msg.value, { timeout: t });
        return null;
      }
      case 'fill_textbox':
        await page.getByRole('textbox', { name: msg.name }).fill(msg.value, { timeout: t });
        return null;
      case 'fill_selector':
        await page.fill(msg.selector, msg.value, { timeout: t });
        return null;
      case 'fill_placeholder':
        await page.getByPlaceholder(msg.placeholder).fill(msg.value, { timeout: t });
        return null;
      case 'expect_heading': {
        const name = msg.regex ? new RegExp(msg.name, 'i') : msg.name;
        await page.getByRole('heading', { name, exact: msg.exact === true })
          .waitFor({ state: 'visible', timeout: t });
        return null;
      }
      case 'expect_text':
        await page.getByText(msg.text).first().waitFor({ state: 'visible', timeout: t });
        return null;
      case 'expect_button':
        await page.getByRole('button', { name: msg.name }).waitFor({ state: 'visible', timeout: t });
        return null;
      case 'expect_row':
        await page.getByRole('row', { name: new RegExp(escapeRe(msg.text)) })
          .waitFor({ state: 'visible', timeout: t });
        return null;
      case 'click_row_button': {
        const row = page.getByRole('row', { name: new RegExp(escapeRe(msg.row_text)) });
        await row.waitFor({ state: 'visible', timeout: t });
        await row.getByRole('button', { name: msg.button }).click({ timeout: t });
        return null;
      }
      case 'expect_card': {
        let card = page.locator('div');
        for (const text of msg.texts) {
          card = card.filter({ hasText: text });
        }
        const first = card.first();
        await first.waitFor({ state: 'visible', timeout: t });
        if (msg.contains) {
          const content = await first.textContent();
          if (!content || !content.includes(msg.contains)) {
            throw new Error('card does not contain: ' + msg.contains);
          }
        }
        return null;
      }
      case 'evaluate':
        return await page.evaluate(msg.script);
      case 'normalize_list_query':
        await page.route(msg.pattern, async (route) => {
          const request = route.request();
          if (request.method() !== 'GET') {
            await route.continue();
            return;
          }
          const url = new URL(request.url());
          if (!url.searchParams.has('limit')) url.searchParams.set('limit', String(msg.limit));
          if (!url.searchParams.has('page')) url.searchParams.set('page', String(msg.page));
          await route.continue({ url: url.toString() });
        });
        return null;
      case 'sleep':
        await page.waitForTimeout(msg.ms);
        return null;
      case 'shutdown':
        await browser.close();
        process.exit(0);
      default:
        throw new Error('unknown command: ' + msg.cmd);
    }
  }

  console.log(JSON.stringify({ ready: true }));
  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    if (!line.trim()) continue;
    const msg = JSON.parse(line);
    try {
      const value = await handle(msg);
      console.log(JSON.stringify({ id: msg.id, ok: true, value }));
    } catch (error) {
      console.log(JSON.stringify({ id: msg.id, ok: false, error: error.message }));
    }
  }
  await browser.close();
})().catch((error) => {
  console.log(JSON.stringify({ fatal: true, error: error.message }));
  process.exit(1);
});
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_shape() {
        let command = PageCommand::FillLabel {
            label: "E-mail".to_string(),
            value: "admin@consorcio.dev".to_string(),
            regex: false,
        };
        let json = serde_json::to_value(Envelope {
            id: 3,
            command: &command,
        })
        .unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["cmd"], "fill_label");
        assert_eq!(json["label"], "E-mail");
        assert_eq!(json["value"], "admin@consorcio.dev");
    }

    #[test]
    fn test_command_names() {
        assert_eq!(
            PageCommand::Goto {
                url: "/login".to_string()
            }
            .name(),
            "goto"
        );
        assert_eq!(PageCommand::Shutdown.name(), "shutdown");
    }

    #[test]
    fn test_driver_script_embeds_config() {
        let config = BrowserConfig {
            base_url: "http://ui.local:9999".to_string(),
            headless: false,
            viewport_width: 1920,
            viewport_height: 1080,
            default_timeout_ms: 7000,
        };
        let script = build_driver_script(&config);
        assert!(script.contains("const BASE_URL = 'http://ui.local:9999';"));
        assert!(script.contains("const HEADLESS = false;"));
        assert!(script.contains("width: 1920, height: 1080"));
        assert!(script.contains("const DEFAULT_TIMEOUT = 7000;"));
        assert!(script.contains("require('playwright')"));
    }

    #[test]
    fn test_reply_parses_ready_and_error() {
        let ready: DriverReply = serde_json::from_str(r#"{"ready":true}"#).unwrap();
        assert!(ready.ready);

        let err: DriverReply =
            serde_json::from_str(r#"{"id":5,"ok":false,"error":"timeout"}"#).unwrap();
        assert_eq!(err.id, 5);
        assert!(!err.ok);
        assert_eq!(err.error.as_deref(), Some("timeout"));
    }
}
