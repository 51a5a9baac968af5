//! Chromium page driver over the Chrome DevTools Protocol.
//!
//! Launches one Chromium instance with one page. The CDP handler and a
//! `Runtime.consoleAPICalled` listener run as background tokio tasks owned by
//! the driver; both are stopped when the driver is closed or dropped.

use crate::driver::{ConsoleMessage, DriverConfig, ElementState, PageDriver};
use crate::locator::Locator;
use crate::result::{PagecheckError, PagecheckResult};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, CaptureScreenshotParams};
use chromiumoxide::cdp::js_protocol::runtime::EventConsoleApiCalled;
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;

/// [`PageDriver`] backed by a real Chromium page
#[derive(Debug)]
pub struct ChromiumDriver {
    config: DriverConfig,
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    console_task: JoinHandle<()>,
    console: Arc<Mutex<Vec<ConsoleMessage>>>,
    closed: bool,
}

impl ChromiumDriver {
    /// Launch Chromium and open a blank page
    ///
    /// # Errors
    ///
    /// Returns error if the browser cannot be launched or the page cannot be
    /// created
    pub async fn launch(config: DriverConfig) -> PagecheckResult<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(config.viewport_width, config.viewport_height)
            .viewport(emulated_viewport(&config))
            .request_timeout(config.navigation_timeout);

        if !config.headless {
            builder = builder.with_head();
        }

        if !config.sandbox {
            builder = builder.no_sandbox();
        }

        if let Some(ref path) = config.chromium_path {
            builder = builder.chrome_executable(path);
        }

        let cdp_config = builder
            .build()
            .map_err(|message| PagecheckError::BrowserLaunchError { message })?;

        let (mut browser, mut handler) =
            Browser::launch(cdp_config)
                .await
                .map_err(|e| PagecheckError::BrowserLaunchError {
                    message: e.to_string(),
                })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    tracing::debug!(error = %err, "CDP handler stopped");
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                abandon(&mut browser, &handler).await;
                return Err(PagecheckError::page(err.to_string()));
            }
        };

        let console = Arc::new(Mutex::new(Vec::new()));
        let mut events = match page.event_listener::<EventConsoleApiCalled>().await {
            Ok(events) => events,
            Err(err) => {
                abandon(&mut browser, &handler).await;
                return Err(PagecheckError::page(format!("console listener: {err}")));
            }
        };
        let sink = Arc::clone(&console);
        let console_task = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let text = event
                    .args
                    .iter()
                    .map(|arg| arg_text(arg.value.as_ref(), arg.description.as_deref()))
                    .collect::<Vec<_>>()
                    .join(" ");
                let level = format!("{:?}", event.r#type).to_lowercase();
                sink.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(ConsoleMessage::new(level, text));
            }
        });

        tracing::info!(
            headless = config.headless,
            sandbox = config.sandbox,
            "browser launched"
        );

        Ok(Self {
            config,
            browser,
            page,
            handler,
            console_task,
            console,
            closed: false,
        })
    }

    /// Get the driver configuration
    #[must_use]
    pub const fn config(&self) -> &DriverConfig {
        &self.config
    }

    async fn element(&self, locator: &Locator) -> PagecheckResult<Element> {
        self.page
            .find_element(locator.selector())
            .await
            .map_err(|e| PagecheckError::input(format!("'{locator}': {e}")))
    }

    async fn current_url(&self) -> String {
        self.page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| "about:blank".to_string())
    }

    /// Run a navigation and wait for the load to settle within the
    /// navigation timeout
    async fn settle<F>(&self, url: String, navigation: F) -> PagecheckResult<()>
    where
        F: Future<Output = Result<(), CdpError>> + Send,
    {
        let timeout = self.config.navigation_timeout;
        match tokio::time::timeout(timeout, navigation).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(PagecheckError::NavigationError {
                url,
                message: err.to_string(),
            }),
            Err(_) => Err(PagecheckError::NavigationError {
                url,
                message: format!("load did not settle within {}ms", timeout.as_millis()),
            }),
        }
    }
}

/// Page viewport matching the window size, so screenshots have the
/// configured dimensions
fn emulated_viewport(config: &DriverConfig) -> Viewport {
    Viewport {
        width: config.viewport_width,
        height: config.viewport_height,
        ..Viewport::default()
    }
}

/// Shut down a browser whose launch could not be completed
async fn abandon(browser: &mut Browser, handler: &JoinHandle<()>) {
    if let Err(err) = browser.close().await {
        tracing::debug!(error = %err, "closing a half-launched browser");
    }
    handler.abort();
}

/// Render one console argument the way devtools would print it
fn arg_text(value: Option<&serde_json::Value>, description: Option<&str>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => description.unwrap_or_default().to_string(),
    }
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn navigate(&mut self, url: &str) -> PagecheckResult<()> {
        let page = &self.page;
        self.settle(url.to_string(), async move {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            Ok(())
        })
        .await
    }

    async fn reload(&mut self) -> PagecheckResult<()> {
        let url = self.current_url().await;
        let page = &self.page;
        self.settle(url, async move {
            page.reload().await?;
            page.wait_for_navigation().await?;
            Ok(())
        })
        .await
    }

    async fn inspect(&self, locator: &Locator) -> PagecheckResult<ElementState> {
        let script = locator.to_inspect_script();
        self.page
            .evaluate(script.as_str())
            .await
            .map_err(|e| PagecheckError::page(format!("inspecting '{locator}': {e}")))?
            .into_value::<ElementState>()
            .map_err(|e| PagecheckError::page(format!("inspecting '{locator}': {e}")))
    }

    async fn click(&mut self, locator: &Locator) -> PagecheckResult<()> {
        self.element(locator)
            .await?
            .click()
            .await
            .map_err(|e| PagecheckError::input(format!("click '{locator}': {e}")))?;
        Ok(())
    }

    async fn fill(&mut self, locator: &Locator, text: &str) -> PagecheckResult<()> {
        let element = self.element(locator).await?;
        let script = locator.to_clear_script();
        self.page
            .evaluate(script.as_str())
            .await
            .map_err(|e| PagecheckError::input(format!("clear '{locator}': {e}")))?;
        element
            .focus()
            .await
            .map_err(|e| PagecheckError::input(format!("focus '{locator}': {e}")))?
            .type_str(text)
            .await
            .map_err(|e| PagecheckError::input(format!("type into '{locator}': {e}")))?;
        Ok(())
    }

    async fn focus(&mut self, locator: &Locator) -> PagecheckResult<()> {
        self.element(locator)
            .await?
            .focus()
            .await
            .map_err(|e| PagecheckError::input(format!("focus '{locator}': {e}")))?;
        Ok(())
    }

    async fn press_key(&mut self, target: Option<&Locator>, key: &str) -> PagecheckResult<()> {
        let element = match target {
            Some(locator) => self.element(locator).await?,
            None => self
                .page
                .find_element(":focus")
                .await
                .map_err(|_| PagecheckError::input(format!("no element has focus for {key}")))?,
        };
        element
            .press_key(key)
            .await
            .map_err(|e| PagecheckError::input(format!("press {key}: {e}")))?;
        Ok(())
    }

    async fn screenshot(&self) -> PagecheckResult<Vec<u8>> {
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();

        let screenshot =
            self.page
                .execute(params)
                .await
                .map_err(|e| PagecheckError::ScreenshotError {
                    message: e.to_string(),
                })?;

        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(&screenshot.data)
            .map_err(|e| PagecheckError::ScreenshotError {
                message: e.to_string(),
            })
    }

    async fn drain_console(&mut self) -> Vec<ConsoleMessage> {
        std::mem::take(&mut *self.console.lock().unwrap_or_else(PoisonError::into_inner))
    }

    async fn close(&mut self) -> PagecheckResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.console_task.abort();
        let closed = self.browser.close().await;
        let _ = self.browser.wait().await;
        self.handler.abort();
        closed.map_err(|e| PagecheckError::page(format!("closing browser: {e}")))?;
        tracing::debug!("browser closed");
        Ok(())
    }
}

impl Drop for ChromiumDriver {
    fn drop(&mut self) {
        self.console_task.abort();
        self.handler.abort();
    }
}
