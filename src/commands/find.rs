use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use rsprobe::driver::Driver;
use rsprobe::types::{ElementReport, OutputFormat};
use rsprobe::webdriver::{BrowserType, WebDriverSession};
use rsprobe::{EngineConfig, LocatorError, SearchContext};

/// How to reach the browser
pub struct SessionOptions {
    pub browser: BrowserType,
    pub webdriver_url: Option<String>,
    pub headless: bool,
}

pub async fn handle_find(
    session: SessionOptions,
    config: EngineConfig,
    url: String,
    recognition_string: String,
    all: bool,
    format: OutputFormat,
) -> Result<()> {
    info!("Resolving '{}' on {}", recognition_string, url);

    let browser = WebDriverSession::connect(
        session.browser,
        session.webdriver_url.as_deref(),
        session.headless,
    )
    .await?;
    browser.goto(&url).await?;

    let driver = Arc::new(browser);
    let mut ctx = SearchContext::new(Arc::clone(&driver), config);
    let result = collect_reports(&mut ctx, &recognition_string, all).await;
    drop(ctx);
    close_session(driver.as_ref()).await;

    let reports = result.with_context(|| format!("Resolving '{}'", recognition_string))?;
    print_reports(&reports, all, format)
}

/// End the session even while a timed-out script worker still holds the driver
pub async fn close_session<D: Driver>(driver: &D) {
    if let Err(e) = driver.close().await {
        warn!("Session did not close cleanly: {}", e);
    }
}

/// Resolve and describe the first match, or every match when `all`
pub async fn collect_reports<D: Driver>(
    ctx: &mut SearchContext<D>,
    recognition_string: &str,
    all: bool,
) -> Result<Vec<ElementReport>, LocatorError> {
    let elements = if all {
        ctx.find_all(recognition_string).await
    } else {
        vec![ctx.find_one(recognition_string).await?]
    };
    if elements.is_empty() {
        return Err(LocatorError::NotFound(recognition_string.to_string()));
    }

    let mut reports = Vec::with_capacity(elements.len());
    for element in &elements {
        reports.push(ctx.report(recognition_string, element).await?);
    }
    info!("Resolved {} element(s)", reports.len());
    Ok(reports)
}

fn print_reports(reports: &[ElementReport], all: bool, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            if reports.len() == 1 && !all {
                println!("{}", serde_json::to_string_pretty(&reports[0])?);
            } else {
                println!("{}", serde_json::to_string_pretty(reports)?);
            }
        }
        OutputFormat::Simple => {
            for (i, report) in reports.iter().enumerate() {
                let line = render_simple(report);
                if reports.len() > 1 {
                    println!("[{}] {}", i, line);
                } else {
                    println!("{}", line);
                }
            }
        }
    }
    Ok(())
}

pub fn render_simple(report: &ElementReport) -> String {
    let mut out = format!(
        "{}: {} {} at ({}, {}) {}x{}px, screen ({}, {})",
        report.recognition_string,
        report.component_type,
        report.tag_name,
        report.position.x,
        report.position.y,
        report.size.width,
        report.size.height,
        report.screen_position.x,
        report.screen_position.y
    );
    if let Some(text) = &report.text {
        out.push_str(&format!("\n  Text: {}", text));
    }
    if !report.frame_path.is_empty() {
        out.push_str(&format!("\n  Frames: {}", report.frame_path.join(" > ")));
    }
    out
}
