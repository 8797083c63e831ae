// Common test utilities and fixtures

use std::sync::Arc;

use rsprobe::mock::{MockDriver, MockElement, MockNode};
use rsprobe::{EngineConfig, SearchContext};

/// Config with no settle delay so stale recovery runs instantly
#[allow(dead_code)]
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        page_settle_ms: 0,
        script_timeout_ms: 200,
        event_poll_interval_ms: 10,
        ..EngineConfig::default()
    }
}

#[allow(dead_code)]
pub fn context(driver: &MockDriver) -> SearchContext<MockDriver> {
    SearchContext::new(Arc::new(driver.clone()), fast_config())
}

/// Elements of [`login_page`]
#[allow(dead_code)]
pub struct LoginPage {
    pub frame: MockElement,
    pub user: MockElement,
    pub ok: MockElement,
    pub cancel: MockElement,
    pub help: MockElement,
}

/// A top-level help link and an iframe `f1` holding a small login form
#[allow(dead_code)]
pub fn login_page(driver: &MockDriver) -> LoginPage {
    let help = driver.add(MockNode::new("a").attr("id", "help").text("Help"));
    let frame = driver.add(
        MockNode::new("iframe")
            .attr("id", "f1")
            .attr("name", "login")
            .rect(0.0, 100.0, 800.0, 400.0),
    );
    let form = driver.add_in_frame(&frame, MockNode::new("form").attr("id", "loginForm"));
    let user = driver.add_child(
        &form,
        MockNode::new("input")
            .attr("id", "user")
            .attr("name", "username")
            .attr("type", "text"),
    );
    let ok = driver.add_child(
        &form,
        MockNode::new("button")
            .attr("id", "btnOK")
            .text("OK")
            .rect(20.0, 30.0, 60.0, 24.0),
    );
    let cancel = driver.add_child(&form, MockNode::new("button").attr("id", "btnCancel").text("Cancel"));
    LoginPage {
        frame,
        user,
        ok,
        cancel,
        help,
    }
}
