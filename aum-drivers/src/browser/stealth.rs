use super::fingerprint::UserAgentProfile;

/// Chrome command-line arguments for a scraping session.
pub fn build_browser_arguments(headless: bool, profile: &UserAgentProfile) -> Vec<String> {
    let mut args = vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        "--disable-infobars".to_string(),
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-gpu".to_string(),
        format!("--window-size={},{}", profile.viewport.0, profile.viewport.1),
    ];
    if !profile.user_agent.is_empty() {
        args.push(format!("--user-agent={}", profile.user_agent));
    }
    if headless {
        args.push("--headless=new".to_string());
    }
    args
}

/// Installs a buffer of resource timings on `window.__aumNetwork`.
pub const NETWORK_CAPTURE_SCRIPT: &str = r#"
    if (!window.__aumNetwork) {
        window.__aumNetwork = [];
        try {
            new PerformanceObserver(function (list) {
                list.getEntries().forEach(function (e) {
                    window.__aumNetwork.push({ name: e.name, type: e.initiatorType, ms: e.duration });
                });
            }).observe({ type: 'resource', buffered: true });
        } catch (err) {}
    }
    return true;
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_args_match_launch_contract() {
        let profile = UserAgentProfile {
            user_agent: "UA/1.0".into(),
            viewport: (1920, 1080),
        };
        let args = build_browser_arguments(true, &profile);
        for expected in [
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--disable-gpu",
            "--window-size=1920,1080",
            "--user-agent=UA/1.0",
            "--headless=new",
        ] {
            assert!(args.iter().any(|a| a == expected), "missing {expected}");
        }
        assert!(!build_browser_arguments(false, &profile)
            .iter()
            .any(|a| a.starts_with("--headless")));
    }
}
