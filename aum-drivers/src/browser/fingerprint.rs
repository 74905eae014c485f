use rand::prelude::SliceRandom;

#[derive(Debug, Clone)]
/// User agent plus the viewport it is launched with.
pub struct UserAgentProfile {
    pub user_agent: String,
    pub viewport: (u32, u32),
}

#[derive(Debug, Clone)]
/// Small pool of plausible desktop user agents; one is drawn per session.
pub struct UserAgentManager {
    desktop_profiles: Vec<UserAgentProfile>,
}

impl Default for UserAgentManager {
    fn default() -> Self {
        Self::new()
    }
}

impl UserAgentManager {
    pub fn new() -> Self {
        let ua = |s: &str| UserAgentProfile {
            user_agent: s.to_string(),
            viewport: (1920, 1080),
        };
        Self {
            desktop_profiles: vec![
                ua("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"),
                ua("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"),
                ua("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36"),
                ua("Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:132.0) Gecko/20100101 Firefox/132.0"),
            ],
        }
    }

    /// Draw a random profile for a new session.
    pub fn pick(&self) -> UserAgentProfile {
        let mut rng = rand::thread_rng();
        self.desktop_profiles
            .choose(&mut rng)
            .cloned()
            .unwrap_or_else(|| UserAgentProfile {
                user_agent: String::new(),
                viewport: (1920, 1080),
            })
    }
}
