use chrono::Local;

/// Source of "today" as a `YYYY-MM-DD` string.
pub trait Clock: Send + Sync {
    fn today(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> String {
        Local::now().format("%Y-%m-%d").to_string()
    }
}

#[derive(Debug, Clone)]
pub struct FixedClock(String);

impl FixedClock {
    pub fn new(date: &str) -> Self {
        Self(date.to_string())
    }
}

impl Clock for FixedClock {
    fn today(&self) -> String {
        self.0.clone()
    }
}
