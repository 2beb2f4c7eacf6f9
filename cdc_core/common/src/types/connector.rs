use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which half of a pipeline a connector implements.
///
/// The wire names (`source` / `sink`) are what ends up in connector names and
/// audit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConnectorRole {
    #[serde(rename = "source", alias = "capture")]
    Capture,
    #[serde(rename = "sink", alias = "apply")]
    Apply,
}

impl ConnectorRole {
    pub const BOTH: [ConnectorRole; 2] = [ConnectorRole::Capture, ConnectorRole::Apply];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectorRole::Capture => "source",
            ConnectorRole::Apply => "sink",
        }
    }

    /// Name recorded in the audit log when the real connector name could not be derived.
    pub fn placeholder_name(&self) -> String {
        format!("{}-unknown", self.as_str())
    }
}

impl fmt::Display for ConnectorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectorRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "source" | "capture" => Ok(ConnectorRole::Capture),
            "sink" | "apply" => Ok(ConnectorRole::Apply),
            other => Err(format!("unknown connector role '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorAction {
    Start,
    Pause,
}

impl ConnectorAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectorAction::Start => "start",
            ConnectorAction::Pause => "pause",
        }
    }
}

impl fmt::Display for ConnectorAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectorAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "start" => Ok(ConnectorAction::Start),
            "pause" => Ok(ConnectorAction::Pause),
            other => Err(format!("unknown connector action '{other}'")),
        }
    }
}

/// Result of reconciling one connector towards a desired run state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "message", rename_all = "lowercase")]
pub enum ToggleOutcome {
    Started,
    Resumed,
    Paused,
    Skipped,
    Error(String),
}

impl ToggleOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, ToggleOutcome::Error(_))
    }
}

/// Human level summary of a connector and its tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryStatus {
    Running,
    RunningWithWarnings,
    PartiallyFailed,
    Paused,
    Failed,
    Unassigned,
    Undefined,
}

impl SummaryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryStatus::Running => "running",
            SummaryStatus::RunningWithWarnings => "running-with-warnings",
            SummaryStatus::PartiallyFailed => "partially-failed",
            SummaryStatus::Paused => "paused",
            SummaryStatus::Failed => "failed",
            SummaryStatus::Unassigned => "unassigned",
            SummaryStatus::Undefined => "undefined",
        }
    }
}

impl fmt::Display for SummaryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_accepts_both_vocabularies() {
        assert_eq!("sink".parse::<ConnectorRole>().unwrap(), ConnectorRole::Apply);
        assert_eq!("capture".parse::<ConnectorRole>().unwrap(), ConnectorRole::Capture);
        let role: ConnectorRole = serde_json::from_str("\"apply\"").unwrap();
        assert_eq!(role, ConnectorRole::Apply);
        assert_eq!(serde_json::to_string(&role).unwrap(), "\"sink\"");
    }

    #[test]
    fn summary_status_wire_names() {
        let json = serde_json::to_string(&SummaryStatus::RunningWithWarnings).unwrap();
        assert_eq!(json, "\"running-with-warnings\"");
        assert_eq!(SummaryStatus::PartiallyFailed.as_str(), "partially-failed");
    }

    #[test]
    fn placeholder_uses_wire_role() {
        assert_eq!(ConnectorRole::Apply.placeholder_name(), "sink-unknown");
    }
}
