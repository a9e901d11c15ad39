//! Session gate: decides whether the setup flow or the operational views
//! are shown.
//!
//! The gate starts unconfigured with the setup view forced. A successful
//! setup moves it to ready on the query view. From then on navigation is
//! free, and going back to setup hides the operational views without
//! forgetting the previous configuration.

use std::fmt;
use std::str::FromStr;

use crate::error::ClientError;
use crate::models::SessionConfig;
use crate::setup::SetupOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Query,
    Generate,
    Setup,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            View::Query => "query",
            View::Generate => "generate",
            View::Setup => "setup",
        })
    }
}

impl FromStr for View {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "query" | "ask" => Ok(View::Query),
            "generate" | "gen" => Ok(View::Generate),
            "setup" => Ok(View::Setup),
            other => Err(ClientError::validation(
                "view",
                format!("Unknown view '{other}'. Choose query, generate or setup"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unconfigured,
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub is_ready: bool,
    pub active_view: View,
    pub source_label: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            is_ready: false,
            active_view: View::Setup,
            source_label: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct SessionGate {
    state: SessionState,
    config: Option<SessionConfig>,
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        if self.state.is_ready {
            Phase::Ready
        } else {
            Phase::Unconfigured
        }
    }

    /// Configuration of the last successful setup, if any.
    pub fn config(&self) -> Option<&SessionConfig> {
        self.config.as_ref()
    }

    pub fn source_label(&self) -> Option<&str> {
        self.state.source_label.as_deref()
    }

    /// True while only the setup flow may be shown.
    pub fn shows_setup(&self) -> bool {
        !self.state.is_ready || self.state.active_view == View::Setup
    }

    pub fn mark_ready(&mut self, source_label: impl Into<String>) {
        self.state.is_ready = true;
        self.state.active_view = View::Query;
        self.state.source_label = Some(source_label.into());
        tracing::info!(
            label = self.state.source_label.as_deref().unwrap_or(""),
            "Session ready"
        );
    }

    /// Consume a successful setup: keep its configuration and go ready.
    pub fn complete_setup(&mut self, outcome: SetupOutcome) {
        self.config = Some(outcome.config);
        self.mark_ready(outcome.source_label);
    }

    /// Switch views. Returns whether the active view changed.
    ///
    /// Before the first successful setup only `Setup` is reachable, which it
    /// already is. Going to `Setup` from ready keeps the session ready.
    pub fn navigate(&mut self, view: View) -> bool {
        if !self.state.is_ready && view != View::Setup {
            tracing::debug!(%view, "Navigation ignored until setup completes");
            return false;
        }
        if self.state.active_view == view {
            return false;
        }
        self.state.active_view = view;
        true
    }
}

/// Display label for a content source: its last path segment.
///
/// Both `/` and `\` separate segments and trailing separators are ignored,
/// so `C:\Adventures\Stone-Heart Hollow\` gives `Stone-Heart Hollow`.
pub fn source_label(path: &str) -> String {
    path.split(['/', '\\'])
        .rfind(|segment| !segment.is_empty())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(path: &str) -> SetupOutcome {
        SetupOutcome {
            config: SessionConfig::new("llama3.1:8b", "mxbai-embed-large", path),
            source_label: source_label(path),
        }
    }

    #[test]
    fn starts_unconfigured_on_setup() {
        let gate = SessionGate::new();
        assert_eq!(gate.phase(), Phase::Unconfigured);
        assert_eq!(gate.state().active_view, View::Setup);
        assert!(gate.shows_setup());
        assert!(gate.config().is_none());
    }

    #[test]
    fn navigation_is_ignored_before_setup() {
        let mut gate = SessionGate::new();
        assert!(!gate.navigate(View::Query));
        assert!(!gate.navigate(View::Generate));
        assert!(!gate.navigate(View::Setup));
        assert_eq!(gate.state().active_view, View::Setup);
        assert!(!gate.state().is_ready);
    }

    #[test]
    fn successful_setup_lands_on_query() {
        let mut gate = SessionGate::new();
        gate.complete_setup(outcome("/data/Adventures/Stone-Heart Hollow"));

        assert_eq!(gate.phase(), Phase::Ready);
        assert_eq!(gate.state().active_view, View::Query);
        assert_eq!(gate.source_label(), Some("Stone-Heart Hollow"));
        assert!(!gate.shows_setup());
        assert_eq!(
            gate.config().map(|c| c.content_source_path.as_str()),
            Some("/data/Adventures/Stone-Heart Hollow")
        );
    }

    #[test]
    fn reentering_setup_keeps_ready_and_label() {
        let mut gate = SessionGate::new();
        gate.complete_setup(outcome("/data/Adventures/Stone-Heart Hollow"));

        assert!(gate.navigate(View::Generate));
        assert!(gate.navigate(View::Setup));

        assert!(gate.state().is_ready);
        assert!(gate.shows_setup());
        assert_eq!(gate.source_label(), Some("Stone-Heart Hollow"));

        gate.complete_setup(outcome("/data/Adventures/Sunken Crypt"));
        assert_eq!(gate.state().active_view, View::Query);
        assert_eq!(gate.source_label(), Some("Sunken Crypt"));
    }

    #[test]
    fn navigate_to_same_view_reports_no_change() {
        let mut gate = SessionGate::new();
        gate.mark_ready("Hollow");
        assert!(!gate.navigate(View::Query));
        assert!(gate.navigate(View::Generate));
    }

    #[test]
    fn source_label_handles_both_separators() {
        assert_eq!(source_label("/data/Adventures/Stone-Heart Hollow"), "Stone-Heart Hollow");
        assert_eq!(
            source_label(r"C:\Users\dm\Adventures\Stone-Heart Hollow"),
            "Stone-Heart Hollow"
        );
        assert_eq!(source_label("/data//mixed\\Crypt/"), "Crypt");
        assert_eq!(source_label("Hollow"), "Hollow");
        assert_eq!(source_label(""), "");
        assert_eq!(source_label("///"), "");
    }

    #[test]
    fn view_parses_aliases() {
        assert_eq!("gen".parse::<View>().expect("parse"), View::Generate);
        assert_eq!("Query".parse::<View>().expect("parse"), View::Query);
        assert!("tartarus".parse::<View>().is_err());
    }
}
