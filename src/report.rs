//! Rendering of dependency-finding results.

use chrono::{DateTime, Utc};
use console::Style;
use serde::Serialize;
use std::path::PathBuf;

use crate::dependency::Dependency;
use crate::error::Result;
use crate::finder::ExecutableDescriptor;
use crate::survey::SurveyEntry;

/// Styles used by the text renderer.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Package names (bold).
    pub name: Style,
    /// Paths (dim).
    pub path: Style,
    /// Resolved versions (green).
    pub version: Style,
    /// Unknown versions and diff markers (orange).
    pub warning: Style,
    /// Stored diffs (dim).
    pub diff: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self::new()
    }
}

impl Theme {
    pub fn new() -> Self {
        Self {
            name: Style::new().bold(),
            path: Style::new().dim(),
            version: Style::new().green(),
            warning: Style::new().color256(208),
            diff: Style::new().dim(),
        }
    }

    /// A theme without colors (for non-TTY or --no-color).
    pub fn plain() -> Self {
        Self {
            name: Style::new(),
            path: Style::new(),
            version: Style::new(),
            warning: Style::new(),
            diff: Style::new(),
        }
    }

    /// Colored theme when `colors` is set, plain otherwise.
    pub fn for_colors(colors: bool) -> Self {
        if colors {
            Self::new()
        } else {
            Self::plain()
        }
    }

    /// Render one dependency; identical to its `Display` form when plain.
    pub fn format_dependency(&self, dep: &Dependency) -> String {
        let version_style = if dep.is_unknown() {
            &self.warning
        } else {
            &self.version
        };
        let mut line = format!(
            "{} {} version={}",
            self.name.apply_to(&dep.name),
            self.path.apply_to(format!("({})", dep.path.display())),
            version_style.apply_to(&dep.version)
        );
        if dep.has_diff() {
            line.push_str(&format!(
                "{}\n{}",
                self.warning.apply_to("*"),
                self.diff.apply_to(dep.diff.trim_end())
            ));
        }
        line
    }

    pub fn format_survey_entry(&self, entry: &SurveyEntry) -> String {
        format!(
            "{} {}",
            self.name.apply_to(&entry.name),
            self.version.apply_to(&entry.version)
        )
    }
}

/// Check if colors should be enabled.
pub fn should_use_colors() -> bool {
    // Check NO_COLOR env var (https://no-color.org/)
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    console::Term::stdout().is_term()
}

/// The pinned dependencies of one script.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub script: PathBuf,
    pub executable: ExecutableDescriptor,
    pub generated_at: DateTime<Utc>,
    pub dependencies: Vec<Dependency>,
}

impl Report {
    /// A report stamped with the current time.
    pub fn new(
        script: impl Into<PathBuf>,
        executable: ExecutableDescriptor,
        dependencies: Vec<Dependency>,
    ) -> Self {
        Self {
            script: script.into(),
            executable,
            generated_at: Utc::now(),
            dependencies,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self).map_err(anyhow::Error::from)?)
    }

    /// One line per dependency.
    pub fn render_text(&self, theme: &Theme) -> String {
        self.dependencies
            .iter()
            .map(|d| theme.format_dependency(d))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Render survey results, one `name version` line per package.
pub fn render_survey(entries: &[SurveyEntry], theme: &Theme) -> String {
    entries
        .iter()
        .map(|e| theme.format_survey_entry(e))
        .collect::<Vec<_>>()
        .join("\n")
}
