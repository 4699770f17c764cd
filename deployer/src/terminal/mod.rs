//! Terminal presentation of a deployment.
//!
//! The pipeline reports through the [`Reporter`] trait so that colouring and
//! layout stay out of the orchestration code. [`TerminalReporter`] writes to
//! stdout/stderr with `colored`.

use std::io::IsTerminal;

use colored::*;
use nomad_api::{Deployment, Job};

/// Per task group counters of a running deployment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupProgress {
    pub name: String,
    pub desired: u32,
    pub placed: u32,
    pub healthy: u32,
    pub unhealthy: u32,
    pub desired_canaries: u32,
    pub promoted: bool,
}

/// Snapshot of a deployment observed by the watcher
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentProgress {
    pub deployment_id: String,
    pub status: String,
    pub description: String,
    pub groups: Vec<GroupProgress>,
}

impl From<&Deployment> for DeploymentProgress {
    fn from(deployment: &Deployment) -> Self {
        Self {
            deployment_id: deployment.id.clone(),
            status: deployment.status.clone(),
            description: deployment.status_description.clone(),
            groups: deployment
                .task_groups
                .iter()
                .map(|(name, state)| GroupProgress {
                    name: name.clone(),
                    desired: state.desired_total,
                    placed: state.placed_allocs,
                    healthy: state.healthy_allocs,
                    unhealthy: state.unhealthy_allocs,
                    desired_canaries: state.desired_canaries,
                    promoted: state.promoted,
                })
                .collect(),
        }
    }
}

/// Receives everything a deployment wants to show the user
pub trait Reporter: Send + Sync {
    /// A pipeline step started
    fn step(&self, message: &str);

    /// Periodic observation of a running deployment
    fn progress(&self, progress: &DeploymentProgress);

    /// Error strings of failed allocations
    fn allocation_errors(&self, errors: &[String]);

    /// The assembled job of a dry run
    fn job(&self, job: &Job);

    fn warning(&self, message: &str);

    fn success(&self, message: &str);
}

/// Reporter writing coloured lines to the terminal
#[derive(Debug, Clone)]
pub struct TerminalReporter {
    verbose: bool,
    color: bool,
}

impl TerminalReporter {
    /// Colours are off when stdout is not a terminal
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            color: std::io::stdout().is_terminal(),
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    fn paint(&self, text: &str, style: impl Fn(&str) -> ColoredString) -> String {
        if self.color {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn format_group(&self, group: &GroupProgress) -> String {
        let mut line = format!(
            "{}: desired {} placed {} healthy {}",
            self.paint(&group.name, |s| s.bold()),
            group.desired,
            group.placed,
            self.paint(&group.healthy.to_string(), |s| s.green()),
        );
        if group.unhealthy > 0 {
            line.push_str(&format!(
                " unhealthy {}",
                self.paint(&group.unhealthy.to_string(), |s| s.red())
            ));
        }
        if group.desired_canaries > 0 {
            let promoted = if group.promoted { "promoted" } else { "not promoted" };
            line.push_str(&format!(" canaries {} ({})", group.desired_canaries, promoted));
        }
        line
    }
}

impl Reporter for TerminalReporter {
    fn step(&self, message: &str) {
        println!("{} {}", self.paint("→", |s| s.blue()), message);
    }

    fn progress(&self, progress: &DeploymentProgress) {
        for group in &progress.groups {
            println!("  {}", self.format_group(group));
        }
        if self.verbose && !progress.description.is_empty() {
            println!("  {}", self.paint(&progress.description, |s| s.dimmed()));
        }
    }

    fn allocation_errors(&self, errors: &[String]) {
        for error in errors {
            eprintln!("  {} {}", self.paint("✗", |s| s.red()), error);
        }
    }

    fn job(&self, job: &Job) {
        match serde_json::to_string_pretty(job) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("{} cannot render job: {}", self.paint("✗", |s| s.red()), e),
        }
    }

    fn warning(&self, message: &str) {
        println!("{} {}", self.paint("⚠", |s| s.yellow()), message);
    }

    fn success(&self, message: &str) {
        println!("{} {}", self.paint("✓", |s| s.green()), message);
    }
}
