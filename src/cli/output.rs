//! Output formatting module for neglb
//!
//! Provides colored step lines, the run recap, and a JSON mode.

use colored::Colorize;
use neglb::executor::RunReport;
use neglb::steps::{StepOutput, StepStatus};
use serde::Serialize;

/// Get the colored string representation of a step status
fn colored_status(status: StepStatus) -> String {
    match status {
        StepStatus::Ok => "ok".green().to_string(),
        StepStatus::Changed => "changed".yellow().to_string(),
    }
}

fn plain_status(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Ok => "ok",
        StepStatus::Changed => "changed",
    }
}

/// Output formatter for different output modes
pub struct OutputFormatter {
    /// Use colored output
    use_color: bool,
    /// JSON output mode
    json_mode: bool,
    /// Verbosity level
    verbosity: u8,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(use_color: bool, json_mode: bool, verbosity: u8) -> Self {
        // Respect NO_COLOR environment variable
        let use_color = use_color && std::env::var("NO_COLOR").is_err();

        Self {
            use_color,
            json_mode,
            verbosity,
        }
    }

    /// Print a banner/header
    pub fn banner(&self, title: &str) {
        if self.json_mode {
            return;
        }

        let line = "=".repeat(title.len() + 4);
        if self.use_color {
            println!("\n{}", line.bright_blue());
            println!("{}", format!("  {}  ", title).bright_blue().bold());
            println!("{}\n", line.bright_blue());
        } else {
            println!("\n{}", line);
            println!("  {}  ", title);
            println!("{}\n", line);
        }
    }

    /// Print the result of one step
    pub fn step_result(&self, output: &StepOutput) {
        if self.json_mode {
            return;
        }

        let status = if self.use_color {
            colored_status(output.status)
        } else {
            plain_status(output.status).to_string()
        };

        let step = if self.use_color {
            output.step.as_str().bright_white().bold().to_string()
        } else {
            output.step.as_str().to_string()
        };

        println!("{}: [{}] => {}", status, step, output.msg);
    }

    /// Print the run recap
    pub fn recap(&self, report: &RunReport) -> anyhow::Result<()> {
        if self.json_mode {
            return self.json(report);
        }

        let header = if report.check_mode {
            "RECAP (check mode)"
        } else {
            "RECAP"
        };
        let stars = "*".repeat(60 - header.len());

        if self.use_color {
            println!("\n{} {}", header.bright_white().bold(), stars.bright_black());
        } else {
            println!("\n{} {}", header, stars);
        }

        let line = format!(
            "{:<30} : ok={:<4} changed={:<4}",
            report.service,
            report.ok(),
            report.changed()
        );
        if self.use_color {
            if report.changed() > 0 {
                println!("{}", line.yellow());
            } else {
                println!("{}", line.green());
            }
        } else {
            println!("{}", line);
        }

        if self.verbosity >= 1 {
            println!("project: {}  elapsed: {} ms", report.project, report.elapsed_ms);
        }

        Ok(())
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.json_mode {
            let payload = serde_json::json!({ "error": message });
            println!("{}", payload);
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "ERROR:".red().bold(), message.red());
        } else {
            eprintln!("ERROR: {}", message);
        }
    }

    /// Print a hint for the operator
    pub fn hint(&self, message: &str) {
        if self.json_mode {
            return;
        }

        if self.use_color {
            println!("{} {}", "HINT:".cyan().bold(), message);
        } else {
            println!("HINT: {}", message);
        }
    }

    /// Print a titled list
    pub fn list(&self, title: &str, items: &[String]) {
        if self.json_mode {
            return;
        }

        if self.use_color {
            println!("{}", title.cyan().bold());
        } else {
            println!("{}", title);
        }
        for item in items {
            println!("  - {}", item);
        }
    }

    /// Print any serializable value as pretty JSON
    pub fn json<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Whether JSON output is active
    pub fn is_json(&self) -> bool {
        self.json_mode
    }
}
