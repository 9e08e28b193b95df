// Console output for the validation harness

use colored::Colorize;

use super::ValidationReport;

const RULE_WIDTH: usize = 60;

/// Prints progress lines for a validation run
#[derive(Debug, Clone, Copy)]
pub struct Report {
    quiet: bool,
}

impl Report {
    pub fn stdout() -> Self {
        Self { quiet: false }
    }

    /// Swallows all output
    pub fn quiet() -> Self {
        Self { quiet: true }
    }

    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }
        let rule = "=".repeat(RULE_WIDTH);
        println!("\n{}", rule.blue());
        println!("  {}", title.bold());
        println!("{}", rule.blue());
    }

    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", "✓".green().bold(), message);
        }
    }

    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", "ℹ".cyan(), message);
        }
    }

    pub fn error(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", "✗".red().bold(), message.red());
        }
    }

    pub fn summary(&self, report: &ValidationReport) {
        self.header("VALIDATION SUMMARY");
        self.info(&format!(
            "Events Sent: {}/{}",
            report.events_sent, report.events_total
        ));
        self.info(&format!("Lambda Executions: {}", report.log_matches));
        self.info(&format!("S3 Objects Found: {}", report.objects_found));

        if report.success() {
            self.success("END-TO-END VALIDATION SUCCESSFUL");
        } else {
            self.error("Some components failed. Check logs for details.");
        }
    }
}
