//! Human-readable evaluation report.

use std::fmt::Write;

use wes_classifier_core::EvaluationSummary;

const RULE: &str = "============================================================";
const THIN_RULE: &str = "------------------------------------------------------------";

fn pct(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

fn short(label: &str) -> String {
    label.chars().take(15).collect()
}

/// Renders accuracy, per-class metrics and the confusion matrix as text.
#[must_use]
pub fn render(summary: &EvaluationSummary) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_report(&mut out, summary);
    out
}

fn write_report(out: &mut String, s: &EvaluationSummary) -> std::fmt::Result {
    writeln!(out, "{RULE}")?;
    writeln!(out, "EVALUATION")?;
    writeln!(out, "{RULE}")?;
    writeln!(out, "{:<30} {}", "Images evaluated:", s.total)?;
    writeln!(out, "{:<30} {}", "Images failed:", s.failed)?;
    writeln!(out, "{:<30} {}", "Overall Accuracy:", pct(s.accuracy))?;
    writeln!(out, "{:<30} {}", "Overall Error Rate:", pct(s.error_rate))?;

    writeln!(out)?;
    writeln!(out, "{THIN_RULE}")?;
    writeln!(
        out,
        "{:<20} {:>11} {:>11} {:>11} {:>11}",
        "Class", "Precision", "Recall", "F1-Score", "Support"
    )?;
    writeln!(out, "{THIN_RULE}")?;
    for c in &s.classes {
        writeln!(
            out,
            "{:<20} {:>11} {:>11} {:>11} {:>11}",
            c.label,
            pct(c.precision),
            pct(c.recall),
            pct(c.f1),
            c.support
        )?;
    }

    writeln!(out)?;
    writeln!(out, "Per-Class Accuracy:")?;
    for c in &s.classes {
        match c.accuracy {
            Some(a) => writeln!(
                out,
                "{:<20} {:>11} ({}/{} correct)",
                c.label,
                pct(a),
                c.correct,
                c.support
            )?,
            None => writeln!(out, "{:<20} {:>30}", c.label, "N/A (no samples)")?,
        }
    }

    writeln!(out)?;
    writeln!(out, "Confusion Matrix (rows: actual, columns: predicted):")?;
    write!(out, "{:<20}", "")?;
    for c in &s.classes {
        write!(out, "{:<16}", short(&c.label))?;
    }
    writeln!(out)?;
    for (c, row) in s.classes.iter().zip(&s.confusion_matrix) {
        write!(out, "{:<20}", short(&c.label))?;
        for count in row {
            write!(out, "{count:<16}")?;
        }
        writeln!(out)?;
    }

    writeln!(out)?;
    writeln!(out, "Confusion Matrix (Percentages):")?;
    for (c, row) in s.classes.iter().zip(&s.normalized_matrix) {
        write!(out, "{:<20}", short(&c.label))?;
        for p in row {
            write!(out, "{:>6.1}%{:<9}", p, "")?;
        }
        writeln!(out)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use wes_classifier_core::{Evaluation, LabelSet};

    use super::*;

    #[test]
    fn test_render_contains_sections() {
        let labels = LabelSet::new(["WES_ANDERSON", "NOT_WES_ANDERSON", "OTHER"])
            .unwrap_or_else(|| panic!("labels"));
        let mut eval = Evaluation::new(labels);
        eval.record(0, 0);
        eval.record(1, 0);

        let text = render(&eval.summary());

        assert!(text.contains("Overall Accuracy:"));
        assert!(text.contains("50.00%"));
        assert!(text.contains("N/A (no samples)"));
        assert!(text.contains("Confusion Matrix"));
    }
}
