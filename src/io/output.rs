use crate::ci::{CiDecision, CiOutput, Platform, RunSummary};
use crate::formatting::Styler;
use crate::pipeline::RunOutcome;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use serde::{Deserialize, Serialize};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Markdown,
    #[default]
    Terminal,
}

pub trait OutputWriter {
    fn write_outcome(&mut self, outcome: &RunOutcome) -> anyhow::Result<()>;
}

pub struct JsonWriter<W: Write> {
    writer: W,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> OutputWriter for JsonWriter<W> {
    fn write_outcome(&mut self, outcome: &RunOutcome) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(outcome)?;
        self.writer.write_all(json.as_bytes())?;
        writeln!(self.writer)?;
        Ok(())
    }
}

pub struct MarkdownWriter<W: Write> {
    writer: W,
}

impl<W: Write> MarkdownWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> OutputWriter for MarkdownWriter<W> {
    fn write_outcome(&mut self, outcome: &RunOutcome) -> anyhow::Result<()> {
        self.write_header(outcome)?;
        self.write_summary(&outcome.summary)?;
        self.write_failures(&outcome.outputs)?;
        self.write_input_errors(outcome)?;
        Ok(())
    }
}

impl<W: Write> MarkdownWriter<W> {
    fn write_header(&mut self, outcome: &RunOutcome) -> anyhow::Result<()> {
        writeln!(self.writer, "# Test Failure Triage")?;
        writeln!(self.writer)?;
        writeln!(
            self.writer,
            "Framework: `{}` | Reports: {}/{} loaded",
            outcome.framework, outcome.reports_loaded, outcome.reports_total
        )?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_summary(&mut self, summary: &RunSummary) -> anyhow::Result<()> {
        writeln!(self.writer, "## Summary")?;
        writeln!(self.writer)?;
        writeln!(self.writer, "| Metric | Value |")?;
        writeln!(self.writer, "|--------|-------|")?;
        let rows = [
            ("Total", summary.total.to_string()),
            ("Passed", summary.passed.to_string()),
            ("Failed", summary.failed.to_string()),
            ("Skipped", summary.skipped.to_string()),
            ("Classified", summary.classified.to_string()),
            (
                "Average confidence",
                format!("{:.0}%", summary.average_confidence * 100.0),
            ),
            ("Blocking (FAIL)", summary.fail_count().to_string()),
        ];
        for (metric, value) in rows {
            writeln!(self.writer, "| {metric} | {value} |")?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_failures(&mut self, outputs: &[CiOutput]) -> anyhow::Result<()> {
        if outputs.is_empty() {
            writeln!(self.writer, "No failing tests.")?;
            writeln!(self.writer)?;
            return Ok(());
        }

        writeln!(self.writer, "## Failures")?;
        writeln!(self.writer)?;
        writeln!(
            self.writer,
            "| Test | Type | Confidence | Nature | Decision |"
        )?;
        writeln!(
            self.writer,
            "|------|------|------------|--------|----------|"
        )?;
        for output in outputs {
            writeln!(
                self.writer,
                "| `{}` | {} | {}% | {} | {} |",
                output.test_id,
                output.failure_type.title(),
                output.confidence_percent(),
                output.nature,
                output.decision
            )?;
        }
        writeln!(self.writer)?;

        // Markdown envelopes ignore the timestamp.
        for output in outputs.iter().filter(|o| o.decision != CiDecision::Pass) {
            writeln!(
                self.writer,
                "{}",
                output.annotation_block().render(Platform::Markdown, 0)
            )?;
            writeln!(self.writer)?;
        }
        Ok(())
    }

    fn write_input_errors(&mut self, outcome: &RunOutcome) -> anyhow::Result<()> {
        if outcome.input_errors.is_empty() {
            return Ok(());
        }
        writeln!(self.writer, "## Input Errors")?;
        writeln!(self.writer)?;
        for error in &outcome.input_errors {
            writeln!(
                self.writer,
                "- `{}` ({}, {}): {}",
                error.source, error.kind, error.code, error.message
            )?;
        }
        writeln!(self.writer)?;
        Ok(())
    }
}

/// Human-readable table plus the rendered CI annotations.
pub struct TerminalWriter<W: Write> {
    writer: W,
    styler: Styler,
}

impl<W: Write> TerminalWriter<W> {
    pub fn new(writer: W, styler: Styler) -> Self {
        Self { writer, styler }
    }

    fn write_table(&mut self, outputs: &[CiOutput]) -> anyhow::Result<()> {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["", "Test", "Type", "Confidence", "Nature", "Decision"]);
        for output in outputs {
            table.add_row(vec![
                self.styler.decision_marker(output.decision).to_string(),
                output.test_id.clone(),
                output.failure_type.title().to_string(),
                self.styler.confidence(output.confidence),
                self.styler.nature(output.nature),
                self.styler.decision(output.decision),
            ]);
        }
        writeln!(self.writer, "{table}")?;
        Ok(())
    }

    fn write_summary(&mut self, outcome: &RunOutcome) -> anyhow::Result<()> {
        let summary = &outcome.summary;
        writeln!(self.writer, "{}", self.styler.header("Summary"))?;
        writeln!(
            self.writer,
            "  {} total, {} passed, {} failed, {} skipped",
            summary.total, summary.passed, summary.failed, summary.skipped
        )?;
        if summary.classified > 0 {
            writeln!(
                self.writer,
                "  {} classified, average confidence {}",
                summary.classified,
                self.styler.confidence(summary.average_confidence)
            )?;
        }
        for (decision, count) in &summary.by_decision {
            writeln!(self.writer, "  {decision}: {count}")?;
        }
        Ok(())
    }
}

impl<W: Write> OutputWriter for TerminalWriter<W> {
    fn write_outcome(&mut self, outcome: &RunOutcome) -> anyhow::Result<()> {
        writeln!(
            self.writer,
            "{} {}",
            self.styler.header("Test Failure Triage"),
            self.styler.dim(&format!("({})", outcome.framework))
        )?;
        writeln!(self.writer)?;

        if outcome.outputs.is_empty() {
            writeln!(self.writer, "No failing tests.")?;
        } else {
            self.write_table(&outcome.outputs)?;
        }
        writeln!(self.writer)?;

        for annotation in outcome.outputs.iter().filter_map(|o| o.annotation.as_deref()) {
            writeln!(self.writer, "{annotation}")?;
            writeln!(self.writer)?;
        }

        for error in &outcome.input_errors {
            writeln!(
                self.writer,
                "{} {}: {}",
                self.styler.error("input error"),
                error.source,
                error.message
            )?;
        }

        self.write_summary(outcome)
    }
}

pub fn create_writer<'a, W: Write + 'a>(
    format: OutputFormat,
    writer: W,
    styler: Styler,
) -> Box<dyn OutputWriter + 'a> {
    match format {
        OutputFormat::Json => Box::new(JsonWriter::new(writer)),
        OutputFormat::Markdown => Box::new(MarkdownWriter::new(writer)),
        OutputFormat::Terminal => Box::new(TerminalWriter::new(writer, styler)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ci::RunSummary;
    use crate::core::{FailureType, Nature};
    use crate::history::HistoryTable;
    use crate::report::ReportCounters;
    use crate::testkit::CiOutputBuilder;

    fn outcome() -> RunOutcome {
        let mut fail = CiOutputBuilder::new("com.acme.CheckoutTest.testPlaceOrder")
            .failure_type(FailureType::ProductDefect)
            .nature(Nature::Deterministic)
            .confidence(0.92)
            .decision(CiDecision::Fail)
            .build();
        fail.annotation = Some(fail.annotation_block().render(Platform::Plain, 0));
        let pass = CiOutputBuilder::new("com.acme.LoginTest.testLogin")
            .failure_type(FailureType::Unknown)
            .confidence(0.3)
            .decision(CiDecision::Pass)
            .build();
        let outputs = vec![fail, pass];
        let counters = ReportCounters {
            total: 5,
            passed: 3,
            failed: 2,
            skipped: 0,
        };
        RunOutcome {
            framework: "selenium".to_string(),
            summary: RunSummary::build(counters, &outputs, 0),
            outputs,
            input_errors: Vec::new(),
            reports_total: 1,
            reports_loaded: 1,
            history: HistoryTable::default(),
        }
    }

    fn render(format: OutputFormat) -> String {
        let mut buffer = Vec::new();
        create_writer(format, &mut buffer, Styler::plain())
            .write_outcome(&outcome())
            .unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_json_output_is_parseable() {
        let json: serde_json::Value = serde_json::from_str(&render(OutputFormat::Json)).unwrap();
        assert_eq!(json["framework"], "selenium");
        assert_eq!(json["outputs"][0]["decision"], "FAIL");
        assert!(json.get("history").is_none());
    }

    #[test]
    fn test_markdown_output_collapses_non_pass_failures() {
        let md = render(OutputFormat::Markdown);
        assert!(md.contains("# Test Failure Triage"));
        assert!(md.contains("| `com.acme.CheckoutTest.testPlaceOrder` | Product defect | 92% |"));
        assert_eq!(md.matches("<details>").count(), 1);
    }

    #[test]
    fn test_terminal_output_lists_annotations() {
        let text = render(OutputFormat::Terminal);
        assert!(text.contains("[FAIL]"));
        assert!(text.contains("Type: Product defect (PRODUCT_DEFECT)"));
        assert!(text.contains("5 total, 3 passed, 2 failed, 0 skipped"));
    }

    #[test]
    fn test_output_format_serde_names() {
        let format: OutputFormat = serde_json::from_str("\"markdown\"").unwrap();
        assert_eq!(format, OutputFormat::Markdown);
    }
}
