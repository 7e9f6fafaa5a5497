//! Line-prefix structure of a report. No markdown parsing beyond these rules.

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReportLine {
    Heading(String),
    SubHeading(String),
    ListItem(String),
    Paragraph(String),
}

impl ReportLine {
    pub fn classify(line: &str) -> Self {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if let Some(rest) = line.strip_prefix("###") {
            ReportLine::Heading(rest.to_string())
        } else if line.starts_with("**") {
            ReportLine::SubHeading(line.replace("**", ""))
        } else if let Some(rest) = line.strip_prefix('-') {
            ReportLine::ListItem(rest.to_string())
        } else {
            ReportLine::Paragraph(line.to_string())
        }
    }

    pub fn text(&self) -> &str {
        match self {
            ReportLine::Heading(text)
            | ReportLine::SubHeading(text)
            | ReportLine::ListItem(text)
            | ReportLine::Paragraph(text) => text,
        }
    }
}

pub fn render_report(report: &str) -> Vec<ReportLine> {
    report.split('\n').map(ReportLine::classify).collect()
}

/// What the report area shows for a given state
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReportView {
    /// Analysis in flight, nothing received yet
    Skeleton,
    Empty,
    Lines(Vec<ReportLine>),
}

impl ReportView {
    pub fn new(report: Option<&str>, analyzing: bool) -> Self {
        match report {
            Some(text) if !text.is_empty() => ReportView::Lines(render_report(text)),
            _ if analyzing => ReportView::Skeleton,
            _ => ReportView::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_kinds() {
        assert_eq!(
            ReportLine::classify("### Health Check"),
            ReportLine::Heading(" Health Check".to_string())
        );
        assert_eq!(
            ReportLine::classify("**Motor 3** runs **hot**"),
            ReportLine::SubHeading("Motor 3 runs hot".to_string())
        );
        assert_eq!(
            ReportLine::classify("- Vibe Z peaks at 45 m/s/s"),
            ReportLine::ListItem(" Vibe Z peaks at 45 m/s/s".to_string())
        );
        assert_eq!(
            ReportLine::classify("Overall the tune is healthy."),
            ReportLine::Paragraph("Overall the tune is healthy.".to_string())
        );
        assert_eq!(ReportLine::classify(""), ReportLine::Paragraph(String::new()));
    }

    #[test]
    fn test_prefix_order_and_indentation() {
        // Only the leading characters count; an indented bullet stays a paragraph
        assert_eq!(
            ReportLine::classify("  - nested"),
            ReportLine::Paragraph("  - nested".to_string())
        );
        assert_eq!(
            ReportLine::classify("#### Deep"),
            ReportLine::Heading("# Deep".to_string())
        );
        assert_eq!(ReportLine::classify("---"), ReportLine::ListItem("--".to_string()));
    }

    #[test]
    fn test_render_report_handles_crlf() {
        let lines = render_report("### Power System\r\n- Sag 0.4 V\r\n\r\nDone");
        assert_eq!(
            lines,
            vec![
                ReportLine::Heading(" Power System".to_string()),
                ReportLine::ListItem(" Sag 0.4 V".to_string()),
                ReportLine::Paragraph(String::new()),
                ReportLine::Paragraph("Done".to_string()),
            ]
        );
    }

    #[test]
    fn test_view() {
        assert_eq!(ReportView::new(None, true), ReportView::Skeleton);
        assert_eq!(ReportView::new(Some(""), true), ReportView::Skeleton);
        assert_eq!(ReportView::new(None, false), ReportView::Empty);
        assert_eq!(ReportView::new(Some(""), false), ReportView::Empty);
        assert_eq!(
            ReportView::new(Some("x"), true),
            ReportView::Lines(vec![ReportLine::Paragraph("x".to_string())])
        );
    }
}
