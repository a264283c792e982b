use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SanityStatus {
    Ok,
    Warn,
    Error,
}

impl SanityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SanityStatus::Ok => "OK",
            SanityStatus::Warn => "WARN",
            SanityStatus::Error => "ERROR",
        }
    }
}

/// One finding of the scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SanityItem {
    pub name: String,
    pub status: SanityStatus,
    pub detail: String,
    pub remediation: Option<String>,
}

impl SanityItem {
    pub fn ok(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: SanityStatus::Ok,
            detail: detail.into(),
            remediation: None,
        }
    }

    pub fn warn(name: impl Into<String>, detail: impl Into<String>, remediation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: SanityStatus::Warn,
            detail: detail.into(),
            remediation: Some(remediation.into()),
        }
    }

    pub fn error(name: impl Into<String>, detail: impl Into<String>, remediation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: SanityStatus::Error,
            detail: detail.into(),
            remediation: Some(remediation.into()),
        }
    }
}

/// Counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SanityCounts {
    pub ok: usize,
    pub warn: usize,
    pub error: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SanityReport {
    pub items: Vec<SanityItem>,
}

impl SanityReport {
    pub fn counts(&self) -> SanityCounts {
        let mut counts = SanityCounts::default();
        for item in &self.items {
            match item.status {
                SanityStatus::Ok => counts.ok += 1,
                SanityStatus::Warn => counts.warn += 1,
                SanityStatus::Error => counts.error += 1,
            }
        }
        counts
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|i| i.status == SanityStatus::Error)
    }

    pub fn get(&self, name: &str) -> Option<&SanityItem> {
        self.items.iter().find(|i| i.name == name)
    }
}

/// Plain-text table of the findings followed by a summary line.
pub fn render_report(report: &SanityReport) -> String {
    let name_width = report
        .items
        .iter()
        .map(|i| i.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Check".len());

    let mut out = String::from("Sanity Scan\n");
    out.push_str(&format!("  {:<name_width$}  {:<6}  {}\n", "Check", "Status", "Details"));
    for item in &report.items {
        out.push_str(&format!(
            "  {:<name_width$}  {:<6}  {}\n",
            item.name,
            item.status.as_str(),
            item.detail
        ));
        if let Some(hint) = &item.remediation {
            out.push_str(&format!("  {:<name_width$}  {:<6}  {}\n", "", "", hint));
        }
    }
    let counts = report.counts();
    out.push_str(&format!(
        "Summary: OK={}, WARN={}, ERROR={}\n",
        counts.ok, counts.warn, counts.error
    ));
    if report.has_errors() {
        out.push_str("Resolve the errors above before continuing.\n");
    }
    out
}
