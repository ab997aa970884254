//! Structured reports published to the operations channel.
//!
//! A report is a list of labeled sections. Each section carries its own
//! count and the members that fell into it, so operators can see
//! exactly who ended up where instead of one aggregate number.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::MemberId;

/// One member line inside a section, optionally annotated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub member: MemberId,
    pub note: Option<String>,
}

/// A labeled group of members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSection {
    pub label: String,
    pub count: usize,
    pub entries: Vec<ReportEntry>,
}

impl ReportSection {
    /// A section listing the given members; the count is their number.
    pub fn members(label: impl Into<String>, members: impl IntoIterator<Item = MemberId>) -> Self {
        let entries: Vec<ReportEntry> = members
            .into_iter()
            .map(|member| ReportEntry { member, note: None })
            .collect();
        Self {
            label: label.into(),
            count: entries.len(),
            entries,
        }
    }

    /// A section with no members yet.
    pub fn empty(label: impl Into<String>) -> Self {
        Self::tally(label, 0)
    }

    /// A section that only shows a number.
    pub fn tally(label: impl Into<String>, count: usize) -> Self {
        Self {
            label: label.into(),
            count,
            entries: Vec::new(),
        }
    }

    /// Appends a member line and bumps the count.
    pub fn push(&mut self, member: MemberId, note: Option<String>) {
        self.entries.push(ReportEntry { member, note });
        self.count += 1;
    }
}

/// A formatted result of a command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub sections: Vec<ReportSection>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_section(mut self, section: ReportSection) -> Self {
        self.sections.push(section);
        self
    }

    pub fn push(&mut self, section: ReportSection) {
        self.sections.push(section);
    }

    /// Looks a section up by label.
    pub fn section(&self, label: &str) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.label == label)
    }

    /// Every section label that mentions `member`.
    pub fn labels_for(&self, member: MemberId) -> Vec<&str> {
        self.sections
            .iter()
            .filter(|s| s.entries.iter().any(|e| e.member == member))
            .map(|s| s.label.as_str())
            .collect()
    }
}

/// Renders the chat form:
///
/// ```text
/// **Already here**: 2
/// <@1>
/// <@2>
/// **Summoned**: 1
/// <@3> (move failed)
/// ```
impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for section in &self.sections {
            if !first {
                writeln!(f)?;
            }
            first = false;
            write!(f, "**{}**: {}", section.label, section.count)?;
            for entry in &section.entries {
                match &entry.note {
                    Some(note) => write!(f, "\n{} ({note})", entry.member)?,
                    None => write!(f, "\n{}", entry.member)?,
                }
            }
        }
        Ok(())
    }
}

/// What the bot asks the platform to post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outgoing {
    Text(String),
    Report(Report),
}

impl fmt::Display for Outgoing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Report(report) => write!(f, "{report}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_groups_members_under_labels() {
        let mut summoned = ReportSection::empty("Summoned");
        summoned.push(MemberId(3), Some("move failed".into()));
        let report = Report::new()
            .with_section(ReportSection::members("Already here", [MemberId(1), MemberId(2)]))
            .with_section(summoned);

        assert_eq!(
            report.to_string(),
            "**Already here**: 2\n<@1>\n<@2>\n**Summoned**: 1\n<@3> (move failed)"
        );
    }

    #[test]
    fn test_tally_has_count_without_entries() {
        let report = Report::new().with_section(ReportSection::tally("Waiting", 7));
        assert_eq!(report.to_string(), "**Waiting**: 7");
        assert!(report.section("Waiting").unwrap().entries.is_empty());
    }

    #[test]
    fn test_labels_for_finds_every_section() {
        let report = Report::new()
            .with_section(ReportSection::members("A", [MemberId(1)]))
            .with_section(ReportSection::members("B", [MemberId(2)]))
            .with_section(ReportSection::members("C", [MemberId(1)]));
        assert_eq!(report.labels_for(MemberId(1)), vec!["A", "C"]);
        assert!(report.labels_for(MemberId(9)).is_empty());
    }
}
