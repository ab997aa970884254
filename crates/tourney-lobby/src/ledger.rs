//! Per-member bookkeeping for bulk moves.
//!
//! Every member handled by a bulk command lands in exactly one
//! [`Bucket`]. The ledger turns into a [`Report`] with one section per
//! bucket so operators see who was skipped and why.

use std::collections::BTreeMap;

use tourney_protocol::{MemberId, Report, ReportEntry, ReportSection};

use crate::Eligibility;

/// Outcome group of a member in a bulk move. Declared in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bucket {
    Present,
    Moved,
    Faraway,
    Mobile,
    Invisible,
    Busy,
    Failed,
}

impl Bucket {
    pub const ALL: [Bucket; 7] = [
        Self::Present,
        Self::Moved,
        Self::Faraway,
        Self::Mobile,
        Self::Invisible,
        Self::Busy,
        Self::Failed,
    ];

    /// The bucket a member is held in when no move is attempted.
    pub fn held(eligibility: Eligibility) -> Self {
        match eligibility {
            Eligibility::Faraway => Self::Faraway,
            Eligibility::AlreadyPresent => Self::Present,
            Eligibility::Mobile => Self::Mobile,
            Eligibility::Invisible => Self::Invisible,
            Eligibility::Busy => Self::Busy,
            Eligibility::Eligible => Self::Moved,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MoveLedger {
    buckets: BTreeMap<Bucket, Vec<ReportEntry>>,
}

impl MoveLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, bucket: Bucket, member: MemberId, note: Option<String>) {
        self.buckets
            .entry(bucket)
            .or_default()
            .push(ReportEntry { member, note });
    }

    /// A member left where they are because of `eligibility`.
    pub fn hold(&mut self, member: MemberId, eligibility: Eligibility) {
        self.record(Bucket::held(eligibility), member, None);
    }

    pub fn moved(&mut self, member: MemberId) {
        self.record(Bucket::Moved, member, None);
    }

    /// A move that was attempted and rejected by the platform.
    pub fn failed(&mut self, member: MemberId, reason: impl Into<String>) {
        self.record(Bucket::Failed, member, Some(reason.into()));
    }

    pub fn count(&self, bucket: Bucket) -> usize {
        self.buckets.get(&bucket).map_or(0, Vec::len)
    }

    pub fn members(&self, bucket: Bucket) -> Vec<MemberId> {
        self.buckets
            .get(&bucket)
            .map(|entries| entries.iter().map(|e| e.member).collect())
            .unwrap_or_default()
    }

    /// Total members recorded across all buckets.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One section per bucket, labeled by `label`, in [`Bucket::ALL`]
    /// order. Empty buckets still show a zero count.
    pub fn into_report(mut self, label: impl Fn(Bucket) -> String) -> Report {
        let mut report = Report::new();
        for bucket in Bucket::ALL {
            let mut section = ReportSection::empty(label(bucket));
            for entry in self.buckets.remove(&bucket).unwrap_or_default() {
                section.push(entry.member, entry.note);
            }
            report.push(section);
        }
        report
    }
}
