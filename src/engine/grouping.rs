//! Reconstruction of logical block groups from a flat stored set, for
//! unified display and bulk deletion.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::model::{GroupKind, Interval, IntervalKind};
use crate::tz;

/// One logical unit of related blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockGroup {
    pub kind: GroupKind,
    pub reason: String,
    /// Business dates of the first and last member, for range display.
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    /// True when every member starts before the grouping call's `now`.
    pub is_past: bool,
    /// Members sorted by start ascending.
    pub members: Vec<Interval>,
}

/// Classification of an owner's blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupedBlocks {
    pub month_leaves: Vec<BlockGroup>,
    pub bulk_blocks: Vec<BlockGroup>,
    pub individual: Vec<Interval>,
    pub past: Vec<Interval>,
}

/// Partition `blocks` by past/future against a single `now` snapshot, then
/// bucket the non-past remainder: month leaves by business `(year, month)`,
/// bulk blocks by exact reason text, ungrouped blocks as individuals.
/// Non-block intervals are ignored.
pub fn group_blocks(blocks: &[Interval], now: DateTime<Utc>) -> GroupedBlocks {
    let mut out = GroupedBlocks::default();
    let mut month_buckets: BTreeMap<(i32, u32), Vec<Interval>> = BTreeMap::new();
    let mut bulk_buckets: BTreeMap<String, Vec<Interval>> = BTreeMap::new();

    for block in blocks {
        let IntervalKind::Block { reason, group } = &block.kind else {
            continue;
        };
        if block.start < now {
            out.past.push(block.clone());
            continue;
        }
        match group {
            GroupKind::MonthLeave => {
                let date = tz::business_date(block.start);
                month_buckets
                    .entry((date.year(), date.month()))
                    .or_default()
                    .push(block.clone());
            }
            GroupKind::Bulk => {
                bulk_buckets.entry(reason.clone()).or_default().push(block.clone());
            }
            GroupKind::None => out.individual.push(block.clone()),
        }
    }

    out.past.sort_by_key(|b| b.start);
    out.individual.sort_by_key(|b| b.start);
    out.month_leaves = month_buckets
        .into_values()
        .filter_map(|members| make_group(members, now))
        .collect();
    out.bulk_blocks = bulk_buckets
        .into_values()
        .filter_map(|members| make_group(members, now))
        .collect();
    out.month_leaves.sort_by_key(|g| g.first_date);
    out.bulk_blocks.sort_by_key(|g| g.first_date);
    out
}

fn make_group(mut members: Vec<Interval>, now: DateTime<Utc>) -> Option<BlockGroup> {
    members.sort_by_key(|b| b.start);
    let first = members.first()?;
    let (reason, kind) = match &first.kind {
        IntervalKind::Block { reason, group } => (reason.clone(), *group),
        IntervalKind::Appointment { .. } => return None,
    };
    let first_date = tz::business_date(first.start);
    let last_date = tz::business_date(members.last()?.start);
    let is_past = members.iter().all(|m| m.start < now);
    Some(BlockGroup {
        kind,
        reason,
        first_date,
        last_date,
        is_past,
        members,
    })
}
