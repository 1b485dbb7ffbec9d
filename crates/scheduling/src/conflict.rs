use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::interval::{Interval, OverlapPolicy};

/// An already booked presentation as seen by the conflict checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledSlot {
  pub id: Uuid,
  pub group_id: Uuid,
  pub project_name: String,
  pub interval: Interval,
}

/// A proposed booking. `exclude_id` names the presentation being edited so it
/// never collides with its own previous interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictQuery {
  pub group_id: Uuid,
  pub interval: Interval,
  pub exclude_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConflictDetail {
  pub project_name: String,
  pub start_time: DateTime<Utc>,
  pub end_time: DateTime<Utc>,
}

impl From<&ScheduledSlot> for ConflictDetail {
  fn from(slot: &ScheduledSlot) -> Self {
    Self {
      project_name: slot.project_name.clone(),
      start_time: slot.interval.start(),
      end_time: slot.interval.end(),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConflictReport {
  pub has_conflict: bool,
  pub details: Vec<ConflictDetail>,
}

impl ConflictReport {
  fn from_details(mut details: Vec<ConflictDetail>) -> Self {
    details.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.end_time.cmp(&b.end_time)));

    Self {
      has_conflict: !details.is_empty(),
      details,
    }
  }

  /// Combines the reports of several proposed intervals checked against the same group.
  /// A booking reported by both sides is listed once.
  pub fn merge(self, other: ConflictReport) -> Self {
    let mut details = self.details;
    for detail in other.details {
      if !details.contains(&detail) {
        details.push(detail);
      }
    }

    Self::from_details(details)
  }
}

/// Storage side of the conflict check: lists the bookings of one group.
///
/// Implementations may already drop `exclude_id` and may return slots of other
/// groups; the checker filters both again.
#[async_trait]
pub trait SlotSource: Send {
  type Error: Send;

  async fn group_slots(&mut self, group_id: Uuid, exclude_id: Option<Uuid>) -> Result<Vec<ScheduledSlot>, Self::Error>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConflictChecker {
  policy: OverlapPolicy,
}

impl ConflictChecker {
  pub fn new(policy: OverlapPolicy) -> Self {
    Self { policy }
  }

  pub fn policy(&self) -> OverlapPolicy {
    self.policy
  }

  /// Collects every slot of the query's group that overlaps the proposed interval.
  pub fn evaluate<'a, I>(&self, query: &ConflictQuery, slots: I) -> ConflictReport
  where
    I: IntoIterator<Item = &'a ScheduledSlot>,
  {
    let details = slots
      .into_iter()
      .filter(|slot| slot.group_id == query.group_id)
      .filter(|slot| query.exclude_id != Some(slot.id))
      .filter(|slot| slot.interval.overlaps(&query.interval, self.policy))
      .map(ConflictDetail::from)
      .collect();

    ConflictReport::from_details(details)
  }

  /// Checks slots that are all about to land in `group_id`, for example the
  /// presentations of a project moving to that group.
  ///
  /// Each incoming slot is compared with the group's current bookings and with
  /// the other incoming slots. An incoming slot that is already booked in the
  /// group only counts once.
  pub fn evaluate_incoming(&self, group_id: Uuid, incoming: &[ScheduledSlot], existing: &[ScheduledSlot]) -> ConflictReport {
    let candidates: Vec<ScheduledSlot> = existing
      .iter()
      .filter(|slot| incoming.iter().all(|moving| moving.id != slot.id))
      .cloned()
      .chain(incoming.iter().map(|slot| ScheduledSlot {
        group_id,
        ..slot.clone()
      }))
      .collect();

    incoming.iter().fold(ConflictReport::default(), |report, slot| {
      let query = ConflictQuery {
        group_id,
        interval: slot.interval,
        exclude_id: Some(slot.id),
      };
      report.merge(self.evaluate(&query, &candidates))
    })
  }

  pub async fn check<S>(&self, source: &mut S, query: &ConflictQuery) -> Result<ConflictReport, S::Error>
  where
    S: SlotSource + ?Sized,
  {
    let slots = source.group_slots(query.group_id, query.exclude_id).await?;

    Ok(self.evaluate(query, &slots))
  }
}

#[cfg(test)]
mod tests {
  use std::convert::Infallible;

  use chrono::{Duration, TimeZone};
  use proptest::prelude::*;

  use super::*;

  struct InMemorySlots(Vec<ScheduledSlot>);

  #[async_trait]
  impl SlotSource for InMemorySlots {
    type Error = Infallible;

    async fn group_slots(&mut self, group_id: Uuid, _exclude_id: Option<Uuid>) -> Result<Vec<ScheduledSlot>, Infallible> {
      Ok(self.0.iter().filter(|slot| slot.group_id == group_id).cloned().collect())
    }
  }

  fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, 0).unwrap()
  }

  fn interval(from: (u32, u32), to: (u32, u32)) -> Interval {
    Interval::new(at(from.0, from.1), at(to.0, to.1)).unwrap()
  }

  fn slot(group_id: Uuid, name: &str, interval: Interval) -> ScheduledSlot {
    ScheduledSlot {
      id: Uuid::new_v4(),
      group_id,
      project_name: name.to_string(),
      interval,
    }
  }

  fn query(group_id: Uuid, interval: Interval, exclude_id: Option<Uuid>) -> ConflictQuery {
    ConflictQuery {
      group_id,
      interval,
      exclude_id,
    }
  }

  #[test]
  fn test_partial_overlap_reports_existing_booking() {
    let group = Uuid::new_v4();
    let p1 = slot(group, "Compiler", interval((10, 0), (11, 0)));

    let report = ConflictChecker::default().evaluate(&query(group, interval((10, 30), (11, 30)), None), [&p1]);

    assert!(report.has_conflict);
    assert_eq!(
      report.details,
      vec![ConflictDetail {
        project_name: "Compiler".to_string(),
        start_time: at(10, 0),
        end_time: at(11, 0),
      }]
    );
  }

  #[test]
  fn test_back_to_back_booking_conflicts_only_when_inclusive() {
    let group = Uuid::new_v4();
    let p1 = slot(group, "Compiler", interval((10, 0), (11, 0)));
    let next = query(group, interval((11, 0), (12, 0)), None);

    assert!(ConflictChecker::new(OverlapPolicy::Inclusive).evaluate(&next, [&p1]).has_conflict);
    assert!(!ConflictChecker::new(OverlapPolicy::HalfOpen).evaluate(&next, [&p1]).has_conflict);
  }

  #[test]
  fn test_rescheduling_itself_is_not_a_conflict() {
    let group = Uuid::new_v4();
    let p1 = slot(group, "Compiler", interval((10, 0), (11, 0)));

    let report = ConflictChecker::default().evaluate(&query(group, interval((10, 15), (11, 15)), Some(p1.id)), [&p1]);

    assert_eq!(report, ConflictReport::default());
  }

  #[test]
  fn test_other_groups_never_conflict() {
    let (group_a, group_b) = (Uuid::new_v4(), Uuid::new_v4());
    let p1 = slot(group_a, "Compiler", interval((10, 0), (11, 0)));

    let report = ConflictChecker::default().evaluate(&query(group_b, interval((10, 0), (11, 0)), None), [&p1]);

    assert!(!report.has_conflict);
  }

  #[test]
  fn test_details_list_every_overlap_in_start_order() {
    let group = Uuid::new_v4();
    let slots = vec![
      slot(group, "Late", interval((13, 0), (14, 0))),
      slot(group, "Early", interval((9, 0), (10, 30))),
      slot(group, "Elsewhere", interval((16, 0), (17, 0))),
    ];

    let report = ConflictChecker::default().evaluate(&query(group, interval((10, 0), (13, 30)), None), &slots);

    let names: Vec<_> = report.details.iter().map(|d| d.project_name.as_str()).collect();
    assert_eq!(names, vec!["Early", "Late"]);
  }

  #[test]
  fn test_merged_reports_stay_ordered() {
    let group = Uuid::new_v4();
    let late = slot(group, "Late", interval((13, 0), (14, 0)));
    let early = slot(group, "Early", interval((9, 0), (10, 0)));
    let checker = ConflictChecker::default();

    let merged = checker
      .evaluate(&query(group, interval((13, 30), (15, 0)), None), [&late])
      .merge(checker.evaluate(&query(group, interval((9, 30), (9, 45)), None), [&early]))
      .merge(ConflictReport::default());

    assert!(merged.has_conflict);
    let names: Vec<_> = merged.details.iter().map(|d| d.project_name.as_str()).collect();
    assert_eq!(names, vec!["Early", "Late"]);
    assert!(!ConflictReport::default().merge(ConflictReport::default()).has_conflict);
  }

  #[test]
  fn test_incoming_slots_are_checked_against_each_other() {
    let (group_a, group_b, target) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let from_a = slot(group_a, "Compiler", interval((10, 0), (11, 0)));
    let from_b = slot(group_b, "Compiler", interval((10, 30), (11, 30)));

    let report = ConflictChecker::default().evaluate_incoming(target, &[from_a, from_b], &[]);

    assert!(report.has_conflict);
    let starts: Vec<_> = report.details.iter().map(|d| d.start_time).collect();
    assert_eq!(starts, vec![at(10, 0), at(10, 30)]);
  }

  #[test]
  fn test_incoming_slots_against_the_target_schedule() {
    let (source, target) = (Uuid::new_v4(), Uuid::new_v4());
    let resident = slot(target, "Database", interval((10, 30), (11, 30)));
    let early = slot(source, "Compiler", interval((10, 0), (11, 0)));
    let late = slot(source, "Compiler", interval((11, 15), (12, 15)));
    let checker = ConflictChecker::default();

    let report = checker.evaluate_incoming(target, &[early.clone(), late.clone()], &[resident.clone()]);

    // both moved slots hit the resident booking, which is listed once
    let names: Vec<_> = report.details.iter().map(|d| d.project_name.as_str()).collect();
    assert_eq!(names, vec!["Database"]);

    let free = slot(source, "Compiler", interval((13, 0), (14, 0)));
    assert!(!checker.evaluate_incoming(target, &[free], &[resident]).has_conflict);
  }

  #[test]
  fn test_incoming_slot_already_in_target_is_not_its_own_conflict() {
    let target = Uuid::new_v4();
    let staying = slot(target, "Compiler", interval((10, 0), (11, 0)));

    let report = ConflictChecker::default().evaluate_incoming(target, &[staying.clone()], &[staying]);

    assert!(!report.has_conflict);
  }

  #[tokio::test]
  async fn test_check_reads_from_source() {
    let group = Uuid::new_v4();
    let p1 = slot(group, "Compiler", interval((10, 0), (11, 0)));
    let mut source = InMemorySlots(vec![p1.clone(), slot(Uuid::new_v4(), "Other", interval((10, 0), (11, 0)))]);
    let checker = ConflictChecker::default();

    let clash = checker
      .check(&mut source, &query(group, interval((10, 30), (11, 30)), None))
      .await
      .unwrap();
    let moved = checker
      .check(&mut source, &query(group, interval((10, 30), (11, 30)), Some(p1.id)))
      .await
      .unwrap();

    assert_eq!(clash.details.len(), 1);
    assert!(!moved.has_conflict);
  }

  fn arb_interval() -> impl Strategy<Value = Interval> {
    (0i64..1_000, 1i64..500).prop_map(|(start, length)| {
      let start = at(0, 0) + Duration::minutes(start);
      Interval::new(start, start + Duration::minutes(length)).unwrap()
    })
  }

  fn arb_policy() -> impl Strategy<Value = OverlapPolicy> {
    prop_oneof![Just(OverlapPolicy::Inclusive), Just(OverlapPolicy::HalfOpen)]
  }

  proptest! {
    #[test]
    fn conflict_is_symmetric(a in arb_interval(), b in arb_interval(), policy in arb_policy()) {
      let group = Uuid::new_v4();
      let checker = ConflictChecker::new(policy);
      let (slot_a, slot_b) = (slot(group, "a", a), slot(group, "b", b));

      prop_assert_eq!(
        checker.evaluate(&query(group, a, None), [&slot_b]).has_conflict,
        checker.evaluate(&query(group, b, None), [&slot_a]).has_conflict
      );
    }

    #[test]
    fn interval_conflicts_with_itself_unless_excluded(a in arb_interval(), policy in arb_policy()) {
      let group = Uuid::new_v4();
      let checker = ConflictChecker::new(policy);
      let existing = slot(group, "a", a);

      prop_assert!(checker.evaluate(&query(group, a, None), [&existing]).has_conflict);
      prop_assert!(!checker.evaluate(&query(group, a, Some(existing.id)), [&existing]).has_conflict);
    }

    #[test]
    fn separated_intervals_never_conflict(a in arb_interval(), gap in 1i64..500, length in 1i64..500, policy in arb_policy()) {
      let group = Uuid::new_v4();
      let start = a.end() + Duration::minutes(gap);
      let b = Interval::new(start, start + Duration::minutes(length)).unwrap();
      let existing = slot(group, "a", a);

      prop_assert!(!ConflictChecker::new(policy).evaluate(&query(group, b, None), [&existing]).has_conflict);
    }
  }
}
