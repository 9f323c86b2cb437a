use super::*;

fn status(flags: &[StatusFlag]) -> OrderStatus {
    OrderStatus::from_flags(flags.to_vec()).unwrap()
}

// =============================================================================
// StatusFlag
// =============================================================================

#[test]
fn parse_accepts_wire_names_and_dashes() {
    assert_eq!(StatusFlag::parse("IN_PROGRESS"), Some(StatusFlag::InProgress));
    assert_eq!(StatusFlag::parse("in-progress"), Some(StatusFlag::InProgress));
    assert_eq!(StatusFlag::parse(" has_problem "), Some(StatusFlag::HasProblem));
    assert_eq!(StatusFlag::parse("SHIPPED"), None);
}

#[test]
fn primary_and_secondary_partition_all_flags() {
    for flag in StatusFlag::PRIMARY {
        assert!(flag.is_primary());
    }
    for flag in StatusFlag::SECONDARY {
        assert!(!flag.is_primary());
    }
}

#[test]
fn flag_serializes_screaming_snake_case() {
    let json = serde_json::to_string(&StatusFlag::InProgress).unwrap();
    assert_eq!(json, "\"IN_PROGRESS\"");
}

// =============================================================================
// OrderStatus construction
// =============================================================================

#[test]
fn from_flags_rejects_empty() {
    assert_eq!(OrderStatus::from_flags(Vec::new()), Err(StatusError::Empty));
}

#[test]
fn from_flags_drops_duplicates_keeping_order() {
    let s = status(&[StatusFlag::Ready, StatusFlag::Delayed, StatusFlag::Ready]);
    assert_eq!(s.flags(), &[StatusFlag::Ready, StatusFlag::Delayed]);
}

#[test]
fn from_strings_reports_unknown_flag() {
    let err = OrderStatus::from_strings(&["PENDING", "LOST"]).unwrap_err();
    assert_eq!(err, StatusError::UnknownFlag("LOST".into()));
}

#[test]
fn strings_round_trip_through_text_array() {
    let s = status(&[StatusFlag::Ready, StatusFlag::HasProblem]);
    let raw = s.to_strings();
    assert_eq!(raw, vec!["READY".to_owned(), "HAS_PROBLEM".to_owned()]);
    assert_eq!(OrderStatus::from_strings(&raw).unwrap(), s);
}

#[test]
fn deserialize_rejects_empty_array() {
    let result: Result<OrderStatus, _> = serde_json::from_str("[]");
    assert!(result.is_err());
}

#[test]
fn deserialize_accepts_coexisting_flags() {
    let s: OrderStatus = serde_json::from_str(r#"["READY","HAS_PROBLEM"]"#).unwrap();
    assert!(s.has(StatusFlag::Ready));
    assert!(s.has(StatusFlag::HasProblem));
}

// =============================================================================
// Transitions
// =============================================================================

#[test]
fn primary_is_first_primary_flag() {
    let s = status(&[StatusFlag::HasProblem, StatusFlag::InProgress]);
    assert_eq!(s.primary(), Some(StatusFlag::InProgress));
    assert_eq!(status(&[StatusFlag::HasProblem]).primary(), None);
}

#[test]
fn with_primary_keeps_secondary_flags() {
    let s = status(&[StatusFlag::Pending, StatusFlag::Delayed, StatusFlag::HasProblem]);
    let next = s.with_primary(StatusFlag::InProgress);
    assert_eq!(
        next.flags(),
        &[StatusFlag::InProgress, StatusFlag::Delayed, StatusFlag::HasProblem]
    );
}

#[test]
fn with_primary_replaces_every_primary_entry() {
    let s = status(&[StatusFlag::Pending, StatusFlag::Ready]);
    let next = s.with_primary(StatusFlag::InProgress);
    assert_eq!(next.flags(), &[StatusFlag::InProgress]);
}

#[test]
fn toggle_adds_then_removes_secondary_flag() {
    let s = OrderStatus::pending();
    let flagged = s.toggle(StatusFlag::HasProblem).unwrap();
    assert_eq!(flagged.flags(), &[StatusFlag::Pending, StatusFlag::HasProblem]);
    let cleared = flagged.toggle(StatusFlag::HasProblem).unwrap();
    assert_eq!(cleared, s);
}

#[test]
fn toggle_rejects_primary_flag() {
    let err = OrderStatus::pending().toggle(StatusFlag::Ready).unwrap_err();
    assert_eq!(err, StatusError::NotToggleable(StatusFlag::Ready));
}

#[test]
fn toggle_never_empties_the_list() {
    let s = status(&[StatusFlag::HasProblem]);
    let after = s.toggle(StatusFlag::HasProblem).unwrap();
    assert_eq!(after.flags(), &[StatusFlag::HasProblem]);
}

#[test]
fn completed_clears_all_flags() {
    assert_eq!(OrderStatus::completed().flags(), &[StatusFlag::Complete]);
}

#[test]
fn is_active_excludes_complete_and_cancelled() {
    assert!(OrderStatus::pending().is_active());
    assert!(status(&[StatusFlag::Ready, StatusFlag::HasProblem]).is_active());
    assert!(!OrderStatus::completed().is_active());
    assert!(!status(&[StatusFlag::InProgress, StatusFlag::Cancelled]).is_active());
}

// =============================================================================
// Filter / sort
// =============================================================================

#[test]
fn filter_parse_accepts_ui_names() {
    assert_eq!(OrderFilter::parse("in-progress"), Some(OrderFilter::InProgress));
    assert_eq!(OrderFilter::parse("problems"), Some(OrderFilter::Problems));
    assert_eq!(OrderFilter::parse("weird"), None);
}

#[test]
fn sort_parse_and_order_by() {
    assert_eq!(OrderSort::parse("queue-desc"), Some(OrderSort::QueueDesc));
    assert_eq!(OrderSort::default().order_by(), "placed_at DESC");
    assert!(OrderSort::TotalLow.order_by().starts_with("total_cents ASC"));
    assert_eq!(OrderSort::parse("random"), None);
}
