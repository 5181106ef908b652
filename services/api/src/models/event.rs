//! Event catalog models

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Color used when an event carries none
pub const DEFAULT_EVENT_COLOR: &str = "#3788d8";

/// A scheduled occurrence with its optional group
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub capacity: Option<i32>,
    pub group_id: Option<Uuid>,
    pub group_name: Option<String>,
    pub color: Option<String>,
}

/// One time slot as submitted by the client
#[derive(Debug, Clone, Deserialize)]
pub struct SlotInput {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
}

/// Batch create, or single update when `event_id` is set
#[derive(Debug, Clone, Deserialize)]
pub struct EventForm {
    pub event_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub group_id: Option<Uuid>,
    pub capacity: Option<i32>,
    pub color: Option<String>,
    #[serde(default)]
    pub slots: Vec<SlotInput>,
}

/// Validated attributes shared by every slot in a form
#[derive(Debug, Clone, PartialEq)]
pub struct EventDetails {
    pub title: String,
    pub description: Option<String>,
    pub group_id: Option<Uuid>,
    pub capacity: Option<i32>,
    pub color: Option<String>,
}

/// A validated slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// Per-slot result of a batch submission
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SlotOutcome {
    Created { event_id: Uuid },
    Updated { event_id: Uuid },
    Rejected { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotResult {
    pub index: usize,
    #[serde(flatten)]
    pub outcome: SlotOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventBatchResponse {
    pub saved: usize,
    pub rejected: usize,
    pub results: Vec<SlotResult>,
}

/// Calendar colors derived from participation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayColors {
    pub background: String,
    pub border: String,
    pub text: String,
}

/// An event as presented to a particular viewer
#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub group_id: Option<Uuid>,
    pub group_name: Option<String>,
    pub date: NaiveDate,
    pub start: String,
    pub end: String,
    pub capacity: Option<i32>,
    pub participates: bool,
    pub colors: DisplayColors,
}
