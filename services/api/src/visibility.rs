//! Event visibility resolution
//!
//! Administrators see the whole catalog. Members see ungrouped events plus
//! the events of every group they belong to. Each visible event is annotated
//! with the viewer's participation and the colors derived from it.

use std::collections::HashSet;

use anyhow::Result;
use common::Role;
use uuid::Uuid;

use crate::{
    middleware::CurrentUser,
    models::event::{DEFAULT_EVENT_COLOR, DisplayColors, Event, EventView},
    repositories::{AttendanceRepository, EventRepository, GroupRepository, UserRepository},
};

/// Whether an event is visible to a viewer with the given role and groups
pub fn is_visible(role: Role, event: &Event, memberships: &HashSet<Uuid>) -> bool {
    if role.is_admin() {
        return true;
    }

    match event.group_id {
        None => true,
        Some(group_id) => memberships.contains(&group_id),
    }
}

/// Calendar colors for an event
///
/// A participant sees the event filled with its color. Otherwise the event
/// is drawn on white with the color carried by the text only.
pub fn display_colors(color: Option<&str>, participates: bool) -> DisplayColors {
    let color = color.unwrap_or(DEFAULT_EVENT_COLOR).to_string();

    if participates {
        DisplayColors {
            background: color.clone(),
            border: color,
            text: "black".to_string(),
        }
    } else {
        DisplayColors {
            background: "white".to_string(),
            border: "lightgrey".to_string(),
            text: color,
        }
    }
}

/// Filter a catalog down to what a viewer may see
///
/// Catalog order is preserved and each event id appears at most once.
pub fn resolve(
    role: Role,
    catalog: Vec<Event>,
    memberships: &HashSet<Uuid>,
    attending: &HashSet<Uuid>,
) -> Vec<EventView> {
    let mut seen = HashSet::new();

    catalog
        .into_iter()
        .filter(|event| is_visible(role, event, memberships))
        .filter(|event| seen.insert(event.id))
        .map(|event| {
            let participates = attending.contains(&event.id);
            let colors = display_colors(event.color.as_deref(), participates);
            EventView {
                id: event.id,
                title: event.title,
                description: event.description,
                group_id: event.group_id,
                group_name: event.group_name,
                date: event.date,
                start: event.start_time.format("%H:%M").to_string(),
                end: event.end_time.format("%H:%M").to_string(),
                capacity: event.capacity,
                participates,
                colors,
            }
        })
        .collect()
}

/// Resolves visibility against storage
#[derive(Clone)]
pub struct VisibilityService {
    users: UserRepository,
    groups: GroupRepository,
    events: EventRepository,
    attendance: AttendanceRepository,
}

impl VisibilityService {
    pub fn new(
        users: UserRepository,
        groups: GroupRepository,
        events: EventRepository,
        attendance: AttendanceRepository,
    ) -> Self {
        Self {
            users,
            groups,
            events,
            attendance,
        }
    }

    /// Every event the user may see; empty for an unknown user
    pub async fn visible_events(&self, user_id: Uuid, role: Role) -> Result<Vec<EventView>> {
        if self.users.find_by_id(user_id).await?.is_none() {
            return Ok(Vec::new());
        }

        let catalog = self.events.list_all().await?;
        let memberships = if role.is_admin() {
            HashSet::new()
        } else {
            self.groups.groups_of(user_id).await?
        };
        let attending = self.attendance.events_attended_by(user_id).await?;

        Ok(resolve(role, catalog, &memberships, &attending))
    }

    /// Load an event only if the caller may see it
    pub async fn visible_event(&self, user: &CurrentUser, event_id: Uuid) -> Result<Option<Event>> {
        let Some(event) = self.events.find_by_id(event_id).await? else {
            return Ok(None);
        };

        if user.role.is_admin() || event.group_id.is_none() {
            return Ok(Some(event));
        }

        let memberships = self.groups.groups_of(user.id).await?;
        Ok(is_visible(user.role, &event, &memberships).then_some(event))
    }
}
