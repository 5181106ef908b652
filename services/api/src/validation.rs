//! Input validation for scheduling requests

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use std::sync::OnceLock;

use crate::models::{
    event::{EventDetails, EventForm, Slot, SlotInput},
    user::UpdateUserRequest,
};

/// Validate a username or imported e-mail address
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.len() < 3 || username.len() > 254 {
        return Err("Username must be between 3 and 254 characters long".to_string());
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9_.@+-]+$").expect("Failed to compile username regex")
    });

    if !regex.is_match(username) {
        return Err(format!("Invalid username: {}", username));
    }

    Ok(())
}

fn required(field: &str, value: &str) -> Result<String, String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(format!("{} is required", field));
    }

    if value.len() > 255 {
        return Err(format!("{} must be at most 255 characters long", field));
    }

    Ok(value.to_string())
}

pub fn validate_group_name(name: &str) -> Result<String, String> {
    required("Group name", name)
}

pub fn validate_user_update(update: &UpdateUserRequest) -> Result<(), String> {
    required("Name", &update.name)?;
    required("Surname", &update.surname)?;
    Ok(())
}

/// Validate a `#rrggbb` color tag
pub fn validate_color(color: &str) -> Result<(), String> {
    static COLOR_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = COLOR_REGEX
        .get_or_init(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("Failed to compile color regex"));

    if !regex.is_match(color) {
        return Err("Color must have the form #rrggbb".to_string());
    }

    Ok(())
}

/// Validate the attributes shared by every slot of an event form
///
/// Slots themselves are checked one by one with [`parse_slot`] so that a
/// bad slot does not reject its siblings.
pub fn validate_event_form(form: &EventForm) -> Result<EventDetails, String> {
    let title = required("Title", &form.title)?;

    if form.slots.is_empty() {
        return Err("At least one date with start and end time is required".to_string());
    }

    if form.event_id.is_some() && form.slots.len() != 1 {
        return Err("An existing event takes exactly one date".to_string());
    }

    if let Some(capacity) = form.capacity {
        if capacity < 0 {
            return Err("Capacity cannot be negative".to_string());
        }
    }

    let color = form
        .color
        .as_deref()
        .map(str::trim)
        .filter(|color| !color.is_empty());
    if let Some(color) = color {
        validate_color(color)?;
    }

    let description = form
        .description
        .as_deref()
        .map(str::trim)
        .filter(|description| !description.is_empty())
        .map(str::to_string);

    Ok(EventDetails {
        title,
        description,
        group_id: form.group_id,
        capacity: form.capacity,
        color: color.map(str::to_string),
    })
}

fn parse_time(field: &str, value: &str) -> Result<NaiveTime, String> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| format!("Invalid {} '{}', expected HH:MM", field, value))
}

/// Parse one submitted slot, requiring start strictly before end
pub fn parse_slot(input: &SlotInput) -> Result<Slot, String> {
    let date = NaiveDate::parse_from_str(input.date.trim(), "%Y-%m-%d")
        .map_err(|_| format!("Invalid date '{}', expected YYYY-MM-DD", input.date.trim()))?;
    let start_time = parse_time("start time", &input.start_time)?;
    let end_time = parse_time("end time", &input.end_time)?;

    if start_time >= end_time {
        return Err(format!(
            "Start time {} must be before end time {} on {}",
            start_time.format("%H:%M"),
            end_time.format("%H:%M"),
            date
        ));
    }

    Ok(Slot {
        date,
        start_time,
        end_time,
    })
}
