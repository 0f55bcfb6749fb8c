//! Environment-specific identifier masking and remapping
//!
//! Pulled settings carry IDs, timestamps and creator names that differ per
//! environment. Masked ("alt") copies replace them with fixed placeholders and
//! sort object arrays so two environments can be diffed file by file.
//! Pushing to another environment instead rewrites lookup targets by app name.

use serde_json::{Map, Value};
use std::cmp::Ordering;

use super::app::{name_of, AppId, AppMap};
use super::catalog::{APP, CUSTOMIZE, FORM_FIELDS, FORM_LAYOUT, REPORTS, SETTINGS, VIEWS};
use crate::error::ConfigError;

const SORT_KEYS: [&str; 3] = ["code", "label", "elementId"];

/// Masked copy of a pulled payload, or `None` for endpoints without
/// environment-specific identifiers
pub fn mask(command: &str, payload: &Value) -> Option<Value> {
    let mut masked = payload.clone();
    match command {
        APP => mask_app(&mut masked),
        VIEWS => mask_ids(&mut masked, "views", "<VIEW_ID>"),
        REPORTS => mask_ids(&mut masked, "reports", "<REPORT_ID>"),
        CUSTOMIZE => mask_customize(&mut masked),
        SETTINGS => mask_settings(&mut masked),
        FORM_FIELDS => {
            if let Some(properties) = masked.get_mut("properties") {
                mask_related_apps(properties);
            }
            sort_object_arrays(&mut masked);
        }
        FORM_LAYOUT => sort_object_arrays(&mut masked),
        _ => return None,
    }
    Some(masked)
}

fn set(target: &mut Value, key: &str, placeholder: &str) {
    if let Some(obj) = target.as_object_mut() {
        obj.insert(key.to_string(), Value::String(placeholder.to_string()));
    }
}

fn mask_app(app: &mut Value) {
    set(app, "appId", "<APP_ID>");
    set(app, "name", "<APP_NAME>");
    set(app, "createdAt", "<CREATED_AT>");
    set(app, "modifiedAt", "<MODIFIED_AT>");
    set(app, "spaceId", "<SPACE_ID>");
    set(app, "threadId", "<THREAD_ID>");
    if let Some(creator) = app.get_mut("creator") {
        set(creator, "code", "<CREATOR_CODE>");
        set(creator, "name", "<CREATOR_NAME>");
    }
    if let Some(modifier) = app.get_mut("modifier") {
        set(modifier, "code", "<MODIFIER_CODE>");
        set(modifier, "name", "<MODIFIER_NAME>");
    }
}

fn mask_ids(payload: &mut Value, key: &str, placeholder: &str) {
    if let Some(entries) = payload.get_mut(key).and_then(Value::as_object_mut) {
        for entry in entries.values_mut() {
            set(entry, "id", placeholder);
        }
    }
}

fn mask_customize(customize: &mut Value) {
    for (platform, prefix) in [("desktop", "DESKTOP"), ("mobile", "MOBILE")] {
        if let Some(resources) = customize.get_mut(platform).and_then(Value::as_object_mut) {
            for kind in ["js", "css"] {
                let placeholder = format!("<{}_{}>", prefix, kind.to_uppercase());
                resources.insert(kind.to_string(), Value::Array(vec![Value::String(placeholder)]));
            }
        }
    }
}

fn mask_settings(settings: &mut Value) {
    set(settings, "name", "<APP_NAME>");
    if !is_file_icon(settings) {
        return;
    }
    if let Some(file) = settings.get_mut("icon").and_then(|icon| icon.get_mut("file")) {
        set(file, "fileKey", "<FILE_KEY>");
    }
}

fn is_file_icon(settings: &Value) -> bool {
    settings
        .get("icon")
        .and_then(|icon| icon.get("type"))
        .and_then(Value::as_str)
        == Some("FILE")
}

/// Related-app references of lookup and reference-table fields, subtables included
fn related_apps_mut(properties: &mut Value) -> Vec<&mut Value> {
    let mut found = Vec::new();
    let Some(props) = properties.as_object_mut() else {
        return found;
    };
    for prop in props.values_mut() {
        let Some(prop) = prop.as_object_mut() else {
            continue;
        };
        for (key, value) in prop.iter_mut() {
            match key.as_str() {
                "lookup" | "referenceTable" => {
                    if let Some(app) = value.get_mut("relatedApp").and_then(|r| r.get_mut("app")) {
                        found.push(app);
                    }
                }
                "fields" => found.extend(related_apps_mut(value)),
                _ => {}
            }
        }
    }
    found
}

fn mask_related_apps(properties: &mut Value) {
    for app in related_apps_mut(properties) {
        *app = Value::String("<APP_ID>".to_string());
    }
}

/// Sort every array of objects by its first present sort key, with the
/// compact JSON text as fallback and tie-break
fn sort_object_arrays(value: &mut Value) {
    match value {
        Value::Array(items) => {
            for item in items.iter_mut() {
                sort_object_arrays(item);
            }
            if !items.is_empty() && items.iter().all(Value::is_object) {
                items.sort_by(compare_entries);
            }
        }
        Value::Object(obj) => {
            for child in obj.values_mut() {
                sort_object_arrays(child);
            }
        }
        _ => {}
    }
}

fn sort_key(entry: &Value) -> Option<&str> {
    SORT_KEYS
        .iter()
        .find_map(|key| entry.get(*key).and_then(Value::as_str))
}

fn compare_entries(a: &Value, b: &Value) -> Ordering {
    let by_key = match (sort_key(a), sort_key(b)) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_key.then_with(|| a.to_string().cmp(&b.to_string()))
}

/// Drop the read-only app name and uploaded icon before a settings push
pub fn strip_settings_for_push(settings: &mut Value) {
    let file_icon = is_file_icon(settings);
    if let Some(obj) = settings.as_object_mut() {
        obj.remove("name");
        if file_icon {
            obj.remove("icon");
        }
    }
}

/// Rewrite lookup and reference-table targets from source app IDs to the
/// IDs the target environment uses for the same app names
pub fn remap_related_apps(
    properties: &mut Value,
    source_apps: &AppMap,
    source_environment: &str,
    target_apps: &AppMap,
    target_environment: &str,
) -> Result<(), ConfigError> {
    for app in related_apps_mut(properties) {
        let id = AppId::from_json(app).unwrap_or_else(|| AppId::new(app.to_string()));
        let name = name_of(source_apps, &id).ok_or_else(|| ConfigError::AppNotFound {
            app: id.to_string(),
            environment: source_environment.to_string(),
        })?;
        let target = target_apps.get(name).ok_or_else(|| ConfigError::AppNotFound {
            app: name.to_string(),
            environment: target_environment.to_string(),
        })?;
        *app = target.to_json();
    }
    Ok(())
}

/// Split the optimistic-concurrency counter off a pulled payload
pub fn split_revision(payload: Value) -> (Value, Option<Value>) {
    match payload {
        Value::Object(mut obj) => {
            let revision = obj.remove("revision");
            (Value::Object(obj), revision)
        }
        other => (other, None),
    }
}

/// Sidecar content for a split-off revision
pub fn revision_document(revision: Value) -> Value {
    let mut doc = Map::new();
    doc.insert("revision".to_string(), revision);
    Value::Object(doc)
}
