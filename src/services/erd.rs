//! PlantUML entity-relationship diagram of an environment's apps
//!
//! One entity per app, named after its kintone display name, and one
//! `"<related>" --{ "<app>"` edge per lookup field that points at another app
//! of the same map. Lookups inside subtables are not followed.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::PathBuf;

use crate::domain::app::{AppId, AppMap};
use crate::domain::catalog::{APP, FORM_FIELDS};
use crate::infrastructure::store::LocalStore;
use crate::ui;

pub const ERD_FILE: &str = "erd.pu";

/// What the diagram needs to know about one app
#[derive(Debug, Clone, PartialEq)]
pub struct ErdEntity {
    pub id: AppId,
    pub name: String,
    /// App IDs referenced by top-level lookup fields
    pub lookups: Vec<AppId>,
}

impl ErdEntity {
    /// Build from pulled `app.json` and `app/form/fields.json` documents
    pub fn from_documents(id: AppId, app: &Value, fields: &Value) -> Self {
        let name = app
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(id.as_str())
            .to_string();
        let lookups = fields
            .get("properties")
            .and_then(Value::as_object)
            .map(|properties| {
                properties
                    .values()
                    .filter_map(|prop| prop.get("lookup")?.get("relatedApp")?.get("app"))
                    .filter_map(AppId::from_json)
                    .collect()
            })
            .unwrap_or_default();
        Self { id, name, lookups }
    }
}

pub fn render(entities: &[ErdEntity]) -> String {
    let mut lines = vec![
        "@startuml".to_string(),
        String::new(),
        "hide empty members".to_string(),
        "!define ENTITY_MARK_COLOR B3CFB3".to_string(),
        String::new(),
    ];

    for entity in entities {
        lines.push(format!("entity \"{}\" <<E,ENTITY_MARK_COLOR>> {{\n}}", entity.name));
    }

    for entity in entities {
        for related in &entity.lookups {
            if let Some(target) = entities.iter().find(|e| &e.id == related) {
                lines.push(format!("\"{}\" --{{ \"{}\"", target.name, entity.name));
            }
        }
    }

    lines.push("@enduml".to_string());
    lines.join("\n")
}

/// Read every app of `apps` from the local tree and write `erd.pu`
pub fn write_erd(store: &LocalStore, apps: &AppMap) -> Result<PathBuf> {
    let mut entities = Vec::with_capacity(apps.len());
    for (name, id) in apps {
        let app = store
            .load(name, APP)
            .with_context(|| format!("Pull {} before drawing the ERD", name))?;
        let fields = store.load(name, FORM_FIELDS)?;
        entities.push(ErdEntity::from_documents(id.clone(), &app, &fields));
    }

    let path = store.layout().base_dir(false).join(ERD_FILE);
    store.save_bytes(&path, render(&entities).as_bytes())?;
    ui::print_path(&path);
    Ok(path)
}
