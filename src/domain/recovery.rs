//! Push error recovery matrix
//!
//! Maps a failed staged push to the corrective action that can unblock it.
//! kintone localizes its error messages, so each field-code extractor carries
//! the Japanese, English and Chinese wording.

use regex::Regex;
use std::sync::OnceLock;

use super::catalog::{FORM_FIELDS, FORM_LAYOUT, VIEWS};
use crate::error::ApiErrorBody;

pub const FIELD_NOT_FOUND: &str = "GAIA_FC01";
pub const LAYOUT_FIELD_MISSING: &str = "GAIA_FN11";
pub const INVALID_SUBTABLE: &str = "CB_VA01";
pub const PERMISSION_DENIED: &str = "CB_NO02";

const FIELD_NOT_FOUND_PATTERNS: [&str; 3] = [
    r"指定されたフィールド（code: (.+)）が見つかりません",
    r"The field \(code: (.+)\) not found",
    r"未找到相应的字段（code: (.+)）",
];

const LAYOUT_FIELD_MISSING_PATTERNS: [&str; 3] = [
    r"フォームの更新に失敗しました。一部のフィールド（code: (.+)）のレイアウトを指定していません",
    r"Failed to update form\. Field \(code: (.+)\) is missing in the layout parameter",
    r"表单更新失败。部分字段（code: (.+)）未指定布局",
];

const INVALID_SUBTABLE_PATTERNS: [&str; 3] = [
    r"フォームの更新に失敗しました。テーブル「(.+)」の指定が正しくありません。指定するフィールドに不足がある、またはテーブルにないフィールドを指定しています",
    r"The format of table (.+) is not valid\. Some fields may be missing or the specified fields may not exist in the table",
    r"表格“(.+)”的指定不正确。原有字段缺失或添加了原表格中不存在的字段",
];

/// What to do about one failed push attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Create the missing field remotely, then retry
    AddField { code: String },
    /// Delete remote top-level fields absent from the local layout, then retry
    DeleteRootFields { codes: Vec<String> },
    /// Delete remote subtable members absent from the local layout, then retry
    DeleteSubtableFields { subtable: String },
    /// Ask whether to skip this endpoint
    SkipWithConfirmation { reason: String },
    /// Not recoverable; surface the remote error
    Unhandled,
}

fn compiled(patterns: &'static [&'static str; 3], cell: &'static OnceLock<Vec<Regex>>) -> &'static [Regex] {
    cell.get_or_init(|| patterns.iter().filter_map(|p| Regex::new(p).ok()).collect())
}

fn field_not_found() -> &'static [Regex] {
    static CELL: OnceLock<Vec<Regex>> = OnceLock::new();
    compiled(&FIELD_NOT_FOUND_PATTERNS, &CELL)
}

fn layout_field_missing() -> &'static [Regex] {
    static CELL: OnceLock<Vec<Regex>> = OnceLock::new();
    compiled(&LAYOUT_FIELD_MISSING_PATTERNS, &CELL)
}

fn invalid_subtable() -> &'static [Regex] {
    static CELL: OnceLock<Vec<Regex>> = OnceLock::new();
    compiled(&INVALID_SUBTABLE_PATTERNS, &CELL)
}

/// First capture of the first pattern that matches
pub fn pluck_first_capture(message: &str, patterns: &[Regex]) -> Option<String> {
    patterns
        .iter()
        .find_map(|re| re.captures(message))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Classify a failed push of `command` (canonical name, without `preview/`)
pub fn classify(command: &str, error: &ApiErrorBody) -> RecoveryAction {
    match (command, error.code.as_str()) {
        (FORM_FIELDS, FIELD_NOT_FOUND) => pluck_first_capture(&error.message, field_not_found())
            .map(|code| RecoveryAction::AddField { code })
            .unwrap_or(RecoveryAction::Unhandled),
        (FORM_LAYOUT, LAYOUT_FIELD_MISSING) => {
            pluck_first_capture(&error.message, layout_field_missing())
                .map(|codes| RecoveryAction::DeleteRootFields {
                    codes: codes.split(',').map(|c| c.trim().to_string()).collect(),
                })
                .unwrap_or(RecoveryAction::Unhandled)
        }
        (FORM_LAYOUT, INVALID_SUBTABLE) => {
            // The table name only shows up inside the per-field error details
            let details = serde_json::to_string(&error.errors).unwrap_or_default();
            pluck_first_capture(&details, invalid_subtable())
                .map(|subtable| RecoveryAction::DeleteSubtableFields { subtable })
                .unwrap_or(RecoveryAction::Unhandled)
        }
        (VIEWS, PERMISSION_DENIED) => RecoveryAction::SkipWithConfirmation {
            reason: "Permission denied.".to_string(),
        },
        _ => RecoveryAction::Unhandled,
    }
}
