use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::logic::bulk::BulkOutcome;
use crate::model::{OperationKind, Record, RecordKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    /// The whole request went through
    Passed,
    /// Part of the request went through
    Success,
    Error,
}

/// A flash message shown after the redirect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn passed(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Passed,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Texts for one operation on one record kind
#[derive(Debug, Clone, PartialEq)]
pub struct OperationMessages {
    pub success: String,
    pub failure: String,
    pub partial_success: String,
    /// Set-based update that matched nothing
    pub none_affected: String,
}

impl OperationMessages {
    pub fn for_operation(kind: RecordKind, operation: OperationKind) -> Self {
        let plural = kind.plural();
        let verb = operation.past_tense();
        Self {
            success: format!("The selected {} were {}.", plural, verb),
            failure: format!("The following {} could not be {}:", plural, verb),
            partial_success: format!("The following {} were {}: ", plural, verb),
            none_affected: format!("The selected {} could not be {}.", plural, verb),
        }
    }
}

/// Notices and redirect choice for a finished bulk operation
#[derive(Debug, Clone, PartialEq)]
pub struct BulkReport {
    /// Whether to continue to the forward URL rather than back to the origin
    pub succeeded: bool,
    pub notices: Vec<Notice>,
}

/// Label for a record in messages; rows with a blank name fall back to their id
pub fn record_label<R: Record>(record: &R) -> String {
    let name = record.display_name().trim();
    if name.is_empty() {
        format!("{} #{}", R::KIND.noun(), record.id())
    } else {
        name.to_string()
    }
}

/// Build the user-facing notices for a bulk outcome.
///
/// A complete success yields one `passed` notice. Otherwise failures come
/// first, one line per record, followed by a `success` notice naming the
/// records that did go through, if any.
pub fn compose<R: Record>(operation: OperationKind, outcome: &BulkOutcome<R>) -> BulkReport {
    let messages = OperationMessages::for_operation(R::KIND, operation);

    if outcome.is_success() {
        return BulkReport {
            succeeded: true,
            notices: vec![Notice::passed(messages.success)],
        };
    }

    let Some(result) = outcome.report() else {
        return BulkReport {
            succeeded: false,
            notices: vec![Notice::error(messages.none_affected)],
        };
    };

    let mut notices = Vec::new();

    let failure_lines = result
        .failures()
        .iter()
        .map(|failed| format!("{}: {}", record_label(&failed.record), failed.errors.join(", ")))
        .join("\n");
    notices.push(Notice::error(format!("{}\n{}", messages.failure, failure_lines)));

    if !result.successes().is_empty() {
        let names = result.successes().iter().map(record_label).join(", ");
        notices.push(Notice::success(format!("{}{}.", messages.partial_success, names)));
    }

    BulkReport {
        succeeded: false,
        notices,
    }
}

fn single_failure(kind: RecordKind, verb: &str, errors: &[String]) -> Notice {
    let bullets = errors.iter().map(|e| format!("• {}", e)).join("\n");
    Notice::error(format!("The {} could not be {}:\n{}", kind.noun(), verb, bullets))
}

/// Notice for the create flow
pub fn created<R: Record>(errors: Option<&[String]>) -> Notice {
    match errors {
        None => Notice::success(format!("The {} was created.", R::KIND.noun())),
        Some(errors) => single_failure(R::KIND, "created", errors),
    }
}

/// Notice for a single record whose change was refused
pub fn single_rejected<R: Record>(operation: OperationKind, errors: &[String]) -> Notice {
    single_failure(R::KIND, operation.past_tense(), errors)
}
