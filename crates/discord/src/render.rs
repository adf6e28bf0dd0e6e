//! Maps engine outcomes to reactions and reply text.
//!
//! All user-visible wording lives here; the engine only emits structured
//! values.

use tally_counting::{CommandReply, DeletionNotice, FailureReason, MessageOutcome};

/// Marker for messages with no numeric prefix.
const REACT_UNPARSEABLE: &str = "🔤";
/// Failed submission.
const REACT_FAILURE: &str = "❌";
/// Accepted submission.
const REACT_SUCCESS: &str = "✅";
/// Accepted submission that set a new record.
const REACT_NEW_RECORD: &str = "☑️";

/// Reaction emoji for a processed message, or `None` when the message is
/// ignored entirely. Milestone overrides take precedence over the
/// record/plain distinction.
pub fn reaction(outcome: &MessageOutcome) -> Option<&str> {
    match outcome {
        MessageOutcome::Ignored => None,
        MessageOutcome::Unparseable => Some(REACT_UNPARSEABLE),
        MessageOutcome::Failed { .. } => Some(REACT_FAILURE),
        MessageOutcome::Counted {
            milestone,
            new_record,
            ..
        } => Some(match (milestone, new_record) {
            (Some(emoji), _) => emoji.as_str(),
            (None, true) => REACT_NEW_RECORD,
            (None, false) => REACT_SUCCESS,
        }),
    }
}

/// Reply sent alongside the ❌ reaction.
pub fn failure_reply(reason: &FailureReason) -> String {
    match reason {
        FailureReason::WrongNumber { expected } => {
            format!("**You failed.** The next number was **{expected}**")
        },
        FailureReason::RepeatUser => "**You failed.** You can't count twice in a row.".to_string(),
    }
}

/// Announcement when the last counter deletes their own message.
pub fn deletion_reply(notice: &DeletionNotice) -> String {
    format!(
        "<@{}> has deleted their message. The next number is **{}**.",
        notice.user_id, notice.next
    )
}

/// Reply to an administrative command. `last_user_name` is the resolved
/// display name for [`CommandReply::Count`], when the lookup succeeded.
pub fn command_reply(reply: &CommandReply, last_user_name: Option<&str>) -> String {
    match reply {
        CommandReply::NoData => "No data for this channel.".to_string(),
        CommandReply::Count { count, last_user } => match (last_user, last_user_name) {
            (Some(_), Some(name)) => {
                format!("The last counted number was **{count}** by {name}")
            },
            _ => format!("The last counted number was **{count}**"),
        },
        CommandReply::Record { record } => format!("The current record is **{record}**"),
        CommandReply::Started => {
            "This channel is now being counted. The first number is 1.".to_string()
        },
        CommandReply::AlreadyTracked => "This channel is already being counted.".to_string(),
        CommandReply::Stopped => "This channel is no longer being counted.".to_string(),
        CommandReply::NotTracked => "This channel is not being counted.".to_string(),
    }
}
