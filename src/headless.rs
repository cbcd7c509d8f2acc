//! One-shot question answered on stdout, no terminal UI

use crate::client::ChatBackend;
use crate::events::Role;
use crate::session::{RejectReason, SessionController, SubmitOutcome};
use anyhow::{Context, Result, bail};
use std::io::Write;

/// Ask a single question and stream the answer into `out`.
///
/// With `json` set, nothing is streamed and the final session state is
/// written as JSON instead.
pub async fn ask<B, W>(backend: B, question: &str, json: bool, out: &mut W) -> Result<()>
where
    B: ChatBackend,
    W: Write,
{
    let mut session = SessionController::new(backend);
    let mut updates = session.subscribe();

    match session.submit(question) {
        SubmitOutcome::Accepted { .. } => {}
        SubmitOutcome::Rejected(RejectReason::Empty) => bail!("Question must not be empty"),
        SubmitOutcome::Rejected(RejectReason::InFlight) => bail!("Another question is still being answered"),
    }

    let mut printed = 0;
    while session.next_event().await {
        if json || !updates.has_changed().unwrap_or(false) {
            continue;
        }

        let snapshot = updates.borrow_and_update();
        let Some(answer) = snapshot.messages.last().filter(|m| m.role == Role::Assistant) else {
            continue;
        };
        if answer.content.len() > printed {
            out.write_all(answer.content[printed..].as_bytes())
                .context("Failed to write answer")?;
            out.flush().context("Failed to write answer")?;
            printed = answer.content.len();
        }
    }

    let state = session.state();
    if json {
        serde_json::to_writer_pretty(&mut *out, state).context("Failed to write JSON")?;
        writeln!(out).context("Failed to write JSON")?;
    } else if printed > 0 {
        writeln!(out).context("Failed to write answer")?;
    }

    if let Some(error) = &state.last_error {
        bail!("{}", error.message);
    }

    Ok(())
}
