use std::path::Path;

use super::{emit, open_ledger, runtime, CommandError};
use crate::render::{
    history_json, produce_json, produce_text, update_text, view_json, view_text,
};
use crate::OutputFormat;

pub(crate) fn cmd_show(journal: &Path, id: u64, output: OutputFormat) -> Result<(), CommandError> {
    let record = runtime()?.block_on(async {
        let ledger = open_ledger(journal).await?;
        Ok::<_, CommandError>(ledger.get_produce(id).await?)
    })?;
    emit(output, produce_json(&record), || produce_text(&record));
    Ok(())
}

pub(crate) fn cmd_history(
    journal: &Path,
    id: u64,
    output: OutputFormat,
) -> Result<(), CommandError> {
    let history = runtime()?.block_on(async {
        let ledger = open_ledger(journal).await?;
        Ok::<_, CommandError>(ledger.get_history(id).await?)
    })?;
    emit(output, history_json(id, &history), || {
        if history.is_empty() {
            return format!("No history recorded for produce {}", id);
        }
        history
            .iter()
            .enumerate()
            .map(|(i, u)| update_text(i + 1, u))
            .collect::<Vec<_>>()
            .join("\n")
    });
    Ok(())
}

pub(crate) fn cmd_total(journal: &Path, output: OutputFormat) -> Result<(), CommandError> {
    let total = runtime()?.block_on(async {
        let ledger = open_ledger(journal).await?;
        Ok::<_, CommandError>(ledger.total_produces().await)
    })?;
    emit(output, serde_json::json!({ "total": total }), || {
        total.to_string()
    });
    Ok(())
}

pub(crate) fn cmd_list(
    journal: &Path,
    offset: u64,
    limit: usize,
    output: OutputFormat,
) -> Result<(), CommandError> {
    let (total, views) = runtime()?.block_on(async {
        let ledger = open_ledger(journal).await?;
        let total = ledger.total_produces().await;
        Ok::<_, CommandError>((total, ledger.produces(offset, limit).await))
    })?;
    emit(
        output,
        serde_json::json!({
            "total": total,
            "offset": offset,
            "produces": views.iter().map(view_json).collect::<Vec<_>>(),
        }),
        || {
            if views.is_empty() {
                return format!("No produce in range (total: {})", total);
            }
            views.iter().map(view_text).collect::<Vec<_>>().join("\n")
        },
    );
    Ok(())
}
