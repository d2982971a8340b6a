use std::path::Path;

use tracker_core::{NewUpdate, StageStatus};

use super::{emit, open_ledger, runtime, CommandError};
use crate::config::TrackerConfig;
use crate::render::update_json;
use crate::OutputFormat;

/// Turn a `status` argument into a wire code.
///
/// Numbers pass through untouched so the registry decides whether they are
/// valid; labels are mapped to their code.
pub(crate) fn status_code(raw: &str) -> Result<i64, CommandError> {
    if let Ok(code) = raw.trim().parse::<i64>() {
        return Ok(code);
    }
    let status: StageStatus = raw
        .parse()
        .map_err(|e| CommandError::Ledger(tracker_storage::LedgerError::Registry(e)))?;
    Ok(status.into())
}

pub(crate) fn cmd_update(
    config: &TrackerConfig,
    journal: &Path,
    id: u64,
    status: &str,
    action: &str,
    location: &str,
    output: OutputFormat,
) -> Result<(), CommandError> {
    let actor = config.local_actor()?;
    let request = NewUpdate::with_code(status_code(status)?, action, location);

    let (update, history_len) = runtime()?.block_on(async {
        let ledger = open_ledger(journal).await?;
        let update = ledger.append_update(&actor, id, request).await?;
        let history_len = ledger.get_history(id).await?.len();
        Ok::<_, CommandError>((update, history_len))
    })?;

    emit(
        output,
        serde_json::json!({
            "id": id,
            "history_len": history_len,
            "update": update_json(&update),
        }),
        || {
            format!(
                "Appended update #{} to produce {} ({})",
                history_len, id, update.status
            )
        },
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_status_passes_through() {
        assert_eq!(status_code("1").unwrap(), 1);
        assert_eq!(status_code("7").unwrap(), 7);
        assert_eq!(status_code("-2").unwrap(), -2);
    }

    #[test]
    fn labels_map_to_codes() {
        assert_eq!(status_code("farm").unwrap(), 0);
        assert_eq!(status_code("Retailer").unwrap(), 2);
        assert_eq!(status_code("warehouse").unwrap_err().kind(), "invalid_argument");
    }
}
