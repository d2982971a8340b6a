use std::path::Path;

use tracker_core::NewProduce;

use super::{emit, open_ledger, runtime, CommandError};
use crate::config::TrackerConfig;
use crate::OutputFormat;

pub(crate) struct RegisterArgs<'a> {
    pub(crate) name: &'a str,
    pub(crate) origin: &'a str,
    pub(crate) price: i64,
    pub(crate) location: &'a str,
}

pub(crate) fn cmd_register(
    config: &TrackerConfig,
    journal: &Path,
    args: RegisterArgs<'_>,
    output: OutputFormat,
) -> Result<(), CommandError> {
    let actor = config.local_actor()?;
    let request = NewProduce::new(args.name, args.origin, args.price, args.location);

    let id = runtime()?.block_on(async {
        let ledger = open_ledger(journal).await?;
        Ok::<_, CommandError>(ledger.register_produce(&actor, request).await?)
    })?;

    emit(
        output,
        serde_json::json!({ "id": id, "actor": actor.as_str() }),
        || format!("Registered produce {} ({})", id, args.name),
    );
    Ok(())
}
