//! Purpose: Hold top-level CLI command dispatch for `contentpush`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Every successful command prints exactly one JSON value on stdout.
//! Invariants: Commands that never touch the API do not require project credentials.

use super::*;

pub(super) fn dispatch_command(
    command: Command,
    connection: Connection,
) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "contentpush", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Validate {
            file,
            input,
            flatten,
        } => {
            let collection = load_collection(&file, input)?;
            tracing::debug!(items = collection.len(), "validated collection");
            if flatten {
                let table = serde_json::to_value(collection.to_tabular()).map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to encode table")
                        .with_source(err)
                })?;
                emit_json(table);
            } else {
                emit_json(collection.to_value());
            }
            Ok(RunOutcome::ok())
        }
        Command::Upload {
            file,
            input,
            content_source,
            request_usage,
        } => {
            let collection = load_collection(&file, input)?;
            let client = connection.client()?;
            let options = UploadOptions {
                content_source,
                request_usage,
            };
            let response = Uploader::new(client).upload(&collection, &options)?;
            tracing::info!(
                items = collection.len(),
                batches = response.batch_count(),
                "upload complete"
            );
            emit_json(response.to_value());
            Ok(RunOutcome::ok())
        }
        Command::Sources { command } => {
            let client = connection.client()?;
            let value = match command {
                SourcesCommand::List => client.list_content_sources()?,
                SourcesCommand::Create { name, description } => {
                    let mut source = ContentSource::new(name);
                    if let Some(description) = description {
                        source = source.with_description(description);
                    }
                    client.create_named_content_source(&source)?
                }
            };
            emit_json(value);
            Ok(RunOutcome::ok())
        }
    }
}
