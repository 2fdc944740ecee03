use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, info, trace, warn};

use crate::api_fetch::ApiClient;
use crate::query::Query;
use crate::query_cache::FetchTicket;
use crate::state::{Delta, ProviderCommand};

/// Runs commands from the UI until every command sender is dropped. Each
/// fetch gets its own worker thread, so responses come back in completion
/// order, not request order.
pub fn spawn_provider(
    api: ApiClient,
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        info!(base_url = %api.base_url(), "provider started");
        for cmd in cmd_rx {
            match cmd {
                ProviderCommand::Fetch { ticket, query } => {
                    if ticket.cancel.is_cancelled() {
                        trace!(key = %ticket.key, "skipping cancelled fetch");
                        continue;
                    }
                    let api = api.clone();
                    let worker_tx = tx.clone();
                    let spawned = thread::Builder::new()
                        .name(format!("fetch-{}", ticket.fetch_id))
                        .spawn(move || run_fetch(&api, &worker_tx, ticket, query));
                    if let Err(err) = spawned {
                        warn!(error = %err, "could not spawn fetch worker");
                        let _ = tx.send(Delta::Log(format!(
                            "[WARN] Fetch worker unavailable: {err}"
                        )));
                    }
                }
            }
        }
        info!("provider stopped");
    })
}

fn run_fetch(api: &ApiClient, tx: &Sender<Delta>, ticket: FetchTicket, query: Query) {
    let started = Instant::now();
    let result = query.execute(api);
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if ticket.cancel.is_cancelled() {
        debug!(key = %ticket.key, elapsed_ms, "discarding result of cancelled fetch");
        return;
    }
    let result = match result {
        Ok(payload) => {
            debug!(key = %ticket.key, elapsed_ms, "fetch ok");
            Ok(payload)
        }
        Err(err) => {
            let status = err.status().map(|s| s.as_u16());
            warn!(key = %ticket.key, elapsed_ms, ?status, error = ?err, "fetch failed");
            Err(err.to_string())
        }
    };
    let _ = tx.send(Delta::QueryResolved { ticket, result });
}
