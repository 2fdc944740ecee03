use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;

use nba_insights::api_fetch::ApiClient;
use nba_insights::provider::spawn_provider;
use nba_insights::query::{Payload, Query};
use nba_insights::query_cache::{QueryCache, QueryKey};
use nba_insights::state::{Delta, ProviderCommand};

/// Accepts one request, tells the test it arrived, then waits for the go
/// signal before answering.
fn serve_gated(body: &'static str) -> (String, mpsc::Receiver<()>, mpsc::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (arrived_tx, arrived_rx) = mpsc::channel();
    let (go_tx, go_rx) = mpsc::channel::<()>();
    thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 2048];
            let _ = stream.read(&mut buf);
            let _ = arrived_tx.send(());
            let _ = go_rx.recv();
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    (format!("http://{addr}"), arrived_rx, go_tx)
}

/// Every delta the provider and its workers send before all senders drop.
fn drain(rx: mpsc::Receiver<Delta>) -> Vec<Delta> {
    rx.iter().collect()
}

#[test]
fn delivers_resolved_query() {
    let (base, arrived, go) = serve_gated("[]");
    let api = ApiClient::new(&base, None).unwrap();
    let mut cache: QueryCache<Payload> = QueryCache::new();
    let ticket = cache.begin(&QueryKey::new("games:30h")).unwrap();

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let provider = spawn_provider(api, tx, cmd_rx);
    cmd_tx
        .send(ProviderCommand::Fetch {
            ticket,
            query: Query::Games30h,
        })
        .unwrap();
    arrived.recv().unwrap();
    go.send(()).unwrap();
    drop(cmd_tx);
    provider.join().unwrap();

    let deltas = drain(rx);
    assert_eq!(deltas.len(), 1);
    match &deltas[0] {
        Delta::QueryResolved { ticket, result } => {
            assert_eq!(ticket.key.as_str(), "games:30h");
            assert_eq!(result.as_ref().ok(), Some(&Payload::Games(Vec::new())));
        }
        other => panic!("unexpected delta {other:?}"),
    }
}

#[test]
fn cancelled_ticket_is_never_fetched() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let api = ApiClient::new(&format!("http://{addr}"), None).unwrap();
    let mut cache: QueryCache<Payload> = QueryCache::new();
    let key = QueryKey::new("predict:GSW:LAL:h=201939:a=");
    let ticket = cache.begin(&key).unwrap();
    cache.cancel(&key);
    assert!(ticket.cancel.is_cancelled());

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let provider = spawn_provider(api, tx, cmd_rx);
    cmd_tx
        .send(ProviderCommand::Fetch {
            ticket,
            query: Query::predict_match("GSW", "LAL", &[201939], &[]),
        })
        .unwrap();
    drop(cmd_tx);
    provider.join().unwrap();

    assert!(drain(rx).is_empty());
}

#[test]
fn result_of_ticket_cancelled_in_flight_is_discarded() {
    let (base, arrived, go) = serve_gated("{}");
    let api = ApiClient::new(&base, None).unwrap();
    let mut cache: QueryCache<Payload> = QueryCache::new();
    let key = QueryKey::new("predict:GSW:LAL:h=201939:a=");
    let ticket = cache.begin(&key).unwrap();
    let token = ticket.cancel.clone();

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let provider = spawn_provider(api, tx, cmd_rx);
    cmd_tx
        .send(ProviderCommand::Fetch {
            ticket,
            query: Query::predict_match("GSW", "LAL", &[201939], &[]),
        })
        .unwrap();
    arrived.recv().unwrap();
    token.cancel();
    go.send(()).unwrap();
    drop(cmd_tx);
    provider.join().unwrap();

    let resolved = drain(rx)
        .into_iter()
        .filter(|d| matches!(d, Delta::QueryResolved { .. }))
        .count();
    assert_eq!(resolved, 0);
}
