//! Shared test fixtures: canned-response HTTP servers on ephemeral local
//! ports and recording doubles for the collaborator seams.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use crate::core::bridge::{NotifySink, TransportFailure, UpdatePayload, WidgetBridge};

/// Widget registry double that records every published update.
pub(crate) struct RecordingBridge {
    items: Vec<String>,
    series: Vec<String>,
    pub updates: Mutex<Vec<(String, UpdatePayload)>>,
}

impl RecordingBridge {
    pub fn new() -> Self {
        Self::with_widgets(&[], &[])
    }

    pub fn with_widgets(items: &[&str], series: &[&str]) -> Self {
        Self {
            items: items.iter().map(|s| s.to_string()).collect(),
            series: series.iter().map(|s| s.to_string()).collect(),
            updates: Mutex::new(Vec::new()),
        }
    }

    pub fn scalar_count(&self) -> usize {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, p)| matches!(p, UpdatePayload::Scalar(_)))
            .count()
    }

    pub fn series_count(&self) -> usize {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, p)| matches!(p, UpdatePayload::Series(_)))
            .count()
    }
}

impl WidgetBridge for RecordingBridge {
    fn active_items(&self) -> Vec<String> {
        self.items.clone()
    }

    fn active_series(&self) -> Vec<String> {
        self.series.clone()
    }

    fn update(&self, key: &str, payload: UpdatePayload) {
        self.updates.lock().unwrap().push((key.to_string(), payload));
    }
}

/// Notification double that records every reported failure.
#[derive(Default)]
pub(crate) struct RecordingNotify {
    pub failures: Mutex<Vec<TransportFailure>>,
}

impl NotifySink for RecordingNotify {
    fn report_transport_failure(&self, failure: TransportFailure) {
        self.failures.lock().unwrap().push(failure);
    }
}

/// Starts a mock HTTP server on a random local port that serves the given
/// `(status, content_type, body)` responses to sequential connections, one
/// connection per response, then exits. Returns the base URL.
pub(crate) fn spawn_http_script(
    responses: Vec<(u16, &'static str, String)>,
) -> (String, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind mock server");
    let port = listener.local_addr().unwrap().port();
    let base = format!("http://127.0.0.1:{}/", port);

    let handle = thread::spawn(move || {
        for (status, content_type, body) in responses {
            if let Ok((mut stream, _)) = listener.accept() {
                // Consume the request; one read is enough for these small requests.
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf);

                let reason = match status {
                    200 => "OK",
                    404 => "Not Found",
                    500 => "Internal Server Error",
                    _ => "Status",
                };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nContent-Type: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    content_type,
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        }
    });

    (base, handle)
}

/// Starts a mock push endpoint that serves exactly one event-stream
/// connection: response headers, the given event text, a short hold so the
/// client can drain it, then connection close (end of stream).
pub(crate) fn spawn_sse_once(
    events: &'static str,
    hold: Duration,
) -> (String, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind mock server");
    let port = listener.local_addr().unwrap().port();
    let base = format!("http://127.0.0.1:{}/", port);

    let handle = thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);

            let header = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nCache-Control: no-cache\r\nConnection: close\r\n\r\n";
            let _ = stream.write_all(header.as_bytes());
            let _ = stream.write_all(events.as_bytes());
            let _ = stream.flush();
            thread::sleep(hold);
        }
    });

    (base, handle)
}
