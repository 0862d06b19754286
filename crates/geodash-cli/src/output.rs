//! JSON-on-stdout output (spec §6.2: "JSON output on stdout; logs on stderr"). Every
//! subcommand prints exactly one envelope object and returns a process exit code; all
//! diagnostic chatter goes through `tracing` instead, which this crate's `main` directs to
//! stderr.

use geodash_api::dto::Envelope;
use geodash_core::error::GeodashError;
use serde::Serialize;

/// Prints the success envelope and returns exit code 0.
pub fn success<T: Serialize>(data: T) -> i32 {
    print_envelope(&Envelope::ok(data));
    0
}

/// Logs the error on stderr, prints the error envelope on stdout, and returns exit code 1.
pub fn failure(err: &GeodashError) -> i32 {
    tracing::error!(error_code = err.error_code(), "{err}");
    let envelope: Envelope<()> = Envelope::err(err.status_code(), err.to_string(), err.error_code());
    print_envelope(&envelope);
    1
}

fn print_envelope<T: Serialize>(envelope: &Envelope<T>) {
    match serde_json::to_string_pretty(envelope) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            tracing::error!("failed to serialise output envelope: {e}");
            println!(r#"{{"success":false,"status_code":500,"error":"internal output error"}}"#);
        }
    }
}
