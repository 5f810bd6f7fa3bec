mod access;
mod config;
mod exam;
mod grading;
mod hierarchy;
mod ipc;
mod model;
mod promotion;
mod seed;
mod store;
mod telemetry;

use anyhow::Context;
use std::io::{self, BufRead, Write};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::seed::Seed;
use crate::store::Store;

fn main() -> anyhow::Result<()> {
    let config = AppConfig::load();
    telemetry::init(&config.telemetry).context("initialising logging")?;

    let seed = match &config.seed_path {
        Some(path) => Seed::from_path(path)?,
        None => Seed::demo(),
    };
    info!(
        students = seed.students.len(),
        users = seed.users.len(),
        branches = seed.branches.len(),
        "tuntazd ready"
    );
    let mut state = ipc::AppState::new(Store::new(seed));

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "stdin closed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id; answer with an id-less error.
                warn!(error = %e, "unparseable request line");
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
    Ok(())
}
