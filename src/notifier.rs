//! Consumer process signaling.
//!
//! Best-effort delivery of a reload signal to every running process whose
//! name matches the configured consumer. No configured name means the
//! notifier is a permanent no-op; zero matches is a normal, silent outcome
//! because the consumer may simply not be running yet.

use std::ffi::OsStr;

use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, Signal, System};

use crate::debug_event;

/// Signals a named consumer process on content changes.
pub struct SignalNotifier {
    process: Option<String>,
    signal: Signal,
}

impl SignalNotifier {
    pub fn new(process: Option<String>, signal: Signal) -> Self {
        Self { process, signal }
    }

    /// Notifier that never signals anything.
    pub fn disabled() -> Self {
        Self::new(None, Signal::Hangup)
    }

    /// Deliver the configured signal to every current match.
    pub fn notify(&self) {
        let Some(name) = self.process.as_deref() else {
            return;
        };

        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing(),
        );

        let mut delivered = 0usize;
        for process in system.processes_by_name(OsStr::new(name)) {
            if process.kill_with(self.signal).unwrap_or(false) {
                delivered += 1;
            }
        }

        if delivered > 0 {
            debug_event!("notify", "signaled", "{delivered} x {name} ({:?})", self.signal);
        } else {
            debug_event!("notify", "no matching process", "{name}");
        }
    }
}

/// Parse a signal specification: a name with or without the `SIG` prefix,
/// or a number (`HUP`, `SIGUSR1`, `15`).
pub fn parse_signal(spec: &str) -> Option<Signal> {
    let spec = spec.trim();
    if let Ok(number) = spec.parse::<u32>() {
        return match number {
            1 => Some(Signal::Hangup),
            2 => Some(Signal::Interrupt),
            3 => Some(Signal::Quit),
            9 => Some(Signal::Kill),
            10 => Some(Signal::User1),
            12 => Some(Signal::User2),
            14 => Some(Signal::Alarm),
            15 => Some(Signal::Term),
            18 => Some(Signal::Continue),
            19 => Some(Signal::Stop),
            28 => Some(Signal::Winch),
            _ => None,
        };
    }

    let name = spec.to_ascii_uppercase();
    let name = name.strip_prefix("SIG").unwrap_or(&name);
    match name {
        "HUP" => Some(Signal::Hangup),
        "INT" => Some(Signal::Interrupt),
        "QUIT" => Some(Signal::Quit),
        "KILL" => Some(Signal::Kill),
        "USR1" => Some(Signal::User1),
        "USR2" => Some(Signal::User2),
        "ALRM" => Some(Signal::Alarm),
        "TERM" => Some(Signal::Term),
        "CONT" => Some(Signal::Continue),
        "STOP" => Some(Signal::Stop),
        "WINCH" => Some(Signal::Winch),
        _ => None,
    }
}
