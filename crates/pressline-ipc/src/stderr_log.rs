// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Mini-daemons report progress on stderr with a `DEBUG:`/`INFO:`/`ERROR:`
// line convention (§4.7); the parent relays each line into the structured
// log at the matching level rather than dumping raw child stderr.

/// Parse and relay one line of a mini-daemon's stderr into the structured
/// log. Lines without a recognized prefix are logged at `warn` since they
/// indicate the child didn't follow the convention.
pub fn log_daemon_line(daemon: &str, line: &str) {
    let line = line.trim_end_matches(['\r', '\n']);
    if let Some(rest) = line.strip_prefix("ERROR:") {
        tracing::error!(daemon, "{}", rest.trim_start());
    } else if let Some(rest) = line.strip_prefix("INFO:") {
        tracing::info!(daemon, "{}", rest.trim_start());
    } else if let Some(rest) = line.strip_prefix("DEBUG:") {
        tracing::debug!(daemon, "{}", rest.trim_start());
    } else if !line.is_empty() {
        tracing::warn!(daemon, "{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn relays_each_prefix_at_the_matching_level() {
        log_daemon_line("dnssd", "INFO: browsing for _ipp._tcp");
        log_daemon_line("dnssd", "ERROR: resolve failed for alpha.local");
        log_daemon_line("dnssd", "DEBUG: txt record: ty=Example Printer");
        assert!(logs_contain("browsing for _ipp._tcp"));
        assert!(logs_contain("resolve failed for alpha.local"));
        assert!(logs_contain("txt record: ty=Example Printer"));
    }

    #[traced_test]
    #[test]
    fn lines_without_a_known_prefix_are_logged_as_warnings() {
        log_daemon_line("dnssd", "segmentation fault (core dumped)");
        assert!(logs_contain("segmentation fault"));
    }
}
