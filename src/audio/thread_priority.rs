// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use thread_priority::{set_current_thread_priority, ThreadPriority, ThreadPriorityValue};
use tracing::{info, warn};

/// Environment variable holding the feeder thread priority (0-99).
pub const PRIORITY_ENV: &str = "MTICK_THREAD_PRIORITY";

/// Environment variable that opts out of real-time scheduling.
pub const DISABLE_RT_ENV: &str = "MTICK_DISABLE_RT_AUDIO";

/// Default priority for the feeder thread when MTICK_THREAD_PRIORITY is unset.
const DEFAULT_FEEDER_THREAD_PRIORITY: u8 = 70;

/// Parses a priority in 0-99.
fn parse_priority(value: &str) -> Option<u8> {
    value.trim().parse::<u8>().ok().filter(|n| *n < 100)
}

/// Reads MTICK_THREAD_PRIORITY, falling back to the default when unset or invalid.
pub fn feeder_thread_priority() -> u8 {
    std::env::var(PRIORITY_ENV)
        .ok()
        .and_then(|v| parse_priority(&v))
        .unwrap_or(DEFAULT_FEEDER_THREAD_PRIORITY)
}

pub(crate) fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| {
            v == "1"
                || v.eq_ignore_ascii_case("true")
                || v.eq_ignore_ascii_case("yes")
                || v.eq_ignore_ascii_case("on")
        })
        .unwrap_or(false)
}

/// Returns whether we should attempt RT (SCHED_FIFO) scheduling for the feeder thread.
/// Default: enabled. Opt out with MTICK_DISABLE_RT_AUDIO=1.
pub fn rt_audio_enabled() -> bool {
    !env_flag(DISABLE_RT_ENV)
}

/// Raises the priority of the calling thread. Failures are logged and ignored.
pub fn promote_current_thread() {
    let priority = feeder_thread_priority();
    let value = match ThreadPriorityValue::try_from(priority) {
        Ok(value) => value,
        Err(e) => {
            warn!(priority, error = %e, "Invalid thread priority");
            return;
        }
    };
    let tp = ThreadPriority::Crossplatform(value);
    if let Err(e) = set_current_thread_priority(tp) {
        warn!(priority, error = %e, "Failed to raise feeder thread priority");
    }

    #[cfg(unix)]
    if rt_audio_enabled() {
        use thread_priority::unix::{
            set_thread_priority_and_policy, thread_native_id, RealtimeThreadSchedulePolicy,
            ThreadSchedulePolicy,
        };
        let tid = thread_native_id();
        match set_thread_priority_and_policy(
            tid,
            tp,
            ThreadSchedulePolicy::Realtime(RealtimeThreadSchedulePolicy::Fifo),
        ) {
            Ok(()) => {
                info!(priority, "Enabled RT SCHED_FIFO for feeder thread");
            }
            Err(e) => {
                warn!(
                    error = %e,
                    "Failed to set RT SCHED_FIFO for feeder thread"
                );
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_priority() {
        assert_eq!(parse_priority("0"), Some(0));
        assert_eq!(parse_priority(" 99 "), Some(99));
        assert_eq!(parse_priority("100"), None);
        assert_eq!(parse_priority("-1"), None);
        assert_eq!(parse_priority("high"), None);
    }

    #[test]
    #[serial]
    fn test_feeder_thread_priority_env() {
        std::env::remove_var(PRIORITY_ENV);
        assert_eq!(feeder_thread_priority(), DEFAULT_FEEDER_THREAD_PRIORITY);

        std::env::set_var(PRIORITY_ENV, "42");
        assert_eq!(feeder_thread_priority(), 42);

        std::env::set_var(PRIORITY_ENV, "250");
        assert_eq!(feeder_thread_priority(), DEFAULT_FEEDER_THREAD_PRIORITY);

        std::env::remove_var(PRIORITY_ENV);
    }

    #[test]
    #[serial]
    fn test_rt_audio_enabled_env() {
        std::env::remove_var(DISABLE_RT_ENV);
        assert!(rt_audio_enabled());

        for value in ["1", "true", "YES", "on"] {
            std::env::set_var(DISABLE_RT_ENV, value);
            assert!(!rt_audio_enabled(), "{}", value);
        }

        std::env::set_var(DISABLE_RT_ENV, "0");
        assert!(rt_audio_enabled());

        std::env::remove_var(DISABLE_RT_ENV);
    }
}
