//! Process liveness (C14): reads `/proc/<pid>/status` to classify whether a
//! target is still worth scanning.

use std::fs;

use crate::paths;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProcessLiveness {
    Running,
    Stopped,
    Zombie,
    Dead,
}

impl ProcessLiveness {
    fn from_state_char(ch: char) -> Self {
        match ch {
            'R' | 'S' | 'D' => ProcessLiveness::Running,
            'T' | 't' => ProcessLiveness::Stopped,
            'Z' | 'X' => ProcessLiveness::Zombie,
            _ => ProcessLiveness::Dead,
        }
    }

    pub fn is_alive(self) -> bool {
        matches!(self, ProcessLiveness::Running | ProcessLiveness::Stopped)
    }
}

/// Reads the `State:\t<c>...` line of `/proc/<pid>/status`. Absence of the
/// file itself means the process is gone: `Dead`.
pub fn liveness(pid: Option<u32>) -> ProcessLiveness {
    let path = paths::proc_pid_status_path(pid);
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(_) => return ProcessLiveness::Dead,
    };

    contents
        .lines()
        .find_map(|line| line.strip_prefix("State:"))
        .and_then(|rest| rest.trim_start().chars().next())
        .map(ProcessLiveness::from_state_char)
        .unwrap_or(ProcessLiveness::Dead)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn state_char_classification() {
        assert_eq!(ProcessLiveness::from_state_char('R'), ProcessLiveness::Running);
        assert_eq!(ProcessLiveness::from_state_char('S'), ProcessLiveness::Running);
        assert_eq!(ProcessLiveness::from_state_char('D'), ProcessLiveness::Running);
        assert_eq!(ProcessLiveness::from_state_char('T'), ProcessLiveness::Stopped);
        assert_eq!(ProcessLiveness::from_state_char('Z'), ProcessLiveness::Zombie);
        assert_eq!(ProcessLiveness::from_state_char('X'), ProcessLiveness::Zombie);
        assert_eq!(ProcessLiveness::from_state_char('?'), ProcessLiveness::Dead);
    }

    #[test]
    fn is_alive_covers_running_and_stopped() {
        assert!(ProcessLiveness::Running.is_alive());
        assert!(ProcessLiveness::Stopped.is_alive());
        assert!(!ProcessLiveness::Zombie.is_alive());
        assert!(!ProcessLiveness::Dead.is_alive());
    }

    #[test]
    fn self_process_is_running() {
        assert_eq!(liveness(None), ProcessLiveness::Running);
    }
}
